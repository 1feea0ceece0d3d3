use crate::error::{EngineError, EngineResult};
use crate::host::Clipboard;
use std::collections::HashMap;
use tracing::debug;

/// Registers the engine fills itself; writes to them are rejected.
pub const READ_ONLY_REGISTERS: [char; 7] = [':', '.', '%', '/', '~', '=', '#'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteMode {
    Chars,
    Lines,
}

impl PasteMode {
    /// Text holding a line break pastes linewise.
    pub fn of(text: &str) -> Self {
        if text.contains(['\n', '\r']) {
            PasteMode::Lines
        } else {
            PasteMode::Chars
        }
    }
}

pub fn is_register_name(c: char) -> bool {
    c.is_ascii_alphanumeric() || "\"-_*+:.%/~=#".contains(c)
}

pub fn is_read_only(c: char) -> bool {
    READ_ONLY_REGISTERS.contains(&c)
}

/// Vim-style register file.
///
/// Unnamed writes fan out to `0` (yanks), `1`-`9` (multi-line deletes, shifted) and `-`
/// (small deletes). The unnamed register itself is a pointer at whichever register was
/// written last.
pub struct RegisterStore {
    named: HashMap<char, String>,
    numbered: [String; 10],
    small_delete: String,
    unnamed_target: char,
    last_inserted: String,
    last_command: String,
    last_search: String,
    clipboard: Box<dyn Clipboard>,
}

impl RegisterStore {
    pub fn new(clipboard: Box<dyn Clipboard>) -> Self {
        Self {
            named: HashMap::new(),
            numbered: std::array::from_fn(|_| String::new()),
            small_delete: String::new(),
            unnamed_target: '0',
            last_inserted: String::new(),
            last_command: String::new(),
            last_search: String::new(),
            clipboard,
        }
    }

    /// Stores `text`. `deleted` selects the delete history rather than the yank register
    /// when no register is named.
    pub fn write(&mut self, name: Option<char>, text: &str, deleted: bool) -> EngineResult<()> {
        debug!("register write {:?} deleted={} len={}", name, deleted, text.len());
        let target = match name {
            Some('"') => {
                self.numbered[0] = text.to_string();
                '0'
            }
            None if deleted => {
                if text.contains(['\n', '\r']) {
                    for i in (2..=9).rev() {
                        self.numbered[i] = std::mem::take(&mut self.numbered[i - 1]);
                    }
                    self.numbered[1] = text.to_string();
                    '1'
                } else {
                    self.small_delete = text.to_string();
                    '-'
                }
            }
            None => {
                self.numbered[0] = text.to_string();
                '0'
            }
            Some('_') => return Ok(()),
            Some(c @ ('*' | '+')) => {
                self.clipboard
                    .set_text(text)
                    .map_err(|e| EngineError::host("clipboard", e))?;
                c
            }
            Some(c @ 'a'..='z') => {
                self.named.insert(c, text.to_string());
                c
            }
            Some(c @ 'A'..='Z') => {
                let lower = c.to_ascii_lowercase();
                self.named.entry(lower).or_default().push_str(text);
                lower
            }
            Some(c @ '0'..='9') => {
                self.numbered[(c as u8 - b'0') as usize] = text.to_string();
                c
            }
            Some('-') => {
                self.small_delete = text.to_string();
                '-'
            }
            Some(c) if is_read_only(c) => return Err(EngineError::ReadOnlyRegister(c)),
            Some(c) => return Err(EngineError::InvalidRegister(c)),
        };
        self.unnamed_target = target;
        Ok(())
    }

    /// Reads a register. `file_path` backs the `%` register.
    pub fn read(&mut self, name: Option<char>, file_path: Option<&str>) -> EngineResult<String> {
        let name = match name {
            None | Some('"') => self.unnamed_target,
            Some(c) => c,
        };
        match name {
            'a'..='z' => Ok(self.named.get(&name).cloned().unwrap_or_default()),
            'A'..='Z' => Ok(self
                .named
                .get(&name.to_ascii_lowercase())
                .cloned()
                .unwrap_or_default()),
            '0'..='9' => Ok(self.numbered[(name as u8 - b'0') as usize].clone()),
            '-' => Ok(self.small_delete.clone()),
            '_' => Ok(String::new()),
            '*' | '+' => self
                .clipboard
                .get_text()
                .map_err(|e| EngineError::host("clipboard", e)),
            '%' => Ok(file_path.unwrap_or_default().to_string()),
            '.' => Ok(self.last_inserted.clone()),
            ':' => Ok(self.last_command.clone()),
            '/' => Ok(self.last_search.clone()),
            '~' | '=' | '#' => Err(EngineError::NotImplemented(format!("register {}", name))),
            c => Err(EngineError::InvalidRegister(c)),
        }
    }

    /// Register the unnamed register currently resolves to.
    pub fn unnamed_target(&self) -> char {
        self.unnamed_target
    }

    pub fn set_last_inserted(&mut self, text: &str) {
        self.last_inserted = text.to_string();
    }

    pub fn set_last_command(&mut self, command: &str) {
        self.last_command = command.to_string();
    }

    pub fn set_last_search(&mut self, pattern: &str) {
        self.last_search = pattern.to_string();
    }

    pub fn last_search(&self) -> &str {
        &self.last_search
    }

    pub fn last_inserted(&self) -> &str {
        &self.last_inserted
    }

    /// Non-empty registers in `:registers` order.
    pub fn listing(&self) -> Vec<(char, String)> {
        let mut out = Vec::new();
        let unnamed = match self.unnamed_target {
            '0'..='9' => self.numbered[(self.unnamed_target as u8 - b'0') as usize].clone(),
            '-' => self.small_delete.clone(),
            c => self.named.get(&c).cloned().unwrap_or_default(),
        };
        out.push(('"', unnamed));
        for (i, text) in self.numbered.iter().enumerate() {
            out.push(((b'0' + i as u8) as char, text.clone()));
        }
        for c in 'a'..='z' {
            if let Some(text) = self.named.get(&c) {
                out.push((c, text.clone()));
            }
        }
        out.push(('-', self.small_delete.clone()));
        out.push(('.', self.last_inserted.clone()));
        out.push((':', self.last_command.clone()));
        out.push(('/', self.last_search.clone()));
        out.retain(|(_, text)| !text.is_empty());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_model::MemoryClipboard;

    fn store() -> RegisterStore {
        RegisterStore::new(Box::new(MemoryClipboard::new()))
    }

    #[test]
    fn test_yank_goes_to_zero() {
        let mut regs = store();
        regs.write(None, "hello", false).unwrap();
        assert_eq!(regs.read(Some('0'), None).unwrap(), "hello");
        assert_eq!(regs.read(None, None).unwrap(), "hello");
    }

    #[test]
    fn test_line_deletes_shift_numbered() {
        let mut regs = store();
        regs.write(None, "one\n", true).unwrap();
        regs.write(None, "two\n", true).unwrap();
        assert_eq!(regs.read(Some('1'), None).unwrap(), "two\n");
        assert_eq!(regs.read(Some('2'), None).unwrap(), "one\n");
        assert_eq!(regs.read(None, None).unwrap(), "two\n");
    }

    #[test]
    fn test_small_delete() {
        let mut regs = store();
        regs.write(None, "x", true).unwrap();
        assert_eq!(regs.read(Some('-'), None).unwrap(), "x");
        assert_eq!(regs.read(Some('1'), None).unwrap(), "");
        assert_eq!(regs.unnamed_target(), '-');
    }

    #[test]
    fn test_explicit_unnamed_writes_zero() {
        let mut regs = store();
        regs.write(Some('"'), "x\n", true).unwrap();
        assert_eq!(regs.read(Some('0'), None).unwrap(), "x\n");
        assert_eq!(regs.read(Some('1'), None).unwrap(), "");
        regs.write(Some('"'), "a", true).unwrap();
        assert_eq!(regs.read(Some('0'), None).unwrap(), "a");
        assert_eq!(regs.read(Some('-'), None).unwrap(), "");
        assert_eq!(regs.unnamed_target(), '0');
    }

    #[test]
    fn test_named_and_append() {
        let mut regs = store();
        regs.write(Some('a'), "foo", false).unwrap();
        regs.write(Some('A'), "bar", false).unwrap();
        assert_eq!(regs.read(Some('a'), None).unwrap(), "foobar");
        assert_eq!(regs.read(Some('A'), None).unwrap(), "foobar");
        assert_eq!(regs.read(None, None).unwrap(), "foobar");
        assert_eq!(regs.read(Some('0'), None).unwrap(), "");
    }

    #[test]
    fn test_blackhole_discards() {
        let mut regs = store();
        regs.write(None, "keep", false).unwrap();
        regs.write(Some('_'), "gone", true).unwrap();
        assert_eq!(regs.read(None, None).unwrap(), "keep");
    }

    #[test]
    fn test_read_only_and_synthesized() {
        let mut regs = store();
        assert_eq!(regs.write(Some(':'), "x", false), Err(EngineError::ReadOnlyRegister(':')));
        assert_eq!(regs.write(Some('%'), "x", false), Err(EngineError::ReadOnlyRegister('%')));
        regs.set_last_inserted("typed");
        regs.set_last_command("s/a/b/");
        regs.set_last_search("needle");
        assert_eq!(regs.read(Some('.'), None).unwrap(), "typed");
        assert_eq!(regs.read(Some(':'), None).unwrap(), "s/a/b/");
        assert_eq!(regs.read(Some('/'), None).unwrap(), "needle");
        assert_eq!(regs.read(Some('%'), Some("notes.txt")).unwrap(), "notes.txt");
        assert!(matches!(regs.read(Some('='), None), Err(EngineError::NotImplemented(_))));
    }

    #[test]
    fn test_clipboard_registers() {
        let clipboard = MemoryClipboard::new();
        let mut regs = RegisterStore::new(Box::new(clipboard.clone()));
        regs.write(Some('*'), "shared", false).unwrap();
        assert_eq!(clipboard.contents(), "shared");
        assert_eq!(regs.read(Some('+'), None).unwrap(), "shared");
    }

    #[test]
    fn test_paste_mode() {
        assert_eq!(PasteMode::of("abc"), PasteMode::Chars);
        assert_eq!(PasteMode::of("abc\n"), PasteMode::Lines);
        assert_eq!(PasteMode::of("a\rb"), PasteMode::Lines);
    }

    #[test]
    fn test_listing_skips_empty() {
        let mut regs = store();
        regs.write(Some('b'), "bee", false).unwrap();
        let listing = regs.listing();
        assert_eq!(listing, vec![('"', "bee".to_string()), ('b', "bee".to_string())]);
    }
}
