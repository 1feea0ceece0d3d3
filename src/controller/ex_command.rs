use crate::error::{EngineError, EngineResult};
use bitflags::bitflags;
use std::collections::HashMap;
use tracing::trace;

/// What the parser needs to know about the buffer and session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExContext {
    /// Zero-indexed line of the caret.
    pub current_line: usize,
    pub line_count: usize,
    /// First and last line of the last visual selection, for `'<` and `'>`.
    pub visual: Option<(usize, usize)>,
}

impl ExContext {
    pub fn new(current_line: usize, line_count: usize) -> Self {
        Self {
            current_line,
            line_count: line_count.max(1),
            visual: None,
        }
    }

    fn last_line(&self) -> usize {
        self.line_count - 1
    }
}

/// Zero-indexed, inclusive line span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn line_count(&self) -> usize {
        self.end - self.start + 1
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SubstituteFlags: u8 {
        /// `g`: every match on a line, not just the first.
        const GLOBAL      = 1 << 0;
        /// `i`
        const IGNORE_CASE = 1 << 1;
        /// `I`
        const MATCH_CASE  = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub range: LineRange,
    pub pattern: String,
    pub replacement: String,
    pub flags: SubstituteFlags,
}

/// Built-in named ex commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExName {
    Write,
    WriteQuit,
    Quit,
    Xit,
    Delete,
    Yank,
    Put,
    Join,
    Set,
    NoHlsearch,
    Undo,
    Redo,
    Registers,
    History,
    Normal,
    ShiftRight,
    ShiftLeft,
}

/// Full name, shortest accepted abbreviation, command.
const EX_COMMANDS: &[(&str, usize, ExName)] = &[
    ("write", 1, ExName::Write),
    ("wq", 2, ExName::WriteQuit),
    ("quit", 1, ExName::Quit),
    ("xit", 1, ExName::Xit),
    ("exit", 3, ExName::Xit),
    ("delete", 1, ExName::Delete),
    ("yank", 1, ExName::Yank),
    ("put", 2, ExName::Put),
    ("join", 1, ExName::Join),
    ("set", 2, ExName::Set),
    ("nohlsearch", 3, ExName::NoHlsearch),
    ("undo", 1, ExName::Undo),
    ("redo", 3, ExName::Redo),
    ("registers", 3, ExName::Registers),
    ("display", 2, ExName::Registers),
    ("history", 3, ExName::History),
    ("normal", 4, ExName::Normal),
];

fn lookup(name: &str) -> Option<ExName> {
    EX_COMMANDS
        .iter()
        .find(|(full, min, _)| name.len() >= *min && full.starts_with(name))
        .map(|&(_, _, id)| id)
}

/// A named command with its range and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExCommandDetail {
    pub name: ExName,
    /// The name as typed (`>>` keeps both characters).
    pub typed: String,
    pub forced: bool,
    pub start_line: usize,
    pub end_line: usize,
    /// Whether a range was written, rather than defaulting to the current line.
    pub ranged: bool,
    /// Everything after the name, trimmed.
    pub leftover: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExCommand {
    Empty,
    /// Zero-indexed.
    GotoLine(usize),
    GotoEnd,
    Shell(String),
    Substitute(Substitution),
    Named(ExCommandDetail),
    User(String),
}

/// Parses one `:` line against the built-in commands only.
pub fn parse(line: &str, ctx: &ExContext) -> EngineResult<ExCommand> {
    parse_with(line, ctx, &HashMap::new())
}

/// Parses one `:` line, falling back to `user_commands` before giving up.
pub fn parse_with(
    line: &str,
    ctx: &ExContext,
    user_commands: &HashMap<String, Vec<String>>,
) -> EngineResult<ExCommand> {
    let text = line.trim_start_matches(|c: char| c == ':' || c.is_whitespace()).trim_end();
    trace!("ex parse {:?}", text);

    if text.is_empty() {
        return Ok(ExCommand::Empty);
    }
    if text.bytes().all(|b| b.is_ascii_digit()) {
        let n: usize = text.parse().unwrap_or(usize::MAX);
        return Ok(ExCommand::GotoLine(n.saturating_sub(1).min(ctx.last_line())));
    }
    if text == "$" {
        return Ok(ExCommand::GotoEnd);
    }
    if let Some(cmd) = text.strip_prefix('!') {
        return Ok(ExCommand::Shell(cmd.trim().to_string()));
    }

    let (range, rest) = parse_range(text, ctx)?;
    let rest = rest.trim_start();
    if rest.is_empty() {
        // A range on its own jumps to its last line.
        return Ok(match range {
            Some(r) => ExCommand::GotoLine(r.end),
            None => ExCommand::Empty,
        });
    }
    let range_or_current = range.unwrap_or(LineRange::new(ctx.current_line, ctx.current_line));

    if let Some((pattern, replacement, flags)) = parse_substitution(rest) {
        return Ok(ExCommand::Substitute(Substitution {
            range: range_or_current,
            pattern,
            replacement,
            flags,
        }));
    }

    let name_len = match rest.chars().next() {
        Some(c @ ('>' | '<')) => rest.chars().take_while(|&x| x == c).count(),
        _ => rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len()),
    };
    let typed = &rest[..name_len];
    let after = &rest[name_len..];
    let (forced, after) = match after.strip_prefix('!') {
        Some(a) => (true, a),
        None => (false, after),
    };

    let name = match typed.chars().next() {
        Some('>') => Some(ExName::ShiftRight),
        Some('<') => Some(ExName::ShiftLeft),
        _ if typed.is_empty() => None,
        _ => lookup(typed),
    };
    if let Some(name) = name {
        let leftover = after.trim().to_string();
        return Ok(ExCommand::Named(ExCommandDetail {
            name,
            typed: typed.to_string(),
            forced,
            start_line: range_or_current.start,
            end_line: range_or_current.end,
            ranged: range.is_some(),
            args: leftover.split_whitespace().map(str::to_string).collect(),
            leftover,
        }));
    }

    let word = rest.split_whitespace().next().unwrap_or(rest);
    if user_commands.contains_key(word) {
        return Ok(ExCommand::User(word.to_string()));
    }
    Err(EngineError::UnknownExCommand(rest.to_string()))
}

/// Reads an optional leading range. Returns it with the unparsed remainder.
fn parse_range<'a>(text: &'a str, ctx: &ExContext) -> EngineResult<(Option<LineRange>, &'a str)> {
    if let Some(rest) = text.strip_prefix('%') {
        return Ok((Some(LineRange::new(0, ctx.last_line())), rest));
    }
    let Some((first, rest)) = parse_address(text, ctx)? else {
        return Ok((None, text));
    };
    let Some(after_comma) = rest.strip_prefix(',') else {
        return Ok((Some(LineRange::new(first, first)), rest));
    };
    match parse_address(after_comma, ctx)? {
        Some((second, rest)) => Ok((Some(LineRange::new(first, second)), rest)),
        None => Ok((Some(LineRange::new(first, ctx.current_line)), after_comma)),
    }
}

/// One line address: `N`, `.`, `$`, `'<`, `'>`, each optionally followed by `+N`/`-N`
/// offsets. A bare offset counts from the current line.
fn parse_address<'a>(text: &'a str, ctx: &ExContext) -> EngineResult<Option<(usize, &'a str)>> {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    let (base, mut rest): (i64, &str) = if digits > 0 {
        let n: i64 = text[..digits].parse().unwrap_or(i64::MAX);
        (n.max(1) - 1, &text[digits..])
    } else if let Some(r) = text.strip_prefix('.') {
        (ctx.current_line as i64, r)
    } else if let Some(r) = text.strip_prefix('$') {
        (ctx.last_line() as i64, r)
    } else if let Some(r) = text.strip_prefix("'<") {
        let (first, _) = ctx.visual.ok_or_else(|| EngineError::InvalidRange("'<".to_string()))?;
        (first as i64, r)
    } else if let Some(r) = text.strip_prefix("'>") {
        let (_, last) = ctx.visual.ok_or_else(|| EngineError::InvalidRange("'>".to_string()))?;
        (last as i64, r)
    } else if text.starts_with(['+', '-']) {
        (ctx.current_line as i64, text)
    } else {
        return Ok(None);
    };

    let mut line = base;
    while let Some(sign) = rest.chars().next().filter(|c| matches!(c, '+' | '-')) {
        let tail = &rest[1..];
        let n_len = tail.bytes().take_while(u8::is_ascii_digit).count();
        let n: i64 = if n_len == 0 { 1 } else { tail[..n_len].parse().unwrap_or(i64::MAX) };
        line = if sign == '+' { line.saturating_add(n) } else { line.saturating_sub(n) };
        rest = &tail[n_len..];
    }

    let consumed = &text[..text.len() - rest.len()];
    if line < 0 || line > ctx.last_line() as i64 {
        return Err(EngineError::InvalidRange(consumed.to_string()));
    }
    Ok(Some((line as usize, rest)))
}

enum SubState {
    Pattern,
    Replacement,
    Flags,
}

/// `s/pattern/replacement/flags`. Only `g`, `i` and `I` are accepted as flags; anything
/// else means the line is not a substitution.
fn parse_substitution(text: &str) -> Option<(String, String, SubstituteFlags)> {
    let body = text.strip_prefix("s/")?;
    let mut state = SubState::Pattern;
    let mut pattern = String::new();
    let mut replacement = String::new();
    let mut flags = SubstituteFlags::empty();
    let mut escaped = false;

    for c in body.chars() {
        match state {
            SubState::Pattern | SubState::Replacement => {
                let out = if matches!(state, SubState::Pattern) {
                    &mut pattern
                } else {
                    &mut replacement
                };
                if escaped {
                    // `\/` is a literal slash; other escapes pass through.
                    if c != '/' {
                        out.push('\\');
                    }
                    out.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '/' {
                    state = if matches!(state, SubState::Pattern) {
                        SubState::Replacement
                    } else {
                        SubState::Flags
                    };
                } else {
                    out.push(c);
                }
            }
            SubState::Flags => match c {
                'g' => flags |= SubstituteFlags::GLOBAL,
                'i' => flags |= SubstituteFlags::IGNORE_CASE,
                'I' => flags |= SubstituteFlags::MATCH_CASE,
                c if c.is_whitespace() => {}
                _ => return None,
            },
        }
    }
    if escaped {
        match state {
            SubState::Pattern => pattern.push('\\'),
            SubState::Replacement => replacement.push('\\'),
            SubState::Flags => {}
        }
    }
    Some((pattern, replacement, flags))
}
