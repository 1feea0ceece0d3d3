use super::command_table::CommandId;
use super::input_line::InputEvent;
use super::mode::Mode;
use super::session::{CommandHandler, Session};
use super::state::FindState;
use crate::document_model::registers::is_register_name;
use crate::error::{EngineError, EngineResult};
use crate::host::Buffer;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::trace;

/// A printable character typed without Ctrl or Alt.
fn typed_char(key: &KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            Some(c)
        }
        _ => None,
    }
}

fn is_escape(key: &KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    matches!(key.code, KeyCode::Esc) || (ctrl && matches!(key.code, KeyCode::Char('c' | '[')))
}

/// The command a key means in Normal or Visual mode, count digits and `g` aside.
pub fn command_for_key(key: &KeyEvent, visual: bool) -> Option<CommandId> {
    use CommandId::*;

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('f') => Some(PageDown),
            KeyCode::Char('b') => Some(PageUp),
            KeyCode::Char('d') => Some(HalfPageDown),
            KeyCode::Char('u') => Some(HalfPageUp),
            KeyCode::Char('r') => Some(Redo),
            KeyCode::Char('v') => Some(ToggleVisualBlock),
            KeyCode::Char('n') => Some(LineDown),
            KeyCode::Char('p') => Some(LineUp),
            KeyCode::Char('c') | KeyCode::Char('[') => Some(Cancel),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Esc => Some(Cancel),
        KeyCode::Enter => Some(NextLineStart),
        KeyCode::Backspace => Some(BackspaceLeft),
        KeyCode::Left => Some(MoveLeft),
        KeyCode::Right => Some(MoveRight),
        KeyCode::Up => Some(LineUp),
        KeyCode::Down => Some(LineDown),
        KeyCode::Home => Some(LineStart),
        KeyCode::End => Some(LineEnd),
        KeyCode::PageUp => Some(PageUp),
        KeyCode::PageDown => Some(PageDown),
        KeyCode::Delete => Some(DeleteChar),

        KeyCode::Char(c) => Some(match c {
            'h' => MoveLeft,
            'j' => LineDown,
            'k' => LineUp,
            'l' => MoveRight,
            ' ' => SpaceRight,
            'w' => WordRight,
            'b' => WordLeft,
            'e' => WordEnd,
            'W' => BigWordRight,
            'B' => BigWordLeft,
            'E' => BigWordEnd,
            '0' => LineStart,
            '^' => FirstNonBlank,
            '$' => LineEnd,
            '+' => NextLineStart,
            '-' => PrevLineStart,
            'G' => DocumentEnd,
            '{' => ParaUp,
            '}' => ParaDown,
            '%' => MatchBrace,

            'f' => FindCharForward,
            'F' => FindCharBackward,
            't' => TillCharForward,
            'T' => TillCharBackward,
            ';' => RepeatFind,
            ',' => RepeatFindReverse,
            '/' => SearchForward,
            '?' => SearchBackward,
            'n' => SearchNext,
            'N' => SearchPrev,
            '*' => SearchWordForward,
            '#' => SearchWordBackward,

            'y' => YankOperation,
            'd' => DeleteOperation,
            'c' => ChangeOperation,
            '>' => IndentOperation,
            '<' => DedentOperation,
            'x' => DeleteChar,
            'X' => DeleteCharBefore,
            's' => Substitute,
            'S' => SubstituteLine,
            'D' => DeleteToEnd,
            'C' => ChangeToEnd,
            'J' => JoinLines,
            '~' => ToggleCase,
            'r' => ReplaceChar,
            'p' => PasteAfter,
            'P' => PasteBefore,
            'u' => Undo,
            '.' => RepeatLast,

            'i' => Insert,
            'a' => Append,
            'A' => AppendEnd,
            'I' => InsertLineStart,
            'o' | 'O' if visual => VisualSwapEnds,
            'o' => OpenBelow,
            'O' => OpenAbove,
            'R' => Overtype,

            'v' => ToggleVisual,
            'V' => ToggleVisualLine,
            '"' => SetRegister,
            ':' => CommandLine,
            _ => return None,
        }),
        _ => None,
    }
}

impl Session {
    /// Routes one key event by mode. Returns `false` for keys that meant nothing.
    pub(crate) fn handle_key_event(&mut self, buffer: &mut dyn Buffer, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }
        trace!("key {:?} in {:?}", key, self.state.mode);

        match self.state.mode {
            Mode::Normal | Mode::Visual => self.command_key(buffer, &key),
            Mode::Insert | Mode::Overtype => self.text_entry_key(buffer, &key),
            Mode::Search | Mode::Command => self.input_key(buffer, &key),
            Mode::SetRegister => self.register_key(buffer, &key),
            Mode::ReplaceChar => self.replace_char_key(buffer, &key),
            Mode::FindChar => self.find_char_key(buffer, &key),
            Mode::Select => self.select_key(buffer, &key),
        }
    }

    /// Reports a failed key action and drops the half-typed command.
    fn settle(&mut self, result: EngineResult<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                self.report(&e);
                self.state.clear_pending();
                false
            }
        }
    }

    fn abandon_overlay(&mut self, buffer: &mut dyn Buffer) -> bool {
        self.return_from_overlay(buffer);
        self.state.clear_pending();
        true
    }

    fn command_key(&mut self, buffer: &mut dyn Buffer, key: &KeyEvent) -> bool {
        let visual = self.state.mode == Mode::Visual;

        if self.state.pending_g {
            self.state.pending_g = false;
            let id = match typed_char(key) {
                Some('g') => Some(CommandId::DocumentStart),
                Some('h') if !visual => Some(CommandId::SelectMode),
                _ => None,
            };
            return match id {
                Some(id) => self.execute(buffer, id),
                None => {
                    self.state.clear_pending();
                    false
                }
            };
        }

        match typed_char(key) {
            Some(c @ '1'..='9') => {
                self.state.push_count_digit(c as u32 - '0' as u32);
                return true;
            }
            Some('0') if self.state.repeat_count > 0 => {
                self.state.push_count_digit(0);
                return true;
            }
            Some('g') => {
                self.state.pending_g = true;
                return true;
            }
            _ => {}
        }

        match command_for_key(key, visual) {
            Some(id) => self.execute(buffer, id),
            None => {
                trace!("unmapped key {:?}", key.code);
                self.state.clear_pending();
                false
            }
        }
    }

    fn text_entry_key(&mut self, buffer: &mut dyn Buffer, key: &KeyEvent) -> bool {
        if is_escape(key) {
            return self.execute(buffer, CommandId::Cancel);
        }
        let result = match key.code {
            KeyCode::Enter => {
                let eol = buffer.eol().to_string();
                self.insert_typed(buffer, &eol)
            }
            KeyCode::Tab => self.insert_tab(buffer),
            KeyCode::Backspace => self.insert_backspace(buffer),
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down | KeyCode::Home | KeyCode::End => {
                move_in_text_entry(buffer, key.code);
                Ok(())
            }
            _ => match typed_char(key) {
                Some(c) => {
                    let mut utf8 = [0; 4];
                    self.insert_typed(buffer, c.encode_utf8(&mut utf8))
                }
                None => return false,
            },
        };
        self.settle(result)
    }

    fn input_key(&mut self, buffer: &mut dyn Buffer, key: &KeyEvent) -> bool {
        let command = self.state.mode == Mode::Command;
        let event = if command {
            self.input.handle_key(key, &self.command_history)
        } else {
            self.input.handle_key(key, &self.search_history)
        };

        match event {
            InputEvent::Continue => true,
            InputEvent::Cancel => self.abandon_overlay(buffer),
            InputEvent::Submit(text) if command => {
                if !text.trim().is_empty() {
                    self.command_history.push(&text);
                }
                self.return_from_overlay(buffer);
                self.state.clear_pending();
                let result = self.run_ex(buffer, &text);
                self.settle(result)
            }
            InputEvent::Submit(text) => {
                let result = self.finish_search(buffer, text);
                self.settle(result)
            }
        }
    }

    fn register_key(&mut self, buffer: &mut dyn Buffer, key: &KeyEvent) -> bool {
        if is_escape(key) {
            return self.abandon_overlay(buffer);
        }
        self.return_from_overlay(buffer);
        match typed_char(key) {
            Some(c) if is_register_name(c) => {
                self.state.register = Some(c);
                true
            }
            Some(c) => self.settle(Err(EngineError::InvalidRegister(c))),
            None => {
                self.state.clear_pending();
                false
            }
        }
    }

    fn replace_char_key(&mut self, buffer: &mut dyn Buffer, key: &KeyEvent) -> bool {
        let ch = match key.code {
            KeyCode::Enter => '\n',
            KeyCode::Tab => '\t',
            _ => match typed_char(key) {
                Some(c) => c,
                None => return self.abandon_overlay(buffer),
            },
        };
        self.state.replace_char = Some(ch);
        self.return_from_overlay(buffer);
        self.execute(buffer, CommandId::ReplaceWithChar)
    }

    fn find_char_key(&mut self, buffer: &mut dyn Buffer, key: &KeyEvent) -> bool {
        let ch = match key.code {
            KeyCode::Tab => '\t',
            _ => match typed_char(key) {
                Some(c) => c,
                None => return self.abandon_overlay(buffer),
            },
        };
        self.state.find = FindState {
            ch: Some(ch),
            ..self.state.pending_find
        };
        self.return_from_overlay(buffer);
        self.execute(buffer, CommandId::RepeatFind)
    }

    /// Select mode: typing replaces the selection and continues in Insert mode.
    fn select_key(&mut self, buffer: &mut dyn Buffer, key: &KeyEvent) -> bool {
        if is_escape(key) {
            self.set_mode(buffer, Mode::Normal);
            return true;
        }
        let (anchor, caret) = (buffer.anchor(), buffer.current_pos());
        let (start, end) = (anchor.min(caret), anchor.max(caret));

        let text = match key.code {
            KeyCode::Left => {
                if caret > 0 {
                    buffer.set_current_pos(buffer.position_before(caret));
                }
                return true;
            }
            KeyCode::Right => {
                if caret < buffer.text_length() {
                    buffer.set_current_pos(buffer.position_after(caret));
                }
                return true;
            }
            KeyCode::Backspace | KeyCode::Delete => None,
            KeyCode::Enter => Some(buffer.eol().to_string()),
            KeyCode::Tab => Some("\t".to_string()),
            _ => match typed_char(key) {
                Some(c) => Some(c.to_string()),
                None => return false,
            },
        };

        let result = self.replace_selection(buffer, start, end, text);
        self.settle(result)
    }

    fn replace_selection(
        &mut self,
        buffer: &mut dyn Buffer,
        start: usize,
        end: usize,
        text: Option<String>,
    ) -> EngineResult<()> {
        // Insert mode opens the undo group, so switch before deleting.
        self.set_mode(buffer, if text.is_some() { Mode::Insert } else { Mode::Normal });
        buffer
            .delete_range(start, end)
            .map_err(|e| EngineError::host("select_replace", e))?;
        buffer.set_current_pos(start);
        match text {
            Some(text) => self.insert_typed(buffer, &text),
            None => {
                self.clamp_caret(buffer);
                Ok(())
            }
        }
    }
}

/// Arrow keys in Insert mode move the caret without leaving it.
fn move_in_text_entry(buffer: &mut dyn Buffer, code: KeyCode) {
    let pos = buffer.current_pos();
    let line = buffer.line_from_position(pos);
    let line_start = buffer.position_from_line(line);
    let line_end = buffer.line_end_position(line);
    let target = match code {
        KeyCode::Left if pos > line_start => buffer.position_before(pos),
        KeyCode::Right if pos < line_end => buffer.position_after(pos),
        KeyCode::Home => line_start,
        KeyCode::End => line_end,
        KeyCode::Up if line > 0 => buffer.find_column(line - 1, buffer.column(pos)),
        KeyCode::Down if line + 1 < buffer.line_count() => buffer.find_column(line + 1, buffer.column(pos)),
        _ => pos,
    };
    buffer.goto_pos(target);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_model::TextBuffer;
    use crate::host::MessageLog;
    use crate::keys::parse_keys;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn feed(session: &mut Session, buffer: &mut TextBuffer, keys: &str) {
        for key in parse_keys(keys).unwrap() {
            session.handle_keypress(buffer, key);
        }
    }

    #[test]
    fn test_key_map() {
        assert_eq!(command_for_key(&key('w'), false), Some(CommandId::WordRight));
        assert_eq!(command_for_key(&key('o'), false), Some(CommandId::OpenBelow));
        assert_eq!(command_for_key(&key('o'), true), Some(CommandId::VisualSwapEnds));
        assert_eq!(command_for_key(&key('Q'), false), None);
        let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(command_for_key(&ctrl_r, false), Some(CommandId::Redo));
    }

    #[test]
    fn test_zero_is_a_motion_without_count() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text(&"x".repeat(20));
        feed(&mut session, &mut buffer, "$0");
        assert_eq!(buffer.current_pos(), 0);
        feed(&mut session, &mut buffer, "10l");
        assert_eq!(buffer.current_pos(), 10);
    }

    #[test]
    fn test_release_events_are_ignored() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("abc");
        let mut release = key('l');
        release.kind = KeyEventKind::Release;
        assert!(!session.handle_keypress(&mut buffer, release));
        assert_eq!(buffer.current_pos(), 0);
    }

    #[test]
    fn test_g_prefix() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("a\nb\nc");
        feed(&mut session, &mut buffer, "Ggg");
        assert_eq!(buffer.current_pos(), 0);
        feed(&mut session, &mut buffer, "2gg");
        assert_eq!(buffer.current_pos(), 2);
        assert!(session.handle_keypress(&mut buffer, key('g')));
        assert!(session.state.pending_g);
        assert!(!session.handle_keypress(&mut buffer, key('z')));
        assert!(!session.state.pending_g);
        assert_eq!(buffer.current_pos(), 2);
    }

    #[test]
    fn test_insert_mode_arrows() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("abc\ndef");
        feed(&mut session, &mut buffer, "i<Right><Right>X<Down>Y<Esc>");
        assert_eq!(buffer.text(), "abXc\ndefY");
    }

    #[test]
    fn test_search_prompt_cancel_restores_mode() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("abc abc");
        feed(&mut session, &mut buffer, "d/ab<Esc>");
        assert_eq!(session.mode(), Mode::Normal);
        assert_eq!(session.operator(), None);
        assert_eq!(buffer.text(), "abc abc");
    }

    #[test]
    fn test_search_prompt_with_operator() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("one two three");
        feed(&mut session, &mut buffer, "d/thr<CR>");
        assert_eq!(buffer.text(), "three");
        assert_eq!(session.mode(), Mode::Normal);
    }

    #[test]
    fn test_command_line_history_and_errors() {
        let log = MessageLog::new();
        let mut session = Session::builder().status(Box::new(log.clone())).build();
        let mut buffer = TextBuffer::from_text("a\nb\nc");
        feed(&mut session, &mut buffer, ":3<CR>");
        assert_eq!(buffer.current_pos(), 4);
        assert_eq!(session.mode(), Mode::Normal);
        feed(&mut session, &mut buffer, ":bogus<CR>");
        assert_eq!(log.warnings(), vec!["Not an editor command: bogus".to_string()]);
        assert_eq!(session.command_history().get(0), Some("bogus"));
        assert_eq!(session.command_history().len(), 2);
    }

    #[test]
    fn test_find_char_escape_cancels_operator() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("abc");
        feed(&mut session, &mut buffer, "df<Esc>x");
        assert_eq!(buffer.text(), "bc");
    }
}
