use crate::config::WhichWrap;
use crate::controller::mode::Mode;
use crate::controller::session::Session;
use crate::controller::state::InsertSession;
use crate::document_model::movement::first_non_blank;
use crate::error::{EngineError, EngineResult};
use crate::host::Buffer;
use tracing::debug;

fn begin(session: &mut Session, count: usize, open_line: bool) -> EngineResult<()> {
    session.state.insert = Some(InsertSession::new(count, open_line));
    Ok(())
}

/// `i`
pub fn insert(session: &mut Session, _buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    begin(session, count, false)
}

/// `a`
pub fn append(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let pos = buffer.current_pos();
    if pos < buffer.line_end_position(buffer.line_from_position(pos)) {
        buffer.set_current_pos(buffer.position_after(pos));
    }
    begin(session, count, false)
}

/// `A`
pub fn append_end(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let line = buffer.line_from_position(buffer.current_pos());
    buffer.set_current_pos(buffer.line_end_position(line));
    begin(session, count, false)
}

/// `I`
pub fn insert_line_start(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let line = buffer.line_from_position(buffer.current_pos());
    buffer.set_current_pos(first_non_blank(buffer, line));
    begin(session, count, false)
}

/// `o`
pub fn open_below(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let line = buffer.line_from_position(buffer.current_pos());
    let at = buffer.line_end_position(line);
    let eol = buffer.eol().to_string();
    buffer
        .insert_text(at, &eol)
        .map_err(|e| EngineError::host("open_below", e))?;
    buffer.set_current_pos(at + eol.len());
    begin(session, count, true)
}

/// `O`
pub fn open_above(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let line = buffer.line_from_position(buffer.current_pos());
    let at = buffer.position_from_line(line);
    let eol = buffer.eol().to_string();
    buffer
        .insert_text(at, &eol)
        .map_err(|e| EngineError::host("open_above", e))?;
    buffer.set_current_pos(at);
    begin(session, count, true)
}

/// `R`
pub fn overtype(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    begin(session, count, false)?;
    session.set_mode(buffer, Mode::Overtype);
    Ok(())
}

/// `<Esc>`: ends text entry, or drops whatever was half typed.
pub fn cancel(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    if session.state.mode.is_text_entry() {
        return session.finish_insert(buffer);
    }
    session.state.clear_pending();
    Ok(())
}

impl Session {
    /// Enters `text` at the caret as if typed, overwriting in Overtype mode.
    pub(crate) fn insert_typed(&mut self, buffer: &mut dyn Buffer, text: &str) -> EngineResult<()> {
        let pos = buffer.current_pos();
        let result = if self.state.mode == Mode::Overtype {
            let line_end = buffer.line_end_position(buffer.line_from_position(pos));
            let mut stop = pos;
            for _ in text.chars().filter(|c| !matches!(c, '\n' | '\r')) {
                if stop < line_end {
                    stop = buffer.position_after(stop);
                }
            }
            buffer.replace_range(pos, stop, text)
        } else {
            buffer.insert_text(pos, text)
        };
        result.map_err(|e| EngineError::host("insert", e))?;
        buffer.goto_pos(pos + text.len());
        if let Some(insert) = self.state.insert.as_mut() {
            insert.typed.push_str(text);
        }
        Ok(())
    }

    /// `<Tab>` in Insert mode, spaces when 'expandtab' is set.
    pub(crate) fn insert_tab(&mut self, buffer: &mut dyn Buffer) -> EngineResult<()> {
        if self.settings.expandtab {
            let width = self.settings.indent_width();
            let column = buffer.column(buffer.current_pos());
            let spaces = " ".repeat(width - column % width);
            self.insert_typed(buffer, &spaces)
        } else {
            self.insert_typed(buffer, "\t")
        }
    }

    /// `<BS>` in Insert mode. Crossing to the previous line needs 'whichwrap' `b`.
    pub(crate) fn insert_backspace(&mut self, buffer: &mut dyn Buffer) -> EngineResult<()> {
        let pos = buffer.current_pos();
        let line = buffer.line_from_position(pos);
        let at_line_start = pos == buffer.position_from_line(line);
        if pos == 0
            || (at_line_start && !self.settings.whichwrap.contains(WhichWrap::BACKSPACE))
        {
            return Ok(());
        }
        let prev = buffer.position_before(pos);
        if self.state.mode == Mode::Insert {
            buffer
                .delete_range(prev, pos)
                .map_err(|e| EngineError::host("backspace", e))?;
            if let Some(insert) = self.state.insert.as_mut() {
                insert.typed.pop();
            }
        }
        buffer.goto_pos(prev);
        Ok(())
    }

    /// Leaves Insert or Overtype mode: lays down the extra repetitions a count asked
    /// for, records the typed text and steps the caret back onto the last character.
    pub(crate) fn finish_insert(&mut self, buffer: &mut dyn Buffer) -> EngineResult<()> {
        let insert = self
            .state
            .insert
            .take()
            .unwrap_or_else(|| InsertSession::new(1, false));
        debug!("insert finished: {:?} x{}", insert.typed, insert.repeat);

        if insert.repeat > 1 && !insert.typed.is_empty() {
            let piece = if insert.open_line {
                format!("{}{}", buffer.eol(), insert.typed)
            } else {
                insert.typed.clone()
            };
            let more = piece.repeat(insert.repeat - 1);
            let at = buffer.current_pos();
            buffer
                .insert_text(at, &more)
                .map_err(|e| EngineError::host("insert", e))?;
            buffer.set_current_pos(at + more.len());
        }

        self.registers.set_last_inserted(&insert.typed);
        if !self.state.replaying
            && let Some(change) = self.state.last_change.as_mut()
        {
            change.inserted = insert.typed.clone();
        }
        buffer.cancel_autocomplete();
        self.set_mode(buffer, Mode::Normal);

        let pos = buffer.current_pos();
        if pos > buffer.position_from_line(buffer.line_from_position(pos)) {
            buffer.goto_pos(buffer.position_before(pos));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::controller::{CommandHandler, Mode, Session};
    use crate::document_model::TextBuffer;
    use crate::host::Buffer;
    use crate::keys::parse_keys;

    fn run_with(session: &mut Session, text: &str, keys: &str) -> TextBuffer {
        let mut buffer = TextBuffer::from_text(text);
        for key in parse_keys(keys).unwrap() {
            session.handle_keypress(&mut buffer, key);
        }
        buffer
    }

    fn run(text: &str, keys: &str) -> (Session, TextBuffer) {
        let mut session = Session::new();
        let buffer = run_with(&mut session, text, keys);
        (session, buffer)
    }

    #[test]
    fn test_insert_and_last_inserted_register() {
        let (mut session, buffer) = run("", "ihello<Esc>");
        assert_eq!(buffer.text(), "hello");
        assert_eq!(buffer.current_pos(), 4);
        assert_eq!(session.mode(), Mode::Normal);
        assert_eq!(session.registers_mut().read(Some('.'), None).unwrap(), "hello");
    }

    #[test]
    fn test_insert_count_repeats_text() {
        let (_, buffer) = run("x", "3iab<Esc>");
        assert_eq!(buffer.text(), "abababx");
        assert_eq!(buffer.current_pos(), 5);
    }

    #[test]
    fn test_append_variants() {
        let (_, buffer) = run("ab", "ahi<Esc>");
        assert_eq!(buffer.text(), "ahib");
        let (_, buffer) = run("ab\ncd", "A!<Esc>");
        assert_eq!(buffer.text(), "ab!\ncd");
        let (_, buffer) = run("  ab", "$I#<Esc>");
        assert_eq!(buffer.text(), "  #ab");
        let (_, buffer) = run("", "ax<Esc>");
        assert_eq!(buffer.text(), "x");
    }

    #[test]
    fn test_open_lines() {
        let (_, buffer) = run("one\nthree", "otwo<Esc>");
        assert_eq!(buffer.text(), "one\ntwo\nthree");
        let (_, buffer) = run("two", "Oone<Esc>");
        assert_eq!(buffer.text(), "one\ntwo");
        let (_, buffer) = run("a", "2onew<Esc>");
        assert_eq!(buffer.text(), "a\nnew\nnew");
    }

    #[test]
    fn test_open_line_uses_file_format() {
        let (_, buffer) = run("a\r\nb", "ox<Esc>");
        assert_eq!(buffer.text(), "a\r\nx\r\nb");
    }

    #[test]
    fn test_enter_backspace_and_tab() {
        let (_, buffer) = run("", "iab<CR>cd<BS><BS><BS>x<Esc>");
        assert_eq!(buffer.text(), "abx");
        let mut session = Session::new();
        session.settings_mut().set_option("et").unwrap();
        session.settings_mut().set_option("sts=4").unwrap();
        let buffer = run_with(&mut session, "", "ia<Tab>b<Esc>");
        assert_eq!(buffer.text(), "a   b");
    }

    #[test]
    fn test_backspace_respects_whichwrap() {
        let mut session = Session::new();
        session.settings_mut().set_option("ww=").unwrap();
        let buffer = run_with(&mut session, "ab\ncd", "ji<BS>x<Esc>");
        assert_eq!(buffer.text(), "ab\nxcd");
    }

    #[test]
    fn test_overtype() {
        let (session, buffer) = run("abcd", "Rxy<Esc>");
        assert_eq!(buffer.text(), "xycd");
        assert_eq!(session.mode(), Mode::Normal);
        let (_, buffer) = run("ab", "Rwxyz<Esc>");
        assert_eq!(buffer.text(), "wxyz");
    }

    #[test]
    fn test_insert_is_one_undo_step() {
        let (_, buffer) = run("start", "Aone two<Esc>u");
        assert_eq!(buffer.text(), "start");
    }

    #[test]
    fn test_cancel_in_normal_clears_pending() {
        let (session, _) = run("abc", "\"a5<Esc>");
        assert_eq!(session.register(), None);
        assert_eq!(session.repeat_count(), 0);
        assert_eq!(session.mode(), Mode::Normal);
    }
}
