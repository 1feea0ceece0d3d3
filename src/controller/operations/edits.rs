use crate::controller::mode::Mode;
use crate::controller::session::Session;
use crate::error::{EngineError, EngineResult};
use crate::host::Buffer;

fn in_visual(session: &Session) -> bool {
    matches!(session.state.mode, Mode::Visual | Mode::Select)
}

/// Position `count` characters right of `pos`, stopping at the line end.
fn advance_in_line(buffer: &dyn Buffer, pos: usize, count: usize) -> usize {
    let end = buffer.line_end_position(buffer.line_from_position(pos));
    let mut p = pos;
    for _ in 0..count {
        if p >= end {
            break;
        }
        p = buffer.position_after(p);
    }
    p
}

/// The selection with the character under the caret included.
fn visual_span(buffer: &dyn Buffer) -> (usize, usize) {
    let (anchor, caret) = (buffer.anchor(), buffer.current_pos());
    (anchor.min(caret), buffer.position_after(anchor.max(caret)))
}

/// `x`
pub fn delete_char(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let pos = buffer.current_pos();
    let stop = advance_in_line(buffer, pos, count.max(1));
    if stop > pos {
        session.copy_internal(buffer, pos, stop, true, false)?;
    }
    Ok(())
}

/// `X`
pub fn delete_char_before(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let pos = buffer.current_pos();
    let line_start = buffer.position_from_line(buffer.line_from_position(pos));
    let mut start = pos;
    for _ in 0..count.max(1) {
        if start <= line_start {
            break;
        }
        start = buffer.position_before(start);
    }
    if start < pos {
        session.copy_internal(buffer, start, pos, true, false)?;
    }
    Ok(())
}

/// `s`: `x`, then Insert mode.
pub fn substitute(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    delete_char(session, buffer, count)
}

/// `D` and `C`: to the end of the line, `count - 1` lines further down.
pub fn delete_to_end(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let pos = buffer.current_pos();
    let line = buffer.line_from_position(pos) + count.max(1) - 1;
    let line = line.min(buffer.line_count().saturating_sub(1));
    let end = buffer.line_end_position(line);
    if end > pos {
        session.copy_internal(buffer, pos, end, true, false)?;
    }
    Ok(())
}

fn swap_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_uppercase() {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
    }
    out
}

/// `~`: swaps case under the caret and moves on, or across a visual selection.
pub fn toggle_case(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let (start, end) = if in_visual(session) {
        visual_span(buffer)
    } else {
        let pos = buffer.current_pos();
        (pos, advance_in_line(buffer, pos, count.max(1)))
    };
    if end <= start {
        return Ok(());
    }
    let swapped = swap_case(&buffer.text_range(start, end));
    buffer
        .replace_range(start, end, &swapped)
        .map_err(|e| EngineError::host("toggle_case", e))?;
    let caret = if in_visual(session) {
        start
    } else {
        start + swapped.len()
    };
    buffer.set_current_pos(caret);
    Ok(())
}

/// `r`: waits for the replacement character.
pub fn replace_char(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    session.set_mode(buffer, Mode::ReplaceChar);
    Ok(())
}

/// The second half of `r{char}`.
pub fn replace_with_char(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let Some(ch) = session.state.replace_char else {
        return Err(EngineError::user("No replacement character"));
    };

    if in_visual(session) {
        let (start, end) = visual_span(buffer);
        let replaced: String = buffer
            .text_range(start, end)
            .chars()
            .map(|c| if matches!(c, '\n' | '\r') { c } else { ch })
            .collect();
        buffer
            .replace_range(start, end, &replaced)
            .map_err(|e| EngineError::host("replace_char", e))?;
        buffer.set_current_pos(start);
        return Ok(());
    }

    let pos = buffer.current_pos();
    let end = buffer.line_end_position(buffer.line_from_position(pos));
    let mut stop = pos;
    let mut replaced = 0;
    while replaced < count.max(1) && stop < end {
        stop = buffer.position_after(stop);
        replaced += 1;
    }
    if replaced == 0 {
        return Ok(());
    }

    if matches!(ch, '\n' | '\r') {
        let eol = buffer.eol().to_string();
        buffer
            .replace_range(pos, stop, &eol)
            .map_err(|e| EngineError::host("replace_char", e))?;
        buffer.set_current_pos(pos + eol.len());
    } else {
        let replacement: String = std::iter::repeat_n(ch, replaced).collect();
        buffer
            .replace_range(pos, stop, &replacement)
            .map_err(|e| EngineError::host("replace_char", e))?;
        buffer.set_current_pos(pos + (replaced - 1) * ch.len_utf8());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::controller::{CommandHandler, Mode, Session};
    use crate::document_model::TextBuffer;
    use crate::error::EngineError;
    use crate::host::{Buffer, MessageLog};
    use crate::keys::parse_keys;

    fn run(text: &str, keys: &str) -> (Session, TextBuffer) {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text(text);
        for key in parse_keys(keys).unwrap() {
            session.handle_keypress(&mut buffer, key);
        }
        (session, buffer)
    }

    #[test]
    fn test_x_and_small_delete_register() {
        let (mut session, buffer) = run("abcdef", "2x");
        assert_eq!(buffer.text(), "cdef");
        assert_eq!(session.registers_mut().read(Some('-'), None).unwrap(), "ab");
    }

    #[test]
    fn test_x_into_explicit_unnamed_register() {
        let (mut session, buffer) = run("abc", "\"\"x");
        assert_eq!(buffer.text(), "bc");
        assert_eq!(session.registers_mut().read(Some('0'), None).unwrap(), "a");
        assert_eq!(session.registers_mut().read(Some('-'), None).unwrap(), "");
    }

    #[test]
    fn test_x_stays_on_line() {
        let (_, buffer) = run("ab\ncd", "l5x");
        assert_eq!(buffer.text(), "a\ncd");
        assert_eq!(buffer.current_pos(), 0);
    }

    #[test]
    fn test_x_at_line_end_moves_caret_back() {
        let (_, buffer) = run("abc", "$x");
        assert_eq!(buffer.text(), "ab");
        assert_eq!(buffer.current_pos(), 1);
    }

    #[test]
    fn test_capital_x() {
        let (_, buffer) = run("abcdef", "$3X");
        assert_eq!(buffer.text(), "abf");
        let (_, buffer) = run("abc", "X");
        assert_eq!(buffer.text(), "abc");
    }

    #[test]
    fn test_substitute_and_dot() {
        let (_, buffer) = run("aaaa", "2sxy<Esc>l.");
        assert_eq!(buffer.text(), "xyxy");
    }

    #[test]
    fn test_d_and_c_to_end() {
        let (_, buffer) = run("hello world\nnext", "wD");
        assert_eq!(buffer.text(), "hello \nnext");
        let (session, buffer) = run("hello world", "wCthere<Esc>");
        assert_eq!(buffer.text(), "hello there");
        assert_eq!(session.mode(), Mode::Normal);
        let (_, buffer) = run("a1\nb2\nc3", "l2D");
        assert_eq!(buffer.text(), "a\nc3");
    }

    #[test]
    fn test_toggle_case() {
        let (_, buffer) = run("abC d", "3~");
        assert_eq!(buffer.text(), "ABc d");
        assert_eq!(buffer.current_pos(), 3);
        let (session, buffer) = run("hello world", "wve~");
        assert_eq!(buffer.text(), "hello WORLD");
        assert_eq!(session.mode(), Mode::Normal);
    }

    #[test]
    fn test_replace_char() {
        let (session, buffer) = run("abcd", "3rx");
        assert_eq!(buffer.text(), "xxxd");
        assert_eq!(buffer.current_pos(), 2);
        assert_eq!(session.mode(), Mode::Normal);
        let (_, buffer) = run("ab cd", "lr<CR>");
        assert_eq!(buffer.text(), "a\n cd");
        let (_, buffer) = run("abcd", "vllrz");
        assert_eq!(buffer.text(), "zzzd");
    }

    #[test]
    fn test_replace_char_count_clipped_to_line() {
        let log = MessageLog::new();
        let mut session = Session::builder().status(Box::new(log.clone())).build();
        let mut buffer = TextBuffer::from_text("ab\ncd");
        for key in parse_keys("5rx").unwrap() {
            session.handle_keypress(&mut buffer, key);
        }
        assert_eq!(buffer.text(), "xx\ncd");
        assert_eq!(buffer.current_pos(), 1);
        assert!(log.warnings().is_empty());
        assert_eq!(session.mode(), Mode::Normal);

        let (_, buffer) = run("abc", "l9ry");
        assert_eq!(buffer.text(), "ayy");
    }

    #[test]
    fn test_delete_into_read_only_register_is_refused() {
        let log = MessageLog::new();
        let mut session = Session::builder().status(Box::new(log.clone())).build();
        let mut buffer = TextBuffer::from_text("abc");
        for key in parse_keys("\":x").unwrap() {
            session.handle_keypress(&mut buffer, key);
        }
        assert_eq!(buffer.text(), "abc");
        assert_eq!(
            log.warnings(),
            vec![EngineError::ReadOnlyRegister(':').to_string()]
        );
        assert_eq!(session.register(), None);
    }
}
