use crate::controller::mode::Mode;
use crate::controller::session::Session;
use crate::controller::state::FindState;
use crate::error::{EngineError, EngineResult};
use crate::host::Buffer;

fn begin(session: &mut Session, buffer: &mut dyn Buffer, forward: bool, before: bool) -> EngineResult<()> {
    session.state.pending_find = FindState {
        ch: None,
        forward,
        before,
    };
    session.set_mode(buffer, Mode::FindChar);
    Ok(())
}

pub fn find_char_forward(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    begin(session, buffer, true, false)
}

pub fn find_char_backward(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    begin(session, buffer, false, false)
}

pub fn till_char_forward(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    begin(session, buffer, true, true)
}

pub fn till_char_backward(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    begin(session, buffer, false, true)
}

/// `;`, and the second half of `f{char}`.
pub fn repeat_find(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let find = session.state.find;
    run_find(session, buffer, count.max(1), find)
}

/// `,`: the last find in the other direction.
pub fn repeat_find_reverse(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let mut find = session.state.find;
    find.forward = !find.forward;
    run_find(session, buffer, count.max(1), find)
}

/// Scans the current line only.
fn run_find(session: &Session, buffer: &mut dyn Buffer, count: usize, find: FindState) -> EngineResult<()> {
    let Some(ch) = find.ch else {
        return Err(EngineError::user("No previous character search"));
    };
    let pos = buffer.current_pos();
    let line = buffer.line_from_position(pos);
    let start = buffer.position_from_line(line);
    let end = buffer.line_end_position(line);

    let mut p = pos;
    for _ in 0..count {
        loop {
            if find.forward {
                let next = buffer.position_after(p);
                if next >= end {
                    return Err(EngineError::user("Character not found"));
                }
                p = next;
            } else {
                if p <= start {
                    return Err(EngineError::user("Character not found"));
                }
                p = buffer.position_before(p);
            }
            if buffer.char_at(p) == Some(ch) {
                break;
            }
        }
    }

    let mut target = match (find.before, find.forward) {
        (true, true) => buffer.position_before(p),
        (true, false) => buffer.position_after(p),
        (false, _) => p,
    };
    // Forward finds are inclusive when an operator consumes them.
    if find.forward && session.state.operator.is_some() {
        target = buffer.position_after(target);
    }
    buffer.set_current_pos(target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::controller::{CommandHandler, Mode, Session};
    use crate::document_model::TextBuffer;
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
    fn test_find_and_till() {
        let (session, buffer) = run("a,b,c,d", "f,");
        assert_eq!(buffer.current_pos(), 1);
        assert_eq!(session.mode(), Mode::Normal);
        let (_, buffer) = run("a,b,c,d", "2f,");
        assert_eq!(buffer.current_pos(), 3);
        let (_, buffer) = run("a,b,c,d", "t,");
        assert_eq!(buffer.current_pos(), 0);
        let (_, buffer) = run("a,b,c,d", "$F,");
        assert_eq!(buffer.current_pos(), 5);
        let (_, buffer) = run("a,b,c,d", "$T,");
        assert_eq!(buffer.current_pos(), 6);
    }

    #[test]
    fn test_repeat_and_reverse() {
        let (_, buffer) = run("a,b,c,d", "f,;;");
        assert_eq!(buffer.current_pos(), 5);
        let (_, buffer) = run("a,b,c,d", "f,;,");
        assert_eq!(buffer.current_pos(), 1);
    }

    #[test]
    fn test_find_never_leaves_the_line() {
        let log = MessageLog::new();
        let mut session = Session::builder().status(Box::new(log.clone())).build();
        let mut buffer = TextBuffer::from_text("abc\nxyz");
        for key in parse_keys("fx").unwrap() {
            session.handle_keypress(&mut buffer, key);
        }
        assert_eq!(buffer.current_pos(), 0);
        assert_eq!(log.warnings(), vec!["Character not found".to_string()]);
        assert_eq!(session.mode(), Mode::Normal);
    }

    #[test]
    fn test_operator_with_find_includes_target() {
        let (session, buffer) = run("one, two", "df,");
        assert_eq!(buffer.text(), " two");
        assert_eq!(session.operator(), None);
        let (_, buffer) = run("one, two", "dt,");
        assert_eq!(buffer.text(), ", two");
        let (_, buffer) = run("one, two", "$dF,");
        assert_eq!(buffer.text(), "oneo");
    }

    #[test]
    fn test_dot_repeats_find_operator() {
        let (_, buffer) = run("a-b-c-d", "df-.");
        assert_eq!(buffer.text(), "c-d");
    }
}
