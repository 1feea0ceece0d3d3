//! `y`, `d`, `c`, `>` and `<`.
//!
//! In Normal mode these only mark the operator as pending; the dispatcher applies it once
//! a motion (or the same key again) arrives. On a visual selection the dispatcher applies
//! it straight away.

use crate::controller::mode::Operator;
use crate::controller::session::Session;
use crate::error::EngineResult;
use crate::host::Buffer;

fn pend(session: &mut Session, op: Operator) -> EngineResult<()> {
    session.state.operator = Some(op);
    Ok(())
}

pub fn yank_operation(session: &mut Session, _buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    pend(session, Operator::Yank)
}

pub fn delete_operation(session: &mut Session, _buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    pend(session, Operator::Delete)
}

pub fn change_operation(session: &mut Session, _buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    pend(session, Operator::Change)
}

pub fn indent_operation(session: &mut Session, _buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    pend(session, Operator::Indent)
}

pub fn dedent_operation(session: &mut Session, _buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    pend(session, Operator::Dedent)
}

#[cfg(test)]
mod tests {
    use crate::controller::{CommandHandler, Mode, Operator, Session};
    use crate::document_model::TextBuffer;
    use crate::host::Buffer;
    use crate::keys::parse_keys;

    fn feed(session: &mut Session, buffer: &mut TextBuffer, keys: &str) {
        for key in parse_keys(keys).unwrap() {
            session.handle_keypress(buffer, key);
        }
    }

    #[test]
    fn test_operator_waits_for_motion() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("abc def");
        feed(&mut session, &mut buffer, "2y");
        assert_eq!(session.operator(), Some(Operator::Yank));
        assert_eq!(session.repeat_count(), 2);
        feed(&mut session, &mut buffer, "<Esc>");
        assert_eq!(session.operator(), None);
        assert_eq!(session.repeat_count(), 0);
        assert_eq!(session.mode(), Mode::Normal);
    }

    #[test]
    fn test_same_key_twice_is_linewise() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("a\nb\nc");
        feed(&mut session, &mut buffer, "2yyjp");
        assert_eq!(buffer.text(), "a\nb\na\nb\nc");
        feed(&mut session, &mut buffer, "gg>>");
        assert_eq!(buffer.text(), "\ta\nb\na\nb\nc");
        feed(&mut session, &mut buffer, "<<");
        assert_eq!(buffer.text(), "a\nb\na\nb\nc");
    }

    #[test]
    fn test_indent_with_motion() {
        let mut session = Session::new();
        session.settings_mut().set_option("et").unwrap();
        session.settings_mut().set_option("sts=2").unwrap();
        let mut buffer = TextBuffer::from_text("a\nb\n\nc");
        feed(&mut session, &mut buffer, ">G");
        assert_eq!(buffer.text(), "  a\n  b\n\n  c");
        feed(&mut session, &mut buffer, "<j");
        assert_eq!(buffer.text(), "a\nb\n\n  c");
    }

    #[test]
    fn test_visual_yank_applies_immediately() {
        let mut session = Session::new();
        let mut buffer = TextBuffer::from_text("hello world");
        feed(&mut session, &mut buffer, "wvey");
        assert_eq!(session.mode(), Mode::Normal);
        assert_eq!(session.operator(), None);
        assert_eq!(buffer.current_pos(), 6);
        assert_eq!(session.registers_mut().read(None, None).unwrap(), "world");
    }
}
