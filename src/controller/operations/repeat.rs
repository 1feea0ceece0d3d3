use crate::controller::session::Session;
use crate::controller::state::LastChange;
use crate::error::EngineResult;
use crate::host::{Buffer, UndoGroup};
use tracing::debug;

/// `.`: replays the last change, with `count` replacing its count when given.
///
/// The replay runs as one undo step. The remembered change is left untouched, so
/// repeating again replays the same thing.
pub fn repeat_last(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let Some(change) = session.state.last_change.clone() else {
        return Ok(());
    };
    debug!("repeat {} count={} operator={:?}", change.command, count, change.operator);

    let mut scope = UndoGroup::begin(buffer, true);
    let buffer: &mut dyn Buffer = &mut *scope;

    let saved = (session.state.find, session.state.replace_char);
    session.state.find = change.find;
    session.state.replace_char = change.replace_char;
    session.state.replaying = true;

    let result = replay(session, buffer, &change, count);

    session.state.replaying = false;
    (session.state.find, session.state.replace_char) = saved;
    result
}

fn replay(session: &mut Session, buffer: &mut dyn Buffer, change: &LastChange, count: usize) -> EngineResult<()> {
    session.state.operator = change.operator;
    session.state.repeat_count = if count > 0 { count } else { change.count };
    session.dispatch(buffer, change.command)?;

    if session.state.mode.is_text_entry() {
        if !change.inserted.is_empty() {
            session.insert_typed(buffer, &change.inserted)?;
        }
        session.finish_insert(buffer)?;
    }
    Ok(())
}
