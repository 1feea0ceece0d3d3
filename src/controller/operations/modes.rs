use crate::controller::mode::{Mode, VisualMode};
use crate::controller::session::Session;
use crate::error::EngineResult;
use crate::host::Buffer;

/// `v`, `V` and `Ctrl-V`: enter that kind of Visual mode, switch to it, or leave it when
/// it is already active.
fn toggle(session: &mut Session, buffer: &mut dyn Buffer, kind: VisualMode) -> EngineResult<()> {
    match session.state.mode {
        Mode::Visual if session.state.visual_mode == kind => {
            session.set_mode(buffer, Mode::Normal);
        }
        Mode::Visual => {
            session.state.visual_mode = kind;
            buffer.set_selection_mode(kind.selection_mode());
        }
        Mode::Select => {
            session.state.visual_mode = kind;
            session.set_mode(buffer, Mode::Visual);
        }
        _ => {
            session.state.visual_mode = kind;
            let caret = buffer.current_pos();
            buffer.set_anchor(caret);
            session.set_mode(buffer, Mode::Visual);
        }
    }
    Ok(())
}

pub fn toggle_visual(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    toggle(session, buffer, VisualMode::Char)
}

pub fn toggle_visual_line(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    toggle(session, buffer, VisualMode::Line)
}

pub fn toggle_visual_block(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    toggle(session, buffer, VisualMode::Block)
}

/// `o` on a selection: the caret jumps to the other end.
pub fn visual_swap_ends(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    if matches!(session.state.mode, Mode::Visual | Mode::Select) {
        let (anchor, caret) = (buffer.anchor(), buffer.current_pos());
        buffer.set_selection(caret, anchor);
    }
    Ok(())
}

/// `gh`: selects the character under the caret; typing replaces the selection.
pub fn select_mode(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    let pos = buffer.current_pos();
    let line_end = buffer.line_end_position(buffer.line_from_position(pos));
    let end = if pos < line_end { buffer.position_after(pos) } else { pos };
    buffer.set_selection(pos, end);
    session.set_mode(buffer, Mode::Select);
    Ok(())
}

/// `"`: the next key names the register.
pub fn set_register(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    session.set_mode(buffer, Mode::SetRegister);
    Ok(())
}

/// `:`, pre-filled with the selection range when a selection is active.
pub fn command_line(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    let prefill = if matches!(session.state.mode, Mode::Visual | Mode::Select) {
        "'<,'>"
    } else {
        ""
    };
    session.input.open(':', prefill);
    session.set_mode(buffer, Mode::Command);
    Ok(())
}
