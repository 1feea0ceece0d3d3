use crate::config::WhichWrap;
use crate::controller::session::Session;
use crate::document_model::movement;
use crate::error::EngineResult;
use crate::host::Buffer;

fn step_left(buffer: &mut dyn Buffer, wrap: bool) {
    let pos = buffer.current_pos();
    let line = buffer.line_from_position(pos);
    if pos > buffer.position_from_line(line) {
        buffer.set_current_pos(buffer.position_before(pos));
    } else if wrap && line > 0 {
        buffer.set_current_pos(buffer.line_end_position(line - 1));
    }
}

fn step_right(session: &Session, buffer: &mut dyn Buffer, wrap: bool) {
    let pos = buffer.current_pos();
    let line = buffer.line_from_position(pos);
    let start = buffer.position_from_line(line);
    let end = buffer.line_end_position(line);
    // Only an operator may reach past the last character.
    let limit = if session.state.operator.is_some() || session.state.mode.is_text_entry() {
        end
    } else {
        buffer.position_before(end).max(start)
    };
    if pos < limit {
        buffer.set_current_pos(buffer.position_after(pos));
    } else if wrap && line + 1 < buffer.line_count() {
        buffer.set_current_pos(buffer.position_from_line(line + 1));
    }
}

pub fn left(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    step_left(buffer, session.settings.whichwrap.contains(WhichWrap::H));
    Ok(())
}

pub fn right(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    step_right(session, buffer, session.settings.whichwrap.contains(WhichWrap::L));
    Ok(())
}

pub fn backspace_left(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    step_left(buffer, session.settings.whichwrap.contains(WhichWrap::BACKSPACE));
    Ok(())
}

pub fn space_right(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    step_right(session, buffer, session.settings.whichwrap.contains(WhichWrap::SPACE));
    Ok(())
}

/// Moves one line, keeping the remembered display column.
fn vertical(session: &mut Session, buffer: &mut dyn Buffer, down: bool) {
    let pos = buffer.current_pos();
    let line = buffer.line_from_position(pos);
    let target = if down {
        if line + 1 >= buffer.line_count() {
            return;
        }
        line + 1
    } else {
        if line == 0 {
            return;
        }
        line - 1
    };
    let col = *session
        .state
        .preferred_col
        .get_or_insert_with(|| buffer.column(pos));
    let dest = if col == usize::MAX {
        buffer.line_end_position(target)
    } else {
        buffer.find_column(target, col)
    };
    buffer.set_current_pos(dest);
}

pub fn line_down(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    vertical(session, buffer, true);
    Ok(())
}

pub fn line_up(session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    vertical(session, buffer, false);
    Ok(())
}

/// `$`: with a count, the end of the line `count - 1` lines down.
pub fn line_end(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let line = buffer.line_from_position(buffer.current_pos()) + count.max(1) - 1;
    let line = line.min(buffer.line_count().saturating_sub(1));
    buffer.set_current_pos(buffer.line_end_position(line));
    session.state.preferred_col = Some(usize::MAX);
    Ok(())
}

pub fn next_line_start(_session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    let line = buffer.line_from_position(buffer.current_pos());
    if line + 1 < buffer.line_count() {
        buffer.set_current_pos(movement::first_non_blank(buffer, line + 1));
    }
    Ok(())
}

pub fn prev_line_start(_session: &mut Session, buffer: &mut dyn Buffer, _count: usize) -> EngineResult<()> {
    let line = buffer.line_from_position(buffer.current_pos());
    if line > 0 {
        buffer.set_current_pos(movement::first_non_blank(buffer, line - 1));
    }
    Ok(())
}

fn goto_line(buffer: &mut dyn Buffer, count: usize, default: usize) {
    let last = buffer.line_count().saturating_sub(1);
    let line = if count > 0 { (count - 1).min(last) } else { default };
    buffer.set_current_pos(movement::first_non_blank(buffer, line));
}

/// `gg`, or line `count` when one was typed.
pub fn document_start(_session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    goto_line(buffer, count, 0);
    Ok(())
}

/// `G`, or line `count` when one was typed.
pub fn document_end(_session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let last = buffer.line_count().saturating_sub(1);
    goto_line(buffer, count, last);
    Ok(())
}

fn change_to_word_end(buffer: &mut dyn Buffer, count: usize, big: bool) {
    let mut pos = buffer.current_pos();
    for _ in 1..count.max(1) {
        pos = movement::word_right(buffer, pos, big);
    }
    buffer.set_current_pos(movement::word_run_end(buffer, pos, big));
}

/// `cw`: the span runs to the end of the word, not to the start of the next one.
pub fn change_word(_session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    change_to_word_end(buffer, count, false);
    Ok(())
}

pub fn change_big_word(_session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    change_to_word_end(buffer, count, true);
    Ok(())
}
