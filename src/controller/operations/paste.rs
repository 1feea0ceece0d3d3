use crate::controller::session::Session;
use crate::document_model::PasteMode;
use crate::document_model::movement::first_non_blank;
use crate::error::{EngineError, EngineResult, HostError};
use crate::host::Buffer;

fn strip_terminator(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .or_else(|| text.strip_suffix('\r'))
        .unwrap_or(text)
}

/// Inserts whole lines so that they start at line `target`. Past the last line they go
/// below it instead, and the caret lands on the first of them.
pub(crate) fn put_lines(buffer: &mut dyn Buffer, block: &str, target: usize) -> Result<(), HostError> {
    if target < buffer.line_count() {
        let at = buffer.position_from_line(target);
        buffer.insert_text(at, block)?;
    } else {
        // Below the last line: the terminator goes in front instead of behind.
        let with_eol = format!("{}{}", buffer.eol(), strip_terminator(block));
        let at = buffer.text_length();
        buffer.insert_text(at, &with_eol)?;
    }
    buffer.set_current_pos(first_non_blank(buffer, target));
    Ok(())
}

fn put(session: &mut Session, buffer: &mut dyn Buffer, count: usize, after: bool) -> EngineResult<()> {
    let path = buffer.file_path();
    let text = session.registers.read(session.state.register, path.as_deref())?;
    if text.is_empty() {
        let name = session.state.register.unwrap_or('"');
        return Err(EngineError::user(format!("E353: Nothing in register {}", name)));
    }
    let block = text.repeat(count.max(1));
    let host = |e: HostError| EngineError::host(if after { "paste_after" } else { "paste_before" }, e);

    match PasteMode::of(&text) {
        PasteMode::Lines => {
            let line = buffer.line_from_position(buffer.current_pos());
            let target = if after { line + 1 } else { line };
            put_lines(buffer, &block, target).map_err(host)?;
        }
        PasteMode::Chars => {
            let pos = buffer.current_pos();
            let line_end = buffer.line_end_position(buffer.line_from_position(pos));
            let at = if after && pos < line_end {
                buffer.position_after(pos)
            } else {
                pos
            };
            buffer.insert_text(at, &block).map_err(host)?;
            let last_len = block.chars().last().map_or(0, char::len_utf8);
            buffer.set_current_pos(at + block.len() - last_len);
        }
    }
    Ok(())
}

/// `p`
pub fn paste_after(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    put(session, buffer, count, true)
}

/// `P`
pub fn paste_before(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    put(session, buffer, count, false)
}
