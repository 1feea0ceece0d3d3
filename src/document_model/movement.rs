//! Cursor movement built only from the [`Buffer`] position primitives.
//!
//! These back the [`BufferOp`] motions for hosts that do not run them natively.

use crate::error::{EngineError, EngineResult};
use crate::host::{Buffer, BufferOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    Eol,
    Word,
    Punct,
}

fn classify(c: char, big: bool) -> CharClass {
    match c {
        '\n' | '\r' => CharClass::Eol,
        c if c.is_whitespace() => CharClass::Space,
        _ if big => CharClass::Word,
        c if c.is_alphanumeric() || c == '_' => CharClass::Word,
        _ => CharClass::Punct,
    }
}

fn class_at(buffer: &dyn Buffer, pos: usize, big: bool) -> CharClass {
    buffer
        .char_at(pos)
        .map_or(CharClass::Eol, |c| classify(c, big))
}

fn is_line_start(buffer: &dyn Buffer, pos: usize) -> bool {
    buffer.position_from_line(buffer.line_from_position(pos)) == pos
}

/// Start of the next word, stopping on empty lines. Returns the document length past
/// the last word.
pub fn word_right(buffer: &dyn Buffer, pos: usize, big: bool) -> usize {
    let len = buffer.text_length();
    if pos >= len {
        return len;
    }
    let mut p = pos;
    let start = class_at(buffer, p, big);
    if !matches!(start, CharClass::Space | CharClass::Eol) {
        while p < len && class_at(buffer, p, big) == start {
            p = buffer.position_after(p);
        }
    }
    while p < len {
        match class_at(buffer, p, big) {
            CharClass::Space => p = buffer.position_after(p),
            CharClass::Eol => {
                if p != pos && is_line_start(buffer, p) {
                    break;
                }
                p = buffer.position_after(p);
            }
            _ => break,
        }
    }
    p
}

pub fn word_left(buffer: &dyn Buffer, pos: usize, big: bool) -> usize {
    if pos == 0 {
        return 0;
    }
    let mut p = buffer.position_before(pos);
    loop {
        match class_at(buffer, p, big) {
            CharClass::Space => {}
            CharClass::Eol => {
                if is_line_start(buffer, p) {
                    return p;
                }
            }
            _ => break,
        }
        if p == 0 {
            return 0;
        }
        p = buffer.position_before(p);
    }
    let class = class_at(buffer, p, big);
    while p > 0 {
        let prev = buffer.position_before(p);
        if class_at(buffer, prev, big) != class {
            break;
        }
        p = prev;
    }
    p
}

/// Last character of the current or next word.
pub fn word_end(buffer: &dyn Buffer, pos: usize, big: bool) -> usize {
    let len = buffer.text_length();
    if len == 0 {
        return 0;
    }
    let mut p = buffer.position_after(pos);
    while p < len && matches!(class_at(buffer, p, big), CharClass::Space | CharClass::Eol) {
        p = buffer.position_after(p);
    }
    if p >= len {
        return buffer.position_before(len);
    }
    let class = class_at(buffer, p, big);
    loop {
        let next = buffer.position_after(p);
        if next >= len || class_at(buffer, next, big) != class {
            return p;
        }
        p = next;
    }
}

/// End (exclusive) of the run of same-class characters starting at `pos`. A blank only
/// covers itself.
pub fn word_run_end(buffer: &dyn Buffer, pos: usize, big: bool) -> usize {
    let len = buffer.text_length();
    match class_at(buffer, pos, big) {
        CharClass::Eol => pos.min(len),
        CharClass::Space => buffer.position_after(pos),
        class => {
            let mut p = pos;
            while p < len && class_at(buffer, p, big) == class {
                p = buffer.position_after(p);
            }
            p
        }
    }
}

/// The keyword under or after `pos` on its line, as used by `*` and `#`.
pub fn word_under(buffer: &dyn Buffer, pos: usize) -> Option<(usize, usize)> {
    let end = buffer.line_end_position(buffer.line_from_position(pos));
    let mut p = pos;
    while p < end && class_at(buffer, p, false) != CharClass::Word {
        p = buffer.position_after(p);
    }
    if p >= end {
        return None;
    }
    let line_start = buffer.position_from_line(buffer.line_from_position(pos));
    let mut start = p;
    while start > line_start {
        let prev = buffer.position_before(start);
        if class_at(buffer, prev, false) != CharClass::Word {
            break;
        }
        start = prev;
    }
    Some((start, word_run_end(buffer, p, false)))
}

pub fn first_non_blank(buffer: &dyn Buffer, line: usize) -> usize {
    let mut p = buffer.position_from_line(line);
    let end = buffer.line_end_position(line);
    while p < end && matches!(buffer.char_at(p), Some(' ' | '\t')) {
        p = buffer.position_after(p);
    }
    p
}

pub fn paragraph_down(buffer: &dyn Buffer, pos: usize) -> usize {
    let last = buffer.line_count().saturating_sub(1);
    let mut line = buffer.line_from_position(pos);
    while line < last && buffer.is_line_empty(line) {
        line += 1;
    }
    while line < last && !buffer.is_line_empty(line) {
        line += 1;
    }
    if buffer.is_line_empty(line) {
        buffer.position_from_line(line)
    } else {
        buffer.text_length()
    }
}

pub fn paragraph_up(buffer: &dyn Buffer, pos: usize) -> usize {
    let mut line = buffer.line_from_position(pos);
    while line > 0 && buffer.is_line_empty(line) {
        line -= 1;
    }
    while line > 0 && !buffer.is_line_empty(line) {
        line -= 1;
    }
    buffer.position_from_line(line)
}

fn bracket_pair(c: char) -> Option<(char, char, bool)> {
    match c {
        '(' => Some(('(', ')', true)),
        '[' => Some(('[', ']', true)),
        '{' => Some(('{', '}', true)),
        ')' => Some(('(', ')', false)),
        ']' => Some(('[', ']', false)),
        '}' => Some(('{', '}', false)),
        _ => None,
    }
}

/// Partner of the first bracket at or after `pos` on its line.
pub fn match_brace(buffer: &dyn Buffer, pos: usize) -> Option<usize> {
    let end = buffer.line_end_position(buffer.line_from_position(pos));
    let mut p = pos;
    let (open, close, forward) = loop {
        if p >= end {
            return None;
        }
        if let Some(pair) = buffer.char_at(p).and_then(bracket_pair) {
            break pair;
        }
        p = buffer.position_after(p);
    };

    let mut depth = 0usize;
    let len = buffer.text_length();
    loop {
        match buffer.char_at(p) {
            Some(c) if c == open => {
                if forward {
                    depth += 1;
                } else {
                    depth -= 1;
                }
            }
            Some(c) if c == close => {
                if forward {
                    depth -= 1;
                } else {
                    depth += 1;
                }
            }
            _ => {}
        }
        if depth == 0 {
            return Some(p);
        }
        if forward {
            p = buffer.position_after(p);
            if p >= len {
                return None;
            }
        } else {
            if p == 0 {
                return None;
            }
            p = buffer.position_before(p);
        }
    }
}

fn move_lines(buffer: &mut dyn Buffer, delta: isize) {
    let pos = buffer.current_pos();
    let line = buffer.line_from_position(pos);
    let last = buffer.line_count().saturating_sub(1);
    let target = line.saturating_add_signed(delta).min(last);
    let col = buffer.column(pos);
    let to = buffer.find_column(target, col);
    buffer.set_current_pos(to);
}

/// Runs `op` with the engine's own implementation.
pub fn run_fallback(buffer: &mut dyn Buffer, op: BufferOp) -> EngineResult<()> {
    let pos = buffer.current_pos();
    let page = buffer.lines_on_screen().max(2) as isize;
    let target = match op {
        BufferOp::WordLeft => word_left(buffer, pos, false),
        BufferOp::WordRight => word_right(buffer, pos, false),
        BufferOp::WordEnd => word_end(buffer, pos, false),
        BufferOp::BigWordLeft => word_left(buffer, pos, true),
        BufferOp::BigWordRight => word_right(buffer, pos, true),
        BufferOp::BigWordEnd => word_end(buffer, pos, true),
        BufferOp::Home => buffer.position_from_line(buffer.line_from_position(pos)),
        BufferOp::VcHome => first_non_blank(buffer, buffer.line_from_position(pos)),
        BufferOp::DocumentEnd => first_non_blank(buffer, buffer.line_count().saturating_sub(1)),
        BufferOp::ParaUp => paragraph_up(buffer, pos),
        BufferOp::ParaDown => paragraph_down(buffer, pos),
        BufferOp::MatchBrace => match match_brace(buffer, pos) {
            Some(p) => p,
            None => return Ok(()),
        },
        BufferOp::PageUp | BufferOp::PageDown | BufferOp::HalfPageUp | BufferOp::HalfPageDown => {
            let delta = match op {
                BufferOp::PageUp => -(page - 2),
                BufferOp::PageDown => page - 2,
                BufferOp::HalfPageUp => -(page / 2),
                _ => page / 2,
            };
            move_lines(buffer, delta);
            return Ok(());
        }
        BufferOp::Undo | BufferOp::Redo => {
            return Err(EngineError::NotImplemented(op.name().to_string()));
        }
    };
    buffer.set_current_pos(target);
    Ok(())
}
