use crate::controller::mode::{CopyMode, Mode, Operator};
use crate::controller::session::Session;
use crate::document_model::movement::first_non_blank;
use crate::error::{EngineError, EngineResult};
use crate::host::Buffer;
use tracing::debug;

/// Byte span of lines `first..=last`, terminator of `last` included.
fn block_span(buffer: &dyn Buffer, first: usize, last: usize) -> (usize, usize) {
    let start = buffer.position_from_line(first);
    let end = if last + 1 < buffer.line_count() {
        buffer.position_from_line(last + 1)
    } else {
        buffer.text_length()
    };
    (start, end)
}

fn last_line_of(buffer: &dyn Buffer, first: usize, count: usize) -> usize {
    (first + count.max(1) - 1).min(buffer.line_count().saturating_sub(1))
}

/// Linewise register text: whole lines, always ending in a terminator.
fn linewise_text(buffer: &dyn Buffer, first: usize, last: usize) -> String {
    let (start, end) = block_span(buffer, first, last);
    let mut text = buffer.text_range(start, end);
    if !text.ends_with(['\n', '\r']) {
        text.push_str(buffer.eol());
    }
    text
}

impl Session {
    pub(crate) fn apply_line_operator(
        &mut self,
        buffer: &mut dyn Buffer,
        op: Operator,
        first: usize,
        count: usize,
    ) -> EngineResult<()> {
        match op {
            Operator::Yank => self.copy_lines(buffer, first, count),
            Operator::Delete => self.cut_lines(buffer, first, count),
            Operator::Change => self.change_lines(buffer, first, count),
            Operator::Indent | Operator::Dedent => {
                let last = last_line_of(buffer, first, count);
                self.shift_lines(buffer, first, last, op == Operator::Indent)
            }
        }
    }

    fn keep_linewise(&mut self, text: &str, deleted: bool) -> EngineResult<()> {
        self.state.internal_buffer = text.to_string();
        self.state.copy_mode = CopyMode::Lines;
        self.store_register(text, deleted)
    }

    /// `dd`. Cutting the final lines also takes the terminator before them, and the caret
    /// moves up to the new last line.
    pub(crate) fn cut_lines(&mut self, buffer: &mut dyn Buffer, first: usize, count: usize) -> EngineResult<()> {
        self.check_register_writable()?;
        let last_line = buffer.line_count().saturating_sub(1);
        let last = last_line_of(buffer, first, count);
        let text = linewise_text(buffer, first, last);
        let (mut start, end) = block_span(buffer, first, last);
        let reached_end = last == last_line && first > 0;
        if reached_end {
            start = buffer.line_end_position(first - 1);
        }
        debug!("cut lines {}..={}", first, last);
        buffer
            .delete_range(start, end)
            .map_err(|e| EngineError::host("line_cut", e))?;
        self.keep_linewise(&text, true)?;

        let line = if reached_end { first - 1 } else { first };
        let line = line.min(buffer.line_count().saturating_sub(1));
        buffer.set_current_pos(first_non_blank(buffer, line));
        Ok(())
    }

    pub(crate) fn copy_lines(&mut self, buffer: &mut dyn Buffer, first: usize, count: usize) -> EngineResult<()> {
        self.check_register_writable()?;
        let last = last_line_of(buffer, first, count);
        let text = linewise_text(buffer, first, last);
        self.keep_linewise(&text, false)
    }

    /// `cc`/`S`: clears the lines down to one, keeping the first line's indent.
    pub(crate) fn change_lines(&mut self, buffer: &mut dyn Buffer, first: usize, count: usize) -> EngineResult<()> {
        self.check_register_writable()?;
        let last = last_line_of(buffer, first, count);
        let text = linewise_text(buffer, first, last);
        let start = first_non_blank(buffer, first);
        let end = buffer.line_end_position(last);
        buffer
            .delete_range(start, end)
            .map_err(|e| EngineError::host("change_line", e))?;
        buffer.set_current_pos(start);
        self.keep_linewise(&text, true)
    }

    /// `>>`/`<<` over lines `first..=last`. Empty lines are not indented.
    pub(crate) fn shift_lines(
        &mut self,
        buffer: &mut dyn Buffer,
        first: usize,
        last: usize,
        indent: bool,
    ) -> EngineResult<()> {
        let unit = self.settings.indent_unit();
        let width = self.settings.indent_width();
        let last = last.min(buffer.line_count().saturating_sub(1));
        for line in first..=last {
            let start = buffer.position_from_line(line);
            if indent {
                if !buffer.is_line_empty(line) {
                    buffer
                        .insert_text(start, &unit)
                        .map_err(|e| EngineError::host("indent", e))?;
                }
                continue;
            }
            let mut p = start;
            let mut removed = 0;
            while removed < width {
                match buffer.char_at(p) {
                    Some(' ') => {
                        p += 1;
                        removed += 1;
                    }
                    Some('\t') => {
                        p += 1;
                        break;
                    }
                    _ => break,
                }
            }
            if p > start {
                buffer
                    .delete_range(start, p)
                    .map_err(|e| EngineError::host("dedent", e))?;
            }
        }
        buffer.set_current_pos(first_non_blank(buffer, first));
        Ok(())
    }
}

fn current_line(buffer: &dyn Buffer) -> usize {
    buffer.line_from_position(buffer.current_pos())
}

pub fn line_cut(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let line = current_line(buffer);
    session.cut_lines(buffer, line, count.max(1))
}

pub fn line_copy(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let line = current_line(buffer);
    session.copy_lines(buffer, line, count.max(1))
}

pub fn change_line(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let line = current_line(buffer);
    session.change_lines(buffer, line, count.max(1))
}

pub fn indent_lines(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let line = current_line(buffer);
    let last = last_line_of(buffer, line, count);
    session.shift_lines(buffer, line, last, true)
}

pub fn dedent_lines(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let line = current_line(buffer);
    let last = last_line_of(buffer, line, count);
    session.shift_lines(buffer, line, last, false)
}

/// Joins `line` with the next one. Returns `false` when there is no next line.
fn join_once(buffer: &mut dyn Buffer, line: usize) -> EngineResult<bool> {
    if line + 1 >= buffer.line_count() {
        return Ok(false);
    }
    let line_start = buffer.position_from_line(line);
    let join_at = buffer.line_end_position(line);
    let content = first_non_blank(buffer, line + 1);
    let next_empty = content >= buffer.line_end_position(line + 1);
    let ends_blank = join_at > line_start
        && matches!(buffer.char_at(buffer.position_before(join_at)), Some(' ' | '\t'));
    let closing = buffer.char_at(content) == Some(')');
    let separator = if next_empty || ends_blank || closing || join_at == line_start {
        ""
    } else {
        " "
    };
    buffer
        .replace_range(join_at, content, separator)
        .map_err(|e| EngineError::host("join_lines", e))?;
    buffer.set_current_pos(join_at);
    Ok(true)
}

/// `J`: joins `count` lines (at least two), or every line of a visual selection.
pub fn join_lines(session: &mut Session, buffer: &mut dyn Buffer, count: usize) -> EngineResult<()> {
    let (first, joins) = if matches!(session.state.mode, Mode::Visual | Mode::Select) {
        let (anchor, caret) = (buffer.anchor(), buffer.current_pos());
        let first = buffer.line_from_position(anchor.min(caret));
        let last = buffer.line_from_position(anchor.max(caret));
        (first, (last - first).max(1))
    } else {
        (current_line(buffer), count.max(2) - 1)
    };
    join_span(buffer, first, joins)
}

/// Joins `joins` following lines onto line `first`, stopping at the last line.
pub(crate) fn join_span(buffer: &mut dyn Buffer, first: usize, joins: usize) -> EngineResult<()> {
    for _ in 0..joins {
        if !join_once(buffer, first)? {
            break;
        }
    }
    Ok(())
}
