use super::undo::{UndoAction, UndoStack};
use crate::config::FileFormat;
use crate::error::HostError;
use crate::host::{Buffer, BufferOp, CaretStyle, SelectionMode};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;
use unicode_width::UnicodeWidthChar;

/// In-memory document implementing [`Buffer`].
///
/// Positions are byte offsets. Lines may end in `\n`, `\r\n` or a lone `\r`; the
/// terminators are kept as-is and only new lines are written with the configured
/// file format.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    text: String,
    line_starts: Vec<usize>,
    current_pos: usize,
    anchor: usize,
    selection_mode: SelectionMode,
    format: FileFormat,
    tab_width: usize,
    undo: UndoStack,
    caret_style: CaretStyle,
    overtype: bool,
    path: Option<PathBuf>,
    screen_lines: usize,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::from_text("")
    }

    pub fn from_text(text: &str) -> Self {
        let mut buffer = Self {
            text: text.to_string(),
            line_starts: Vec::new(),
            current_pos: 0,
            anchor: 0,
            selection_mode: SelectionMode::Stream,
            format: FileFormat::detect(text),
            tab_width: 8,
            undo: UndoStack::new(),
            caret_style: CaretStyle::Block,
            overtype: false,
            path: None,
            screen_lines: 24,
        };
        buffer.rebuild_line_starts();
        buffer
    }

    pub fn open(path: &Path) -> io::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };
        let mut buffer = Self::from_text(&content);
        buffer.path = Some(path.to_path_buf());
        Ok(buffer)
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.contents_for_save())
    }

    /// The document with every terminator rewritten to the current file format.
    pub fn contents_for_save(&self) -> String {
        let eol = self.format.terminator();
        let mut out = String::with_capacity(self.text.len());
        for line in 0..self.line_count() {
            out.push_str(&self.line_text(line));
            if line + 1 < self.line_count() {
                out.push_str(eol);
            }
        }
        out
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn file_format(&self) -> FileFormat {
        self.format
    }

    pub fn caret_style(&self) -> CaretStyle {
        self.caret_style
    }

    pub fn is_overtype(&self) -> bool {
        self.overtype
    }

    pub fn set_lines_on_screen(&mut self, lines: usize) {
        self.screen_lines = lines.max(1);
    }

    pub fn selection_text(&self) -> String {
        let (start, end) = if self.anchor <= self.current_pos {
            (self.anchor, self.current_pos)
        } else {
            (self.current_pos, self.anchor)
        };
        self.text_range(start, end)
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    fn rebuild_line_starts(&mut self) {
        self.line_starts.clear();
        self.line_starts.push(0);
        let bytes = self.text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    i += 2;
                    self.line_starts.push(i);
                }
                b'\r' | b'\n' => {
                    i += 1;
                    self.line_starts.push(i);
                }
                _ => i += 1,
            }
        }
    }

    fn clamp(&self, pos: usize) -> usize {
        let mut pos = pos.min(self.text.len());
        while !self.text.is_char_boundary(pos) {
            pos -= 1;
        }
        pos
    }

    fn check_position(&self, pos: usize) -> Result<(), HostError> {
        if pos > self.text.len() || !self.text.is_char_boundary(pos) {
            return Err(HostError::new(format!("invalid position {}", pos)));
        }
        Ok(())
    }

    fn char_width(&self, c: char, column: usize) -> usize {
        if c == '\t' {
            self.tab_width - (column % self.tab_width)
        } else {
            c.width().unwrap_or(0)
        }
    }

    fn restore_after_history(&mut self, cursor: usize) {
        self.rebuild_line_starts();
        let pos = self.clamp(cursor);
        self.current_pos = pos;
        self.anchor = pos;
    }
}

impl Buffer for TextBuffer {
    fn text_length(&self) -> usize {
        self.text.len()
    }

    fn current_pos(&self) -> usize {
        self.current_pos
    }

    fn set_current_pos(&mut self, pos: usize) {
        self.current_pos = self.clamp(pos);
    }

    fn anchor(&self) -> usize {
        self.anchor
    }

    fn set_anchor(&mut self, pos: usize) {
        self.anchor = self.clamp(pos);
    }

    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line_from_position(&self, pos: usize) -> usize {
        let pos = pos.min(self.text.len());
        self.line_starts.partition_point(|&start| start <= pos).saturating_sub(1)
    }

    fn position_from_line(&self, line: usize) -> usize {
        self.line_starts.get(line).copied().unwrap_or(self.text.len())
    }

    fn line_end_position(&self, line: usize) -> usize {
        match self.line_starts.get(line + 1) {
            Some(&next) => {
                if next >= 2 && &self.text.as_bytes()[next - 2..next] == b"\r\n" {
                    next - 2
                } else {
                    next - 1
                }
            }
            None => self.text.len(),
        }
    }

    fn position_before(&self, pos: usize) -> usize {
        let pos = self.clamp(pos);
        if pos == 0 {
            return 0;
        }
        if self.text[..pos].ends_with("\r\n") {
            return pos - 2;
        }
        self.text[..pos]
            .chars()
            .next_back()
            .map_or(0, |c| pos - c.len_utf8())
    }

    fn position_after(&self, pos: usize) -> usize {
        let pos = self.clamp(pos);
        let rest = &self.text[pos..];
        if rest.starts_with("\r\n") {
            return pos + 2;
        }
        rest.chars().next().map_or(pos, |c| pos + c.len_utf8())
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.text.get(pos..)?.chars().next()
    }

    fn text_range(&self, start: usize, end: usize) -> String {
        let start = self.clamp(start);
        let end = self.clamp(end);
        if start >= end {
            return String::new();
        }
        self.text[start..end].to_string()
    }

    fn insert_text(&mut self, pos: usize, text: &str) -> Result<(), HostError> {
        self.check_position(pos)?;
        if text.is_empty() {
            return Ok(());
        }
        trace!("insert {:?} at {}", text, pos);
        let action = UndoAction::InsertText {
            pos,
            text: text.to_string(),
        };
        action.apply_to_text(&mut self.text);
        self.undo.record(action, self.current_pos);
        self.rebuild_line_starts();

        let len = text.len();
        if self.current_pos > pos {
            self.current_pos += len;
        }
        if self.anchor > pos {
            self.anchor += len;
        }
        Ok(())
    }

    fn delete_range(&mut self, start: usize, end: usize) -> Result<(), HostError> {
        if start > end {
            return Err(HostError::new(format!("invalid range {}..{}", start, end)));
        }
        self.check_position(start)?;
        self.check_position(end)?;
        if start == end {
            return Ok(());
        }
        trace!("delete {}..{}", start, end);
        let action = UndoAction::DeleteText {
            pos: start,
            text: self.text[start..end].to_string(),
        };
        action.apply_to_text(&mut self.text);
        self.undo.record(action, self.current_pos);
        self.rebuild_line_starts();

        let shift = |p: usize| {
            if p >= end {
                p - (end - start)
            } else if p > start {
                start
            } else {
                p
            }
        };
        self.current_pos = shift(self.current_pos);
        self.anchor = shift(self.anchor);
        Ok(())
    }

    fn begin_undo(&mut self) {
        self.undo.begin_group(self.current_pos);
    }

    fn end_undo(&mut self) {
        self.undo.end_group();
    }

    fn selection_mode(&self) -> SelectionMode {
        self.selection_mode
    }

    fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.selection_mode = mode;
    }

    fn column(&self, pos: usize) -> usize {
        let pos = self.clamp(pos);
        let start = self.position_from_line(self.line_from_position(pos));
        self.text[start..pos]
            .chars()
            .fold(0, |col, c| col + self.char_width(c, col))
    }

    fn find_column(&self, line: usize, column: usize) -> usize {
        let start = self.position_from_line(line);
        let end = self.line_end_position(line);
        let mut col = 0;
        for (offset, c) in self.text[start..end].char_indices() {
            let width = self.char_width(c, col);
            if col + width > column {
                return start + offset;
            }
            col += width;
        }
        end
    }

    fn eol(&self) -> &str {
        self.format.terminator()
    }

    fn set_file_format(&mut self, format: FileFormat) {
        self.format = format;
    }

    fn set_tab_width(&mut self, width: usize) {
        self.tab_width = width.max(1);
    }

    fn set_caret_style(&mut self, style: CaretStyle) {
        self.caret_style = style;
    }

    fn set_overtype(&mut self, overtype: bool) {
        self.overtype = overtype;
    }

    fn lines_on_screen(&self) -> usize {
        self.screen_lines
    }

    fn file_path(&self) -> Option<String> {
        self.path.as_ref().map(|p| p.display().to_string())
    }

    fn execute_native(&mut self, op: BufferOp) -> Result<bool, HostError> {
        let cursor = match op {
            BufferOp::Undo => self.undo.undo(&mut self.text),
            BufferOp::Redo => self.undo.redo(&mut self.text),
            _ => return Ok(false),
        };
        if let Some(cursor) = cursor {
            self.restore_after_history(cursor);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_terminators() {
        let buffer = TextBuffer::from_text("a\r\nbb\rccc\nd");
        assert_eq!(buffer.line_count(), 4);
        assert_eq!(buffer.position_from_line(1), 3);
        assert_eq!(buffer.line_end_position(0), 1);
        assert_eq!(buffer.line_end_position(1), 5);
        assert_eq!(buffer.line_text(2), "ccc");
        assert_eq!(buffer.line_end_position(3), buffer.text_length());
        assert_eq!(buffer.line_from_position(4), 1);
        assert_eq!(buffer.line_from_position(buffer.text_length()), 3);
    }

    #[test]
    fn test_crlf_is_one_step() {
        let buffer = TextBuffer::from_text("a\r\nb");
        assert_eq!(buffer.position_after(1), 3);
        assert_eq!(buffer.position_before(3), 1);
    }

    #[test]
    fn test_multibyte_steps() {
        let buffer = TextBuffer::from_text("héllo");
        assert_eq!(buffer.position_after(1), 3);
        assert_eq!(buffer.position_before(3), 1);
        assert_eq!(buffer.char_at(1), Some('é'));
        assert_eq!(buffer.char_at(2), None);
    }

    #[test]
    fn test_columns_expand_tabs() {
        let mut buffer = TextBuffer::from_text("\tab\nxyz");
        buffer.set_tab_width(4);
        assert_eq!(buffer.column(1), 4);
        assert_eq!(buffer.column(2), 5);
        assert_eq!(buffer.find_column(0, 5), 2);
        assert_eq!(buffer.find_column(0, 2), 0);
        assert_eq!(buffer.find_column(1, 10), buffer.line_end_position(1));
    }

    #[test]
    fn test_edits_shift_caret() {
        let mut buffer = TextBuffer::from_text("hello world");
        buffer.goto_pos(6);
        buffer.insert_text(0, ">> ").unwrap();
        assert_eq!(buffer.current_pos(), 9);
        buffer.delete_range(0, 3).unwrap();
        assert_eq!(buffer.current_pos(), 6);
        assert_eq!(buffer.text(), "hello world");
    }

    #[test]
    fn test_invalid_positions_are_errors() {
        let mut buffer = TextBuffer::from_text("é");
        assert!(buffer.insert_text(1, "x").is_err());
        assert!(buffer.delete_range(0, 5).is_err());
    }

    #[test]
    fn test_grouped_undo() {
        let mut buffer = TextBuffer::from_text("abc");
        buffer.begin_undo();
        buffer.insert_text(3, "d").unwrap();
        buffer.begin_undo();
        buffer.delete_range(0, 1).unwrap();
        buffer.end_undo();
        buffer.end_undo();
        assert_eq!(buffer.text(), "bcd");

        assert!(buffer.execute_native(BufferOp::Undo).unwrap());
        assert_eq!(buffer.text(), "abc");
        assert!(buffer.execute_native(BufferOp::Redo).unwrap());
        assert_eq!(buffer.text(), "bcd");
        assert!(!buffer.execute_native(BufferOp::WordLeft).unwrap());
    }

    #[test]
    fn test_save_rewrites_terminators() {
        let mut buffer = TextBuffer::from_text("a\nb\r\nc");
        buffer.set_file_format(FileFormat::Dos);
        assert_eq!(buffer.contents_for_save(), "a\r\nb\r\nc");
        assert_eq!(buffer.eol(), "\r\n");
    }
}
