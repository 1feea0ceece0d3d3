use crate::config::FileFormat;
use crate::error::HostError;

/// How the host renders the selection between anchor and caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Stream,
    Lines,
    Rectangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaretStyle {
    #[default]
    Block,
    Line,
}

/// Commands the engine delegates to the buffer.
///
/// A host may implement any of these natively through [`Buffer::execute_native`];
/// everything except undo/redo has a fallback built from the position primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOp {
    WordLeft,
    WordRight,
    WordEnd,
    BigWordLeft,
    BigWordRight,
    BigWordEnd,
    Home,
    VcHome,
    DocumentEnd,
    ParaUp,
    ParaDown,
    PageUp,
    PageDown,
    HalfPageUp,
    HalfPageDown,
    MatchBrace,
    Undo,
    Redo,
}

impl BufferOp {
    pub fn name(self) -> &'static str {
        match self {
            BufferOp::WordLeft => "word_left",
            BufferOp::WordRight => "word_right",
            BufferOp::WordEnd => "word_end",
            BufferOp::BigWordLeft => "big_word_left",
            BufferOp::BigWordRight => "big_word_right",
            BufferOp::BigWordEnd => "big_word_end",
            BufferOp::Home => "home",
            BufferOp::VcHome => "vc_home",
            BufferOp::DocumentEnd => "document_end",
            BufferOp::ParaUp => "para_up",
            BufferOp::ParaDown => "para_down",
            BufferOp::PageUp => "page_up",
            BufferOp::PageDown => "page_down",
            BufferOp::HalfPageUp => "half_page_up",
            BufferOp::HalfPageDown => "half_page_down",
            BufferOp::MatchBrace => "match_brace",
            BufferOp::Undo => "undo",
            BufferOp::Redo => "redo",
        }
    }
}

/// The text surface the engine edits.
///
/// Positions are opaque offsets into the document (the reference [`TextBuffer`] uses byte
/// offsets). Lines are zero-indexed. A line's end position is the offset of its
/// terminator, or the document length for the final line.
///
/// [`TextBuffer`]: crate::document_model::TextBuffer
pub trait Buffer {
    fn text_length(&self) -> usize;

    fn current_pos(&self) -> usize;
    fn set_current_pos(&mut self, pos: usize);
    fn anchor(&self) -> usize;
    fn set_anchor(&mut self, pos: usize);

    fn set_selection(&mut self, anchor: usize, current: usize) {
        self.set_anchor(anchor);
        self.set_current_pos(current);
    }

    /// Moves the caret and collapses the selection onto it.
    fn goto_pos(&mut self, pos: usize) {
        self.set_selection(pos, pos);
    }

    fn line_count(&self) -> usize;
    fn line_from_position(&self, pos: usize) -> usize;
    fn position_from_line(&self, line: usize) -> usize;
    fn line_end_position(&self, line: usize) -> usize;

    /// Previous character boundary; a CRLF pair counts as one step.
    fn position_before(&self, pos: usize) -> usize;
    fn position_after(&self, pos: usize) -> usize;

    fn char_at(&self, pos: usize) -> Option<char>;
    fn text_range(&self, start: usize, end: usize) -> String;

    fn insert_text(&mut self, pos: usize, text: &str) -> Result<(), HostError>;
    fn delete_range(&mut self, start: usize, end: usize) -> Result<(), HostError>;

    fn replace_range(&mut self, start: usize, end: usize, text: &str) -> Result<(), HostError> {
        self.delete_range(start, end)?;
        self.insert_text(start, text)
    }

    /// Undo groups nest; only the outermost `end_undo` closes the group.
    fn begin_undo(&mut self);
    fn end_undo(&mut self);

    fn selection_mode(&self) -> SelectionMode;
    fn set_selection_mode(&mut self, mode: SelectionMode);

    /// Display column of `pos`, with tabs expanded.
    fn column(&self, pos: usize) -> usize;
    /// Position on `line` closest to display `column`, never past the line end.
    fn find_column(&self, line: usize, column: usize) -> usize;

    /// The terminator new lines are written with.
    fn eol(&self) -> &str;

    fn set_file_format(&mut self, _format: FileFormat) {}
    fn set_tab_width(&mut self, _width: usize) {}
    fn scroll_to_caret(&mut self) {}
    fn set_caret_style(&mut self, _style: CaretStyle) {}
    fn set_overtype(&mut self, _overtype: bool) {}
    fn cancel_autocomplete(&mut self) {}

    fn lines_on_screen(&self) -> usize {
        24
    }

    /// Path of the document, if it has one. Backs the `%` register.
    fn file_path(&self) -> Option<String> {
        None
    }

    /// Runs `op` natively. `Ok(false)` means the engine should use its own fallback.
    fn execute_native(&mut self, _op: BufferOp) -> Result<bool, HostError> {
        Ok(false)
    }

    fn line_text(&self, line: usize) -> String {
        self.text_range(self.position_from_line(line), self.line_end_position(line))
    }

    fn line_length(&self, line: usize) -> usize {
        self.line_end_position(line) - self.position_from_line(line)
    }

    fn is_line_empty(&self, line: usize) -> bool {
        self.line_length(line) == 0
    }
}

/// Keeps one undo group open for as long as it lives.
///
/// The group closes when the guard drops, so an early `?` return still ends it.
pub struct UndoGroup<'a> {
    buffer: &'a mut dyn Buffer,
    active: bool,
}

impl<'a> UndoGroup<'a> {
    pub fn begin(buffer: &'a mut dyn Buffer, active: bool) -> Self {
        if active {
            buffer.begin_undo();
        }
        Self { buffer, active }
    }
}

impl<'a> std::ops::Deref for UndoGroup<'a> {
    type Target = dyn Buffer + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.buffer
    }
}

impl<'a> std::ops::DerefMut for UndoGroup<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.buffer
    }
}

impl Drop for UndoGroup<'_> {
    fn drop(&mut self) {
        if self.active {
            self.buffer.end_undo();
        }
    }
}
