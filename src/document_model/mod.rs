/// Document model subsystem - Reference implementations of the host capabilities
///
/// `TextBuffer` and `RegexFinder` let the engine run headless; `RegisterStore` is the
/// engine's own register file.

pub mod clipboard;
pub mod finder;
pub mod movement;
pub mod registers;
pub mod text_buffer;
pub mod undo;

// Re-export main types for convenience
pub use clipboard::{MemoryClipboard, SystemClipboard, default_clipboard};
pub use finder::RegexFinder;
pub use registers::{PasteMode, RegisterStore};
pub use text_buffer::TextBuffer;
pub use undo::UndoStack;
