/// Host capabilities - the narrow interfaces the engine drives
///
/// The engine never owns the text surface, search engine, clipboard or status bar;
/// it talks to them through these traits. `document_model` carries reference
/// implementations.

pub mod buffer;
pub mod finder;
pub mod status;

pub use buffer::{Buffer, BufferOp, CaretStyle, SelectionMode, UndoGroup};
pub use finder::{CaseSensitivity, FindMatch, FindOptions, Finder, PatternDialect};
pub use status::{MessageLog, StatusEntry, StatusMessage};

use crate::error::HostError;

pub trait Clipboard {
    fn get_text(&mut self) -> Result<String, HostError>;
    fn set_text(&mut self, text: &str) -> Result<(), HostError>;
}

/// Host-side macro recorder, paused while the engine replays repetitions.
pub trait MacroRecorder {
    fn suspend(&mut self);
    fn resume(&mut self);
}
