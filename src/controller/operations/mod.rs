//! Handlers behind the command table's special entries.
//!
//! Every handler has the [`Handler`](super::command_table::Handler) signature. Handlers
//! flagged `SPECIAL_REPEAT` receive the raw count (0 when none was typed); the rest are
//! looped by the dispatcher and always see 1.

pub mod edits;
pub mod find_char;
pub mod insert;
pub mod lines;
pub mod modes;
pub mod motions;
pub mod operators;
pub mod paste;
pub mod repeat;
pub mod search;
