//! vi-binder: a vi/vim key-binding engine that drives an abstract text buffer.
//!
//! The host supplies a [`host::Buffer`] and, optionally, a finder, clipboard, status
//! bar and macro recorder. A [`controller::Session`] takes keystrokes and `:` lines and
//! turns them into edits, motions and [`controller::HostRequest`]s.

pub mod config;
pub mod controller;
pub mod document_model;
pub mod error;
pub mod host;
pub mod keys;

pub use controller::{CommandHandler, HostRequest, Mode, Session, SessionBuilder};
pub use error::{EngineError, EngineResult, HostError};
