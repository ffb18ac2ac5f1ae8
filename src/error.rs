//! Centralized error types for mailnotes.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailnotes library.
#[derive(Error, Debug)]
pub enum NoteError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A property could not be read from the host mail record.
    #[error("Mail property unavailable: {0}")]
    PropertyUnavailable(&'static str),

    /// The message file could not be parsed as an RFC 5322 message.
    #[error("Could not parse message file: {0}")]
    InvalidMessage(PathBuf),

    /// A string is not a valid conversation id.
    #[error("Invalid conversation id '{0}': expected 16 hex characters")]
    InvalidConversationId(String),

    /// Every candidate name for a new note was already taken.
    #[error("Could not find a free file name for '{path}' after {attempts} attempts")]
    WriteConflict { path: PathBuf, attempts: usize },

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// An invalid path was provided.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for `Result<T, NoteError>`.
pub type Result<T> = std::result::Result<T, NoteError>;

impl NoteError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `NoteError`
/// when no path context is available (rare, prefer `NoteError::io`).
impl From<std::io::Error> for NoteError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
