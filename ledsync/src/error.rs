//! Common error types for ledsync.
//!
//! This module provides a centralized Error enum using thiserror,
//! with conversions from underlying error types used throughout the crate.

use thiserror::Error;

use crate::validate::ValidationError;

/// Main error type for ledsync operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors while reading or replacing the state file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rejected user input; the message is shown to the caller verbatim
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The revision counter cannot be bumped any further
    #[error("Revision counter exhausted at {0}")]
    RevisionExhausted(u64),

    /// A blocking task died before producing a result
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// API errors reported by a remote server
    #[error("API error: {0}")]
    Api(String),
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        // Dropping the returned temp file removes it from disk.
        Error::Io(err.error)
    }
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
