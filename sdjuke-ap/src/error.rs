//! Error types for sdjuke-ap
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Inside the playback loop every error is converted into a per-track or
//! per-entry "skip and continue" decision; only bootstrap code returns these
//! to `main`.

use thiserror::Error;

/// Main error type for sdjuke-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<sdjuke_common::Error> for Error {
    fn from(err: sdjuke_common::Error) -> Self {
        match err {
            sdjuke_common::Error::Io(e) => Error::Io(e),
            other => Error::Config(other.to_string()),
        }
    }
}

/// Convenience Result type using sdjuke-ap Error
pub type Result<T> = std::result::Result<T, Error>;
