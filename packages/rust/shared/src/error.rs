//! Error types for Sietsemap.
//!
//! Library crates use [`SietsemapError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Sietsemap operations.
#[derive(Debug, thiserror::Error)]
pub enum SietsemapError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching the feed.
    #[error("network error: {0}")]
    Network(String),

    /// Feed XML or HTML parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Geocoding service error (transport, status, or response decoding).
    #[error("geocode error: {0}")]
    Geocode(String),

    /// Restaurant cache read/write error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A git command failed.
    #[error("git error: {command}: {stderr}")]
    Git { command: String, stderr: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SietsemapError>;

impl SietsemapError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a git error for a failed command.
    pub fn git(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::Git {
            command: command.into(),
            stderr: stderr.into(),
        }
    }
}
