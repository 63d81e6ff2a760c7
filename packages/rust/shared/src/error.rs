//! Error types for contribsync.
//!
//! Library crates use [`SyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all sync operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure talking to the content source.
    #[error("network error: {0}")]
    Network(String),

    /// The content source answered with a non-success status.
    #[error("content source returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// A response or stored document could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A required page property was absent or empty.
    #[error("page {page_id} is missing required property `{property}`")]
    MissingProperty { page_id: String, property: String },

    /// A user id did not resolve to exactly one profile page.
    #[error("user `{user_id}` matched {matches} profile pages, expected exactly one")]
    ProfileLookup { user_id: String, matches: usize },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Metadata store error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Data validation error (bad arguments, malformed input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
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

    /// Report a required property that was absent on a page.
    pub fn missing_property(page_id: impl Into<String>, property: impl Into<String>) -> Self {
        Self::MissingProperty {
            page_id: page_id.into(),
            property: property.into(),
        }
    }
}
