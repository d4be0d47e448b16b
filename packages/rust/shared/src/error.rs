//! Error types for coursegen.
//!
//! Library crates use [`CourseGenError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all coursegen operations.
#[derive(Debug, thiserror::Error)]
pub enum CourseGenError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport failure or non-success HTTP status from the catalog API.
    #[error("network error: {0}")]
    Network(String),

    /// The remote payload did not have the expected shape.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unexpected catalog contents, bad arguments, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A worker task panicked or was cancelled before reporting back.
    #[error("task error: {0}")]
    Task(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CourseGenError>;

impl CourseGenError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CourseGenError::config("unknown term");
        assert_eq!(err.to_string(), "config error: unknown term");

        let err = CourseGenError::decode("expected array of schools");
        assert!(err.to_string().starts_with("decode error:"));

        let err = CourseGenError::Network("https://example.com: HTTP 503".into());
        assert!(err.to_string().contains("HTTP 503"));
    }
}
