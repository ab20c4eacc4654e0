//! Error types for mdpress.
//!
//! Library crates use [`MdPressError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all mdpress operations.
#[derive(Debug, thiserror::Error)]
pub enum MdPressError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input parsing error (heading lists, option values, etc.).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A request that cannot be carried out as given (e.g. a non-PDF output path).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The paginating renderer failed or no backend was available.
    #[error("render error: {0}")]
    Render(String),

    /// Reading or mutating the rendered PDF failed.
    #[error("pdf error: {0}")]
    Pdf(String),

    /// The build was cancelled cooperatively.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MdPressError>;

impl MdPressError {
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

    /// Whether this error is a cooperative cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = MdPressError::config("unknown paper format");
        assert_eq!(err.to_string(), "config error: unknown paper format");

        let err = MdPressError::Render("no usable rendering backend found".into());
        assert!(err.to_string().contains("no usable rendering backend"));
    }

    #[test]
    fn validation_helper_builds_struct_variant() {
        let err = MdPressError::validation("output 'a.html' must end in .pdf");
        assert!(matches!(&err, MdPressError::Validation { message } if message.contains("a.html")));
        assert_eq!(err.to_string(), "validation error: output 'a.html' must end in .pdf");
    }

    #[test]
    fn cancellation_is_distinguishable() {
        assert!(MdPressError::Cancelled.is_cancelled());
        assert!(!MdPressError::Pdf("broken xref".into()).is_cancelled());
    }
}
