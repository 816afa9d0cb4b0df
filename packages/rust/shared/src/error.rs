//! Error types for CourseLens.
//!
//! Library crates use [`CourseLensError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! "No data available" is deliberately NOT an error: the gateway maps
//! failed or empty upstream lookups to the [`Metric::NoData`] sentinel
//! before results reach the page, so these variants only travel between
//! internal layers.
//!
//! [`Metric::NoData`]: crate::types::Metric

use std::path::PathBuf;

/// Top-level error type for all CourseLens operations.
#[derive(Debug, thiserror::Error)]
pub enum CourseLensError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the data service.
    #[error("network error: {0}")]
    Network(String),

    /// Response body did not match the expected payload shape.
    #[error("payload error: {message}")]
    Payload { message: String },

    /// A structural marker expected on the catalog page was missing
    /// (class hook, id attribute, ancestor). The page layout changed.
    #[error("page contract violation: {message}")]
    DomContract { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CourseLensError>;

impl CourseLensError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a payload error from any displayable message.
    pub fn payload(msg: impl Into<String>) -> Self {
        Self::Payload {
            message: msg.into(),
        }
    }

    /// Create a page contract violation from any displayable message.
    pub fn dom_contract(msg: impl Into<String>) -> Self {
        Self::DomContract {
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
        let err = CourseLensError::config("missing gateway host");
        assert_eq!(err.to_string(), "config error: missing gateway host");

        let err = CourseLensError::dom_contract("no .course ancestor above section row");
        assert!(err.to_string().contains("page contract violation"));
        assert!(err.to_string().contains(".course ancestor"));
    }
}
