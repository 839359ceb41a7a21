//! Error types for the inference server
//!
//! Startup failures (bad dataset, bad configuration, socket setup) surface as
//! `ServeError` and abort the process. Per-connection I/O failures use the same
//! type but only end the connection that produced them.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ServeError>;

/// Errors produced while loading data, building the model or serving clients.
///
/// Malformed request payloads are not represented here: the protocol decoder
/// coerces them to batch index 0 instead of rejecting them.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The dataset header carried an unexpected magic number.
    #[error(
        "invalid header read from image file {}: {found:#010X} not {expected:#010X}",
        .path.display()
    )]
    Format {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    /// File or socket I/O failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Configuration was rejected during validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Model parameters did not match the declared shape.
    #[error("{what} has {actual} values, expected {expected}")]
    Dimension {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl ServeError {
    /// Wrap an I/O error with a short description of what was being attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        ServeError::Io {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_message() {
        let err = ServeError::Format {
            path: PathBuf::from("data/images"),
            found: 0x0000_0801,
            expected: 0x0000_0803,
        };
        assert_eq!(
            err.to_string(),
            "invalid header read from image file data/images: 0x00000801 not 0x00000803"
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err = ServeError::io(
            "Could not open file",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().starts_with("Could not open file"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
