/*!
 * Error types for the transmem application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when working with translation backends
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl ProviderError {
    /// Status code reported to callers of the translation contract.
    ///
    /// Transport-level failures have no HTTP status and report `0`.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::ApiError { status_code, .. } => i32::from(*status_code),
            _ => 0,
        }
    }
}

/// Errors that can occur while reading or writing record tables and memory files
#[derive(Error, Debug)]
pub enum RecordError {
    /// The file could not be read or written
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file exists but its content is malformed
    #[error("Failed to parse {path:?}: {message}")]
    Parse {
        /// Offending path
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Writing a structured document failed
    #[error("Failed to serialize {path:?}: {message}")]
    Serialize {
        /// Destination path
        path: PathBuf,
        /// What went wrong
        message: String,
    },
}

impl RecordError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse { path: path.into(), message: message.to_string() }
    }
}

/// Fatal application errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid or incomplete configuration; fatal before any network call
    #[error("Configuration error: {0}")]
    Config(String),
}
