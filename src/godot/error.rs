//! Error types for Godot project checks.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for check operations.
pub type CheckResult<T> = Result<T, CheckError>;

/// Errors that can occur while running project checks.
///
/// Argument and path validation errors propagate up to the dispatch
/// boundary, where they become `{success: false, error: ...}` payloads.
/// External tool failures (nonzero exit, error output) are not errors at
/// this level; handlers fold them into the result object instead.
#[derive(Debug, Error)]
pub enum CheckError {
    /// A request argument is missing, empty, relative or of the wrong type.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of what's wrong.
        message: String,
    },

    /// A validated path does not exist.
    #[error("path does not exist: {path}")]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// An external tool could not be launched at all.
    #[error("failed to launch '{program}'")]
    Spawn {
        /// The binary that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An external tool exceeded its time bound and was killed.
    #[error("command timed out after {seconds}s")]
    Timeout {
        /// The bound that was exceeded.
        seconds: u64,
    },

    /// Reading a file (e.g. an engine log) failed.
    #[error("failed to read file: {path}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl CheckError {
    /// Convenience constructor for [`CheckError::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
