//! Unified error types for sessiondb.
//!
//! Validation failures (configuration, identifiers, parameters) are fatal to
//! the calling operation and never retried. Datastore failures propagate
//! unchanged so the host application decides how to surface them.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for sessiondb operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Required connection or table parameters are missing or malformed.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A session identifier contains characters outside `[A-Za-z0-9_]`.
    #[error("invalid session identifier: {id:?}")]
    InvalidIdentifier { id: String },

    /// A lock or lifetime parameter is not a positive integer.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: String, message: String },

    /// The lock-wait timed out and the configured policy refuses to proceed.
    #[error("session {id} still locked after waiting {waited_secs}s")]
    LockTimeout { id: String, waited_secs: u64 },

    /// SQLite failures, passed through untranslated.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Failures from other datastore implementations.
    #[error("backend error: {message}")]
    Backend { message: String },

    /// I/O errors while reading or writing config files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },
}

/// A specialized Result type for sessiondb operations.
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid identifier error.
    pub fn invalid_identifier(id: impl Into<String>) -> Self {
        Self::InvalidIdentifier { id: id.into() }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a lock timeout error.
    pub fn lock_timeout(id: impl Into<String>, waited_secs: u64) -> Self {
        Self::LockTimeout {
            id: id.into(),
            waited_secs,
        }
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Whether the error was raised by input validation rather than by the
    /// datastore. Validation errors never reach the datastore.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidIdentifier { .. } | Self::InvalidParameter { .. }
        )
    }
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Exit codes for the sessiondb CLI.
pub mod exit_codes {
    /// The command completed.
    pub const SUCCESS: i32 = 0;

    /// The command failed at the datastore or I/O layer.
    pub const FAILURE: i32 = 1;

    /// The command was rejected by validation (config, id, parameter).
    pub const INVALID: i32 = 2;

    /// The session stayed locked past the timeout under the `fail` policy.
    pub const LOCKED: i32 = 3;
}

/// Map an error to the CLI exit code that reports it.
pub fn exit_code_for(err: &SessionError) -> i32 {
    match err {
        SessionError::LockTimeout { .. } => exit_codes::LOCKED,
        e if e.is_validation() => exit_codes::INVALID,
        _ => exit_codes::FAILURE,
    }
}
