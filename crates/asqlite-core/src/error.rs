// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the asqlite bridge.

use thiserror::Error;

/// Result alias used throughout the asqlite crates.
pub type Result<T, E = AsqliteError> = std::result::Result<T, E>;

/// The error type returned by every connection and cursor operation.
#[derive(Debug, Error)]
pub enum AsqliteError {
    /// The underlying SQLite call failed (syntax, constraint, I/O, interrupt).
    #[error("resource error: {source}")]
    Resource {
        #[from]
        source: rusqlite::Error,
    },

    /// The connection was closed before the operation was submitted.
    #[error("connection is closed")]
    ClosedConnection,

    /// The API was used in a way the bridge does not allow.
    #[error("usage error: {0}")]
    Usage(String),

    /// Connection settings could not be applied.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors (worker panic, lost reply channel).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AsqliteError {
    /// Create a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns `true` if this error reports a closed connection.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ClosedConnection)
    }

    /// The SQLite primary result code, when the failure came from SQLite itself.
    pub fn sqlite_code(&self) -> Option<rusqlite::ErrorCode> {
        match self {
            Self::Resource { source } => source.sqlite_error_code(),
            _ => None,
        }
    }
}
