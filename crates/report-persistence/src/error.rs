//! Error types for persistence operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during persistence operations.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Durable storage cannot be opened or written (quota, permissions).
    ///
    /// Enqueue reports this instead of dropping the payload; callers must
    /// surface it to the user.
    #[error("storage unavailable at {path}: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read from file system.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write to file system.
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize or parse JSON.
    #[error("failed to serialize: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Lock poisoned (thread panicked while holding lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl PersistenceError {
    /// Reclassifies an I/O read or write failure as storage being unavailable.
    pub fn into_unavailable(self) -> Self {
        match self {
            PersistenceError::WriteError { path, source }
            | PersistenceError::ReadError { path, source } => {
                PersistenceError::StorageUnavailable { path, source }
            }
            other => other,
        }
    }

    /// Returns true if this error means durable storage cannot be used.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, PersistenceError::StorageUnavailable { .. })
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
