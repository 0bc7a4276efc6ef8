//! Error types for the offline cache.

use report_persistence::PersistenceError;
use thiserror::Error;

/// Errors that can occur in the offline cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A precache asset could not be fetched; the install was aborted and
    /// the previously active cache stays in service.
    #[error("install of {cache} failed on {url}: {reason}")]
    InstallFailure {
        cache: String,
        url: String,
        reason: String,
    },

    /// Network request failed.
    #[error("fetch of {url} failed: {reason}")]
    Network { url: String, reason: String },

    /// A URL could not be resolved against the cache scope.
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Activation requested for a version that was never installed.
    #[error("cache not installed: {0}")]
    NotInstalled(String),

    /// Underlying storage failed.
    #[error("cache storage error: {0}")]
    Storage(#[from] PersistenceError),

    /// Lock poisoned (thread panicked while holding lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
