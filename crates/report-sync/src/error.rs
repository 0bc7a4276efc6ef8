//! Error types for the sync crate.

use report_persistence::PersistenceError;
use thiserror::Error;

/// Errors that can occur while delivering or syncing submissions.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The endpoint could not be reached or did not answer 2xx.
    ///
    /// Transient: the submission stays queued for the next pass.
    #[error("delivery failed{}: {reason}", status.map(|s| format!(" (status {})", s)).unwrap_or_default())]
    DeliveryFailure {
        status: Option<u16>,
        reason: String,
    },

    /// Pending store error.
    #[error("storage error: {0}")]
    Storage(#[from] PersistenceError),

    /// Endpoint URL could not be built.
    #[error("invalid endpoint {url}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// HTTP client could not be built.
    #[error("http client error: {0}")]
    Client(String),

    /// Runtime not started.
    #[error("sync runtime not started")]
    NotStarted,

    /// Runtime already started.
    #[error("sync runtime already started")]
    AlreadyStarted,

    /// Shutdown error.
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

impl SyncError {
    /// Returns true for transient delivery failures.
    pub fn is_delivery_failure(&self) -> bool {
        matches!(self, SyncError::DeliveryFailure { .. })
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
