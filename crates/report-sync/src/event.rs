//! Sync events.

use report_models::SubmissionId;

use crate::coordinator::SyncReport;

/// Events emitted while syncing.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A pass started.
    PassStarted {
        /// Entries in the store at the start of the pass.
        pending: usize,
    },
    /// An entry was accepted by the endpoint and removed from the store.
    Delivered {
        /// Submission ID.
        id: SubmissionId,
    },
    /// An entry could not be delivered and stays queued.
    DeliveryFailed {
        /// Submission ID.
        id: SubmissionId,
        /// Error message.
        error: String,
        /// Failed attempts recorded so far.
        attempts: u32,
    },
    /// An entry reached the stall threshold. It stays queued.
    Stalled {
        /// Submission ID.
        id: SubmissionId,
        /// Failed attempts recorded so far.
        attempts: u32,
    },
    /// A pass finished.
    PassCompleted(SyncReport),
}

impl SyncEvent {
    /// Returns the submission ID associated with this event, if any.
    pub fn submission_id(&self) -> Option<SubmissionId> {
        match self {
            SyncEvent::Delivered { id }
            | SyncEvent::DeliveryFailed { id, .. }
            | SyncEvent::Stalled { id, .. } => Some(*id),
            SyncEvent::PassStarted { .. } | SyncEvent::PassCompleted(_) => None,
        }
    }

    /// Returns true if this is a failure event.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SyncEvent::DeliveryFailed { .. } | SyncEvent::Stalled { .. }
        )
    }
}
