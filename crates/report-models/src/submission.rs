//! Pending submission records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::SubmissionId;

/// A report payload that has not yet been acknowledged by the remote
/// endpoint.
///
/// Records are created by the pending store when a submission cannot reach
/// the network and are deleted once delivery succeeds. Nothing else mutates
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSubmission {
    /// Store-assigned identifier.
    pub id: SubmissionId,

    /// Opaque payload, delivered verbatim.
    pub data: serde_json::Value,

    /// When the submission was queued.
    pub created_at: DateTime<Utc>,

    /// Failed delivery attempts so far.
    #[serde(default)]
    pub attempts: u32,
}

impl PendingSubmission {
    /// Creates a fresh record with no failed attempts.
    pub fn new(id: SubmissionId, data: serde_json::Value) -> Self {
        Self {
            id,
            data,
            created_at: Utc::now(),
            attempts: 0,
        }
    }

    /// Returns true once the record has failed at least `threshold` times.
    pub fn is_stalled(&self, threshold: u32) -> bool {
        threshold > 0 && self.attempts >= threshold
    }
}
