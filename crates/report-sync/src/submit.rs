//! Online-first submission with queue fallback.

use std::sync::Arc;

use report_models::SubmissionId;
use report_persistence::PendingStore;
use serde_json::Value;
use tracing::{info, warn};

use crate::connectivity::ConnectivityMonitor;
use crate::delivery::Delivery;
use crate::error::Result;
use crate::runtime::SyncTrigger;

/// What happened to a submitted payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The endpoint accepted it; carries the decoded response body.
    Delivered(Value),
    /// It was queued for background sync.
    Queued(SubmissionId),
}

impl SubmitOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, SubmitOutcome::Queued(_))
    }
}

/// Sends payloads directly when online and queues them otherwise.
pub struct Submitter {
    store: Arc<PendingStore>,
    delivery: Arc<dyn Delivery>,
    connectivity: Arc<ConnectivityMonitor>,
    trigger: Option<SyncTrigger>,
}

impl Submitter {
    pub fn new(
        store: Arc<PendingStore>,
        delivery: Arc<dyn Delivery>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            store,
            delivery,
            connectivity,
            trigger: None,
        }
    }

    /// Requests a sync through `trigger` whenever something is queued.
    pub fn with_trigger(mut self, trigger: SyncTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Delivers `payload`, or queues it when offline or when delivery
    /// fails.
    ///
    /// # Errors
    /// Fails only if the payload could not be queued, in which case it was
    /// not retained anywhere.
    pub async fn submit(&self, payload: Value) -> Result<SubmitOutcome> {
        if self.connectivity.is_online() {
            match self.delivery.deliver(&payload).await {
                Ok(response) => {
                    info!("report delivered");
                    return Ok(SubmitOutcome::Delivered(response));
                }
                Err(e) => {
                    warn!(error = %e, "direct delivery failed; queueing report");
                }
            }
        }

        let id = self.store.enqueue(payload)?;
        info!(id = %id, "report queued for background sync");
        if let Some(trigger) = &self.trigger {
            trigger.request();
        }
        Ok(SubmitOutcome::Queued(id))
    }
}
