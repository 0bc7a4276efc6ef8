//! Single sync pass over the pending store.

use std::sync::Arc;

use report_models::SubmissionId;
use report_persistence::PendingStore;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::delivery::Delivery;
use crate::error::Result;
use crate::event::SyncEvent;

/// Outcome of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries attempted.
    pub attempted: usize,
    /// Entries accepted and removed.
    pub delivered: Vec<SubmissionId>,
    /// Entries that failed and stay queued.
    pub failed: Vec<SubmissionId>,
    /// Failed entries at or past the stall threshold.
    pub stalled: Vec<SubmissionId>,
}

impl SyncReport {
    /// Returns true if every attempted entry was delivered.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Replays the pending store against a [`Delivery`].
pub struct SyncCoordinator {
    config: SyncConfig,
    store: Arc<PendingStore>,
    delivery: Arc<dyn Delivery>,
    event_tx: broadcast::Sender<SyncEvent>,
}

impl SyncCoordinator {
    pub fn new(config: SyncConfig, store: Arc<PendingStore>, delivery: Arc<dyn Delivery>) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            store,
            delivery,
            event_tx,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<PendingStore> {
        Arc::clone(&self.store)
    }

    /// Subscribe to sync events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Attempts every pending entry once, oldest first.
    ///
    /// A failed entry is logged, counted and left in place; the pass moves
    /// on to the next one. Only a store that cannot be listed fails the
    /// pass as a whole.
    pub async fn run_once(&self) -> Result<SyncReport> {
        let pending = self.store.list_all()?;
        let mut report = SyncReport::default();

        if pending.is_empty() {
            debug!("nothing to sync");
        } else {
            info!(pending = pending.len(), "sync pass started");
        }
        self.emit(SyncEvent::PassStarted {
            pending: pending.len(),
        });

        for record in pending {
            report.attempted += 1;
            let id = record.id;

            match self.delivery.deliver(&record.data).await {
                Ok(_) => {
                    // Still counts as delivered; a leftover file is sent again next pass
                    if let Err(e) = self.store.remove(id) {
                        warn!(id = %id, error = %e, "delivered submission could not be removed");
                    }
                    debug!(id = %id, "submission synced");
                    report.delivered.push(id);
                    self.emit(SyncEvent::Delivered { id });
                }
                Err(e) => {
                    let attempts = match self.store.record_failure(id) {
                        Ok(Some(attempts)) => attempts,
                        Ok(None) => record.attempts.saturating_add(1),
                        Err(store_err) => {
                            warn!(id = %id, error = %store_err, "failed to record delivery attempt");
                            record.attempts.saturating_add(1)
                        }
                    };
                    warn!(id = %id, attempts, error = %e, "submission sync failed");
                    report.failed.push(id);
                    self.emit(SyncEvent::DeliveryFailed {
                        id,
                        error: e.to_string(),
                        attempts,
                    });

                    let threshold = self.config.stall_threshold;
                    if threshold > 0 && attempts >= threshold {
                        warn!(id = %id, attempts, "submission stalled; keeping it queued");
                        report.stalled.push(id);
                        self.emit(SyncEvent::Stalled { id, attempts });
                    }
                }
            }
        }

        if report.attempted > 0 {
            info!(
                attempted = report.attempted,
                delivered = report.delivered.len(),
                failed = report.failed.len(),
                "sync pass completed"
            );
        }
        self.emit(SyncEvent::PassCompleted(report.clone()));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDelivery;
    use serde_json::json;
    use tempfile::tempdir;

    fn coordinator(
        store: &Arc<PendingStore>,
        delivery: &Arc<MockDelivery>,
    ) -> SyncCoordinator {
        let config = SyncConfig::new("http://127.0.0.1:9/").unwrap();
        SyncCoordinator::new(config, Arc::clone(store), delivery.clone())
    }

    #[tokio::test]
    async fn test_enqueued_entry_is_delivered_and_removed() {
        let dir = tempdir().unwrap();
        let store = Arc::new(PendingStore::new(dir.path()));
        let delivery = Arc::new(MockDelivery::new());
        let payload = json!({"department_number": "12", "items": []});

        let id = store.enqueue(payload.clone()).unwrap();
        let report = coordinator(&store, &delivery).run_once().await.unwrap();

        assert_eq!(report.delivered, vec![id]);
        assert!(report.is_clean());
        assert_eq!(delivery.delivered(), vec![payload]);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_only_failed_entry() {
        let dir = tempdir().unwrap();
        let store = Arc::new(PendingStore::new(dir.path()));
        let delivery = Arc::new(MockDelivery::new());

        let first = store.enqueue(json!({"n": 1})).unwrap();
        let second = store.enqueue(json!({"n": 2, "fail": true})).unwrap();
        let third = store.enqueue(json!({"n": 3})).unwrap();

        let report = coordinator(&store, &delivery).run_once().await.unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, vec![first, third]);
        assert_eq!(report.failed, vec![second]);
        assert!(report.stalled.is_empty());

        let remaining = store.list_all().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second);
        assert_eq!(remaining[0].attempts, 1);
        assert_eq!(remaining[0].data, json!({"n": 2, "fail": true}));
    }

    #[tokio::test]
    async fn test_empty_store_is_a_clean_pass() {
        let dir = tempdir().unwrap();
        let store = Arc::new(PendingStore::new(dir.path()));
        let delivery = Arc::new(MockDelivery::new());

        let report = coordinator(&store, &delivery).run_once().await.unwrap();
        assert_eq!(report, SyncReport::default());
        assert_eq!(delivery.calls(), 0);
    }

    #[tokio::test]
    async fn test_stalled_entries_are_reported_but_kept() {
        let dir = tempdir().unwrap();
        let store = Arc::new(PendingStore::new(dir.path()));
        let delivery = Arc::new(MockDelivery::failing());
        let config = SyncConfig::new("http://127.0.0.1:9/")
            .unwrap()
            .with_stall_threshold(2);
        let coordinator = SyncCoordinator::new(config, Arc::clone(&store), delivery.clone());

        let id = store.enqueue(json!({"n": 1})).unwrap();

        let report = coordinator.run_once().await.unwrap();
        assert_eq!(report.failed, vec![id]);
        assert!(report.stalled.is_empty());

        let report = coordinator.run_once().await.unwrap();
        assert_eq!(report.stalled, vec![id]);

        let report = coordinator.run_once().await.unwrap();
        assert_eq!(report.stalled, vec![id]);
        assert_eq!(store.get(id).unwrap().unwrap().attempts, 3);
    }

    #[tokio::test]
    async fn test_events_follow_the_pass() {
        let dir = tempdir().unwrap();
        let store = Arc::new(PendingStore::new(dir.path()));
        let delivery = Arc::new(MockDelivery::new());
        let coordinator = coordinator(&store, &delivery);
        let mut events = coordinator.subscribe();

        let ok = store.enqueue(json!({"n": 1})).unwrap();
        let bad = store.enqueue(json!({"fail": true})).unwrap();
        coordinator.run_once().await.unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::PassStarted { pending: 2 }
        ));
        assert!(matches!(events.recv().await.unwrap(), SyncEvent::Delivered { id } if id == ok));
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::DeliveryFailed { id, attempts: 1, .. } if id == bad
        ));
        match events.recv().await.unwrap() {
            SyncEvent::PassCompleted(report) => assert_eq!(report.attempted, 2),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
