//! Background sync runtime.

use std::sync::Arc;

use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coordinator::SyncCoordinator;
use crate::error::{Result, SyncError};
use crate::event::SyncEvent;

/// Handle used to request a sync pass.
///
/// Requests made while a pass is running collapse into a single follow-up
/// pass.
#[derive(Debug, Clone)]
pub struct SyncTrigger {
    tag: Arc<str>,
    notify: Arc<Notify>,
}

impl SyncTrigger {
    /// The tag this trigger answers to.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Requests a pass.
    pub fn request(&self) {
        self.notify.notify_one();
    }

    /// Requests a pass if `tag` matches; other tags are ignored.
    pub fn fire(&self, tag: &str) -> bool {
        if tag != &*self.tag {
            debug!(tag, "ignoring sync trigger with unknown tag");
            return false;
        }
        self.request();
        true
    }
}

/// Runs a sync pass every time a trigger fires.
pub struct SyncRuntime {
    coordinator: Arc<SyncCoordinator>,
    notify: Arc<Notify>,
    worker_handle: Option<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    started: bool,
}

impl SyncRuntime {
    pub fn new(coordinator: SyncCoordinator) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            coordinator: Arc::new(coordinator),
            notify: Arc::new(Notify::new()),
            worker_handle: None,
            shutdown_tx,
            shutdown_rx,
            started: false,
        }
    }

    /// Returns a trigger handle for this runtime.
    pub fn trigger(&self) -> SyncTrigger {
        SyncTrigger {
            tag: Arc::from(self.coordinator.config().tag.as_str()),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Subscribe to sync events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.coordinator.subscribe()
    }

    pub fn coordinator(&self) -> Arc<SyncCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Requests a pass if the store holds anything, including entries
    /// queued by other processes sharing it. Returns whether one was
    /// requested.
    pub fn request_if_pending(&self) -> Result<bool> {
        if self.coordinator.store().is_empty()? {
            return Ok(false);
        }
        debug!("pending backlog found; requesting sync");
        self.notify.notify_one();
        Ok(true)
    }

    /// Starts the worker task.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(SyncError::AlreadyStarted);
        }

        info!(tag = %self.coordinator.config().tag, "starting sync runtime");

        let coordinator = Arc::clone(&self.coordinator);
        let notify = Arc::clone(&self.notify);
        let shutdown_rx = self.shutdown_rx.clone();

        let handle = tokio::spawn(async move {
            run_worker(coordinator, notify, shutdown_rx).await;
        });

        self.worker_handle = Some(handle);
        self.started = true;

        Ok(())
    }

    /// Stops the worker. A pass already in flight runs to completion.
    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.started {
            return Err(SyncError::NotStarted);
        }

        info!("shutting down sync runtime");

        self.shutdown_tx.send(true).map_err(|e| {
            SyncError::Shutdown(format!("failed to send shutdown signal: {}", e))
        })?;

        if let Some(handle) = self.worker_handle.take() {
            debug!("waiting for sync worker to stop");
            handle
                .await
                .map_err(|e| SyncError::Shutdown(format!("sync worker panicked: {}", e)))?;
        }

        self.started = false;
        info!("sync runtime stopped");

        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Drop for SyncRuntime {
    fn drop(&mut self) {
        if self.started {
            let _ = self.shutdown_tx.send(true);
        }
    }
}

async fn run_worker(
    coordinator: Arc<SyncCoordinator>,
    notify: Arc<Notify>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    debug!("sync worker started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            _ = notify.notified() => {
                if let Err(e) = coordinator.run_once().await {
                    warn!(error = %e, "sync pass failed");
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    debug!("sync worker stopped");
}
