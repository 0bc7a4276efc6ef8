//! Background sync for pending report submissions.
//!
//! This crate replays the pending store against the report endpoint:
//! - `SyncCoordinator` - one sequential, best-effort pass over the store
//! - `SyncRuntime` - background task that runs a pass per trigger
//! - `ConnectivityMonitor` - online/offline flag that triggers a sync when
//!   connectivity returns
//! - `Submitter` - sends a payload now, or queues it and requests a sync
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use report_persistence::PendingStore;
//! use report_sync::{HttpDelivery, SyncConfig, SyncCoordinator, SyncRuntime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SyncConfig::new("https://reports.example/api")?;
//!     let store = Arc::new(PendingStore::new("/var/lib/report-app/pending"));
//!     let delivery = Arc::new(HttpDelivery::new(&config)?);
//!
//!     let coordinator = SyncCoordinator::new(config, store, delivery);
//!     let mut runtime = SyncRuntime::new(coordinator);
//!     let trigger = runtime.trigger();
//!     runtime.start()?;
//!
//!     // Connectivity came back
//!     trigger.request();
//!
//!     tokio::signal::ctrl_c().await?;
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Delivery semantics
//!
//! Entries are delivered one at a time, oldest first. A 2xx answer removes
//! the entry; anything else leaves it queued and the pass moves on, so
//! every entry gets exactly one attempt per pass. Delivery is at-least-once.

pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod delivery;
pub mod error;
pub mod event;
pub mod runtime;
pub mod submit;

#[cfg(test)]
mod testing;

pub use config::{SyncConfig, DEFAULT_STALL_THRESHOLD, SYNC_TAG};
pub use connectivity::ConnectivityMonitor;
pub use coordinator::{SyncCoordinator, SyncReport};
pub use delivery::{Delivery, HttpDelivery};
pub use error::{Result, SyncError};
pub use event::SyncEvent;
pub use runtime::{SyncRuntime, SyncTrigger};
pub use submit::{SubmitOutcome, Submitter};
