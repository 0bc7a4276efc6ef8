//! Persistence layer for the report mini app.
//!
//! This crate provides the durable pending-submission store. Every write
//! goes through a temp file that is renamed into place, so a crash never
//! leaves a half-written record behind.
//!
//! # Example
//!
//! ```no_run
//! use report_persistence::PendingStore;
//! use serde_json::json;
//!
//! let store = PendingStore::new("/home/user/.report-app/pending");
//!
//! let id = store.enqueue(json!({"ticket_number": "89112345678"})).unwrap();
//! for pending in store.list_all().unwrap() {
//!     println!("{} queued at {}", pending.id, pending.created_at);
//! }
//! store.remove(id).unwrap();
//! ```

pub mod atomic;
pub mod error;
pub mod pending_store;

pub use error::{PersistenceError, Result};
pub use pending_store::PendingStore;
