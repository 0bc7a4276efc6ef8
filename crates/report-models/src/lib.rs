//! Core data models for the report mini app.
//!
//! This crate provides the fundamental data types shared by the offline
//! core: the report payload produced by the form, and the pending
//! submission record owned by the pending store.

pub mod ids;
pub mod report;
pub mod submission;

// Re-export main types
pub use ids::SubmissionId;
pub use report::{ReportItem, ReportPayload};
pub use submission::PendingSubmission;
