//! Report App CLI library.
//!
//! Operator commands over the offline core: validate and submit report
//! files, inspect the pending queue, run sync passes, manage the offline
//! cache, and run the `watch` daemon.

pub mod cli;
pub mod commands;
pub mod health;
