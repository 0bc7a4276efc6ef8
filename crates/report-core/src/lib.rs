//! Report Core - shared configuration for the report app.
//!
//! - **config**: state directory layout and environment lookups
//! - **settings**: [`AppConfig`], the runtime settings read from the
//!   environment

pub mod config;
pub mod error;
pub mod settings;

pub use config::{
    cache_dir, config_dir, ensure_all_dirs, env_file, pending_dir, resolve_state_dir, state_dir,
};
pub use error::{ConfigError, Result};
pub use settings::AppConfig;
