//! State directory layout for the report app.
//!
//! # Storage Structure
//!
//! All local data is stored under `~/.report-app/`:
//!
//! ```text
//! ~/.report-app/
//! ├── pending/      # Pending store (pending_submissions/, sequence.json)
//! ├── cache/        # Offline asset caches, one directory per version
//! └── config/       # .env.local with API URL and key
//! ```
//!
//! # Environment Variables
//!
//! - `REPORT_STATE_DIR`: Override the base state directory (`~` is expanded)

use std::path::PathBuf;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "REPORT_STATE_DIR";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".report-app";

pub(crate) const PENDING_SUBDIR: &str = "pending";
pub(crate) const CACHE_SUBDIR: &str = "cache";
const CONFIG_SUBDIR: &str = "config";

/// Resolves the state directory using `lookup` for environment access.
///
/// 1. `REPORT_STATE_DIR` if set and non-empty, with `~` expanded
/// 2. `~/.report-app` if the home directory is known
/// 3. `.report-app` in the current directory
pub fn resolve_state_dir<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(STATE_DIR_ENV).filter(|value| !value.trim().is_empty()) {
        Some(value) => PathBuf::from(shellexpand::tilde(value.trim()).into_owned()),
        None => dirs::home_dir()
            .map(|home| home.join(DEFAULT_STATE_DIR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
    }
}

/// Get the state directory from the process environment.
pub fn state_dir() -> PathBuf {
    resolve_state_dir(|key| std::env::var(key).ok())
}

/// Get the pending store directory.
pub fn pending_dir() -> PathBuf {
    state_dir().join(PENDING_SUBDIR)
}

/// Get the offline cache directory.
pub fn cache_dir() -> PathBuf {
    state_dir().join(CACHE_SUBDIR)
}

/// Get the config directory.
pub fn config_dir() -> PathBuf {
    state_dir().join(CONFIG_SUBDIR)
}

/// Get the .env.local file path.
///
/// Environment file for the API URL and key.
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

/// Ensure the state directory and all subdirectories exist.
///
/// # Errors
/// Returns an error if any directory cannot be created.
pub fn ensure_all_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(pending_dir())?;
    std::fs::create_dir_all(cache_dir())?;
    std::fs::create_dir_all(config_dir())?;
    Ok(())
}
