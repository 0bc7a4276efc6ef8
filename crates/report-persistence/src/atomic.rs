//! Atomic file operations for crash-safe persistence.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{PersistenceError, Result};

/// Creates `dir` (and parents) if missing.
///
/// Failure here means the storage location itself is unusable, so it is
/// reported as [`PersistenceError::StorageUnavailable`].
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| PersistenceError::StorageUnavailable {
        path: dir.to_path_buf(),
        source,
    })
}

/// Writes `data` into a temp file next to `path` and syncs it to disk.
fn stage(path: &Path, data: &[u8]) -> Result<NamedTempFile> {
    let write_err = |source| PersistenceError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    // Same directory as the target, so the final rename never crosses filesystems
    let dir = path.parent().unwrap_or(Path::new("."));
    ensure_dir(dir)?;

    let mut temp_file = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp_file.write_all(data).map_err(write_err)?;
    temp_file.as_file().sync_all().map_err(write_err)?;
    Ok(temp_file)
}

/// Writes data to a file atomically, replacing any existing file.
///
/// The target is never observed in a partially written state, even if the
/// process crashes mid-write.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    stage(path, data)?
        .persist(path)
        .map_err(|e| PersistenceError::WriteError {
            path: path.to_path_buf(),
            source: e.error,
        })?;
    Ok(())
}

/// Writes data to a file atomically only if the file does not exist yet.
///
/// Returns `Ok(false)` when the target already exists; nothing is written
/// in that case.
pub fn atomic_create(path: &Path, data: &[u8]) -> Result<bool> {
    match stage(path, data)?.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(PersistenceError::WriteError {
            path: path.to_path_buf(),
            source: e.error,
        }),
    }
}

/// Writes JSON data to a file atomically.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &json)
}

/// Reads and deserializes JSON from a file.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read(path).map_err(|source| PersistenceError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_slice(&data)?)
}

/// Reads JSON from a file, returning None if the file doesn't exist.
pub fn read_json_optional<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PersistenceError::ReadError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Removes a file; a missing file is not an error.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(PersistenceError::WriteError {
            path: path.to_path_buf(),
            source,
        }),
    }
}
