//! Named cache storage backends.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use report_persistence::atomic::{atomic_write, atomic_write_json, ensure_dir, read_json_optional};
use report_persistence::PersistenceError;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::response::CachedResponse;

/// Storage for named cache snapshots.
///
/// A snapshot is written as a whole by [`CacheStorage::put_all`]; readers
/// never see a half-populated cache.
pub trait CacheStorage: Send + Sync {
    /// Names of every stored cache.
    fn keys(&self) -> Result<Vec<String>>;

    /// Returns true if a cache with this name exists.
    fn has(&self, name: &str) -> Result<bool> {
        Ok(self.keys()?.iter().any(|key| key == name))
    }

    /// Stores `entries` as the complete contents of cache `name`,
    /// replacing anything previously stored under that name.
    fn put_all(&self, name: &str, entries: Vec<CachedResponse>) -> Result<()>;

    /// Looks up a URL in cache `name`.
    fn lookup(&self, name: &str, url: &str) -> Result<Option<CachedResponse>>;

    /// Deletes cache `name`. Returns false if it did not exist.
    fn delete(&self, name: &str) -> Result<bool>;
}

/// In-memory storage, used in tests and for ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RwLock<HashMap<String, HashMap<String, CachedResponse>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> CacheError {
    CacheError::LockPoisoned(e.to_string())
}

impl CacheStorage for MemoryCacheStorage {
    fn keys(&self) -> Result<Vec<String>> {
        let caches = self.caches.read().map_err(poisoned)?;
        let mut names: Vec<String> = caches.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn put_all(&self, name: &str, entries: Vec<CachedResponse>) -> Result<()> {
        let snapshot = entries
            .into_iter()
            .map(|entry| (entry.url.clone(), entry))
            .collect();
        self.caches
            .write()
            .map_err(poisoned)?
            .insert(name.to_string(), snapshot);
        Ok(())
    }

    fn lookup(&self, name: &str, url: &str) -> Result<Option<CachedResponse>> {
        let caches = self.caches.read().map_err(poisoned)?;
        Ok(caches.get(name).and_then(|cache| cache.get(url)).cloned())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.caches.write().map_err(poisoned)?.remove(name).is_some())
    }
}

const INDEX_FILE: &str = "index.json";
const STAGING_PREFIX: &str = ".staging-";

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    url: String,
    status: u16,
    #[serde(default)]
    content_type: Option<String>,
    body_file: String,
}

/// Durable storage: one directory per cache.
///
/// ```text
/// base_path/
/// └── report-app-v2/
///     ├── index.json
///     ├── 0.body
///     └── 1.body
/// ```
///
/// Snapshots are assembled in a staging directory and renamed into place.
pub struct FsCacheStorage {
    base_path: PathBuf,
}

impl FsCacheStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn cache_dir(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    fn read_index(&self, dir: &Path) -> Result<Option<Vec<IndexEntry>>> {
        Ok(read_json_optional(&dir.join(INDEX_FILE))?)
    }
}

fn write_error(path: &Path) -> impl Fn(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::WriteError {
        path: path.to_path_buf(),
        source,
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(write_error(path)(e).into()),
    }
}

impl CacheStorage for FsCacheStorage {
    fn keys(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::ReadError {
                    path: self.base_path.clone(),
                    source,
                }
                .into())
            }
        };

        let mut names = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with(STAGING_PREFIX) || !path.join(INDEX_FILE).is_file() {
                continue;
            }
            names.push(name.to_string());
        }
        names.sort();
        Ok(names)
    }

    fn put_all(&self, name: &str, entries: Vec<CachedResponse>) -> Result<()> {
        ensure_dir(&self.base_path)?;
        let staging = self.base_path.join(format!("{}{}", STAGING_PREFIX, name));
        remove_dir_if_exists(&staging)?;
        ensure_dir(&staging)?;

        let mut index = Vec::with_capacity(entries.len());
        for (n, entry) in entries.into_iter().enumerate() {
            let body_file = format!("{}.body", n);
            atomic_write(&staging.join(&body_file), &entry.body)?;
            index.push(IndexEntry {
                url: entry.url,
                status: entry.status,
                content_type: entry.content_type,
                body_file,
            });
        }
        // Index last: a directory without one is never listed as a cache
        atomic_write_json(&staging.join(INDEX_FILE), &index)?;

        let target = self.cache_dir(name);
        remove_dir_if_exists(&target)?;
        fs::rename(&staging, &target).map_err(write_error(&target))?;
        Ok(())
    }

    fn lookup(&self, name: &str, url: &str) -> Result<Option<CachedResponse>> {
        let dir = self.cache_dir(name);
        let Some(index) = self.read_index(&dir)? else {
            return Ok(None);
        };
        let Some(entry) = index.into_iter().find(|entry| entry.url == url) else {
            return Ok(None);
        };

        let body_path = dir.join(&entry.body_file);
        let body = fs::read(&body_path).map_err(|source| PersistenceError::ReadError {
            path: body_path.clone(),
            source,
        })?;
        Ok(Some(CachedResponse {
            url: entry.url,
            status: entry.status,
            content_type: entry.content_type,
            body,
        }))
    }

    fn delete(&self, name: &str) -> Result<bool> {
        remove_dir_if_exists(&self.cache_dir(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entries(tag: &str) -> Vec<CachedResponse> {
        vec![
            CachedResponse::new("https://app.test/app/", 200, format!("root {}", tag))
                .with_content_type("text/html"),
            CachedResponse::new("https://app.test/app/index.html", 200, format!("doc {}", tag)),
        ]
    }

    fn exercise(storage: &dyn CacheStorage) {
        assert!(storage.keys().unwrap().is_empty());

        storage.put_all("app-v1", entries("v1")).unwrap();
        storage.put_all("app-v2", entries("v2")).unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["app-v1", "app-v2"]);
        assert!(storage.has("app-v1").unwrap());

        let hit = storage
            .lookup("app-v2", "https://app.test/app/")
            .unwrap()
            .unwrap();
        assert_eq!(hit.body, b"root v2");
        assert_eq!(hit.content_type.as_deref(), Some("text/html"));
        assert!(storage
            .lookup("app-v2", "https://app.test/other")
            .unwrap()
            .is_none());
        assert!(storage.lookup("missing", "https://app.test/app/").unwrap().is_none());

        // Replacing a snapshot drops entries that are no longer listed
        storage
            .put_all("app-v1", vec![CachedResponse::new("https://app.test/x", 200, "x")])
            .unwrap();
        assert!(storage
            .lookup("app-v1", "https://app.test/app/")
            .unwrap()
            .is_none());

        assert!(storage.delete("app-v1").unwrap());
        assert!(!storage.delete("app-v1").unwrap());
        assert_eq!(storage.keys().unwrap(), vec!["app-v2"]);
    }

    #[test]
    fn test_memory_storage() {
        exercise(&MemoryCacheStorage::new());
    }

    #[test]
    fn test_fs_storage() {
        let dir = tempdir().unwrap();
        exercise(&FsCacheStorage::new(dir.path().join("caches")));
    }

    #[test]
    fn test_fs_storage_ignores_incomplete_dirs() {
        let dir = tempdir().unwrap();
        let storage = FsCacheStorage::new(dir.path());
        fs::create_dir_all(dir.path().join("half-written")).unwrap();
        fs::create_dir_all(dir.path().join(".staging-app-v3")).unwrap();
        fs::write(dir.path().join(".staging-app-v3").join(INDEX_FILE), b"[]").unwrap();

        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_fs_storage_survives_reopen() {
        let dir = tempdir().unwrap();
        FsCacheStorage::new(dir.path())
            .put_all("app-v1", entries("v1"))
            .unwrap();

        let reopened = FsCacheStorage::new(dir.path());
        let hit = reopened
            .lookup("app-v1", "https://app.test/app/index.html")
            .unwrap()
            .unwrap();
        assert_eq!(hit.body, b"doc v1");
    }
}
