//! Durable store for submissions awaiting network delivery.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use report_models::{PendingSubmission, SubmissionId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::atomic::{
    atomic_create, atomic_write_json, ensure_dir, read_json, read_json_optional, remove_if_exists,
};
use crate::error::{PersistenceError, Result};

/// Name of the object collection holding pending submissions.
pub const COLLECTION: &str = "pending_submissions";

const SEQUENCE_FILE: &str = "sequence.json";

/// Upper bound on id collisions tolerated in one enqueue (another process
/// writing the same collection).
const MAX_ID_CLAIMS: u32 = 64;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sequence {
    next_id: u64,
}

/// Durable key-value log of pending submissions.
///
/// Records are stored as individual JSON files keyed by their id:
/// ```text
/// base_path/
/// ├── sequence.json
/// └── pending_submissions/
///     ├── 1.json
///     └── 3.json
/// ```
///
/// Ids come from a persisted counter and are never reused, even after the
/// record is removed or the process restarts. Each mutation runs as one
/// read-then-write critical section under an in-process mutex.
pub struct PendingStore {
    base_path: PathBuf,
    lock: Mutex<()>,
}

impl PendingStore {
    /// Creates a store rooted at `base_path`. Nothing is touched on disk
    /// until the first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the store's root directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn collection_dir(&self) -> PathBuf {
        self.base_path.join(COLLECTION)
    }

    fn record_path(&self, id: SubmissionId) -> PathBuf {
        self.collection_dir().join(format!("{}.json", id))
    }

    fn sequence_path(&self) -> PathBuf {
        self.base_path.join(SEQUENCE_FILE)
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|e| PersistenceError::LockPoisoned(e.to_string()))
    }

    /// Ids of all records currently on disk, ascending.
    fn record_ids(&self) -> Result<Vec<SubmissionId>> {
        let dir = self.collection_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(PersistenceError::ReadError { path: dir, source }),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| PersistenceError::ReadError {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.parse::<SubmissionId>().ok())
                {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Persists a payload and returns its newly assigned id.
    ///
    /// # Errors
    /// Returns [`PersistenceError::StorageUnavailable`] if the store cannot
    /// be opened or written. The payload is not retained in that case.
    pub fn enqueue(&self, data: serde_json::Value) -> Result<SubmissionId> {
        let _guard = self.guard()?;
        ensure_dir(&self.collection_dir())?;

        let sequence: Sequence = read_json_optional(&self.sequence_path())
            .map_err(|e| e.into_unavailable())?
            .unwrap_or_default();
        let after_existing = self
            .record_ids()?
            .last()
            .map(|id| id.value() + 1)
            .unwrap_or(1);
        let mut id = SubmissionId::new(sequence.next_id.max(after_existing).max(1));

        let mut claims = 0;
        loop {
            // The counter moves past `id` before the record lands, so an error
            // return never leaves the payload queued.
            atomic_write_json(
                &self.sequence_path(),
                &Sequence {
                    next_id: id.value() + 1,
                },
            )
            .map_err(|e| e.into_unavailable())?;

            let record = PendingSubmission::new(id, data.clone());
            let bytes = serde_json::to_vec_pretty(&record)?;
            if atomic_create(&self.record_path(id), &bytes).map_err(|e| e.into_unavailable())? {
                break;
            }
            claims += 1;
            if claims >= MAX_ID_CLAIMS {
                return Err(PersistenceError::StorageUnavailable {
                    path: self.collection_dir(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "could not claim a free submission id",
                    ),
                });
            }
            id = id.next();
        }

        debug!(id = %id, "submission queued");
        Ok(id)
    }

    /// Returns every pending submission in id order.
    ///
    /// Records that cannot be parsed are logged and skipped, never deleted.
    pub fn list_all(&self) -> Result<Vec<PendingSubmission>> {
        let _guard = self.guard()?;
        let mut records = Vec::new();
        for id in self.record_ids()? {
            let path = self.record_path(id);
            match read_json::<PendingSubmission>(&path) {
                Ok(record) => records.push(record),
                Err(PersistenceError::ReadError { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable pending submission");
                }
            }
        }
        Ok(records)
    }

    /// Loads a single submission.
    pub fn get(&self, id: SubmissionId) -> Result<Option<PendingSubmission>> {
        let _guard = self.guard()?;
        read_json_optional(&self.record_path(id))
    }

    /// Deletes a submission. Removing an absent id is a no-op.
    pub fn remove(&self, id: SubmissionId) -> Result<()> {
        let _guard = self.guard()?;
        if remove_if_exists(&self.record_path(id))? {
            debug!(id = %id, "submission removed");
        }
        Ok(())
    }

    /// Records one failed delivery attempt and returns the new count.
    ///
    /// Returns `None` if the submission no longer exists.
    pub fn record_failure(&self, id: SubmissionId) -> Result<Option<u32>> {
        let _guard = self.guard()?;
        let path = self.record_path(id);
        let Some(mut record) = read_json_optional::<PendingSubmission>(&path)? else {
            return Ok(None);
        };
        record.attempts = record.attempts.saturating_add(1);
        atomic_write_json(&path, &record)?;
        Ok(Some(record.attempts))
    }

    /// Number of pending submissions.
    pub fn len(&self) -> Result<usize> {
        let _guard = self.guard()?;
        Ok(self.record_ids()?.len())
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_enqueue_assigns_increasing_ids() {
        let dir = tempdir().unwrap();
        let store = PendingStore::new(dir.path());

        let a = store.enqueue(json!({"n": 1})).unwrap();
        let b = store.enqueue(json!({"n": 2})).unwrap();

        assert_eq!(a, SubmissionId::new(1));
        assert_eq!(b, SubmissionId::new(2));
    }

    #[test]
    fn test_list_all_in_id_order() {
        let dir = tempdir().unwrap();
        let store = PendingStore::new(dir.path());

        for n in 0..12 {
            store.enqueue(json!({ "n": n })).unwrap();
        }

        let records = store.list_all().unwrap();
        assert_eq!(records.len(), 12);
        // 10.json sorts before 2.json lexically; ids must still be numeric order
        let ids: Vec<u64> = records.iter().map(|r| r.id.value()).collect();
        assert_eq!(ids, (1..=12).collect::<Vec<_>>());
        assert_eq!(records[0].data, json!({"n": 0}));
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let dir = tempdir().unwrap();
        let store = PendingStore::new(dir.path());

        let a = store.enqueue(json!("a")).unwrap();
        let b = store.enqueue(json!("b")).unwrap();
        store.remove(b).unwrap();
        store.remove(a).unwrap();

        let c = store.enqueue(json!("c")).unwrap();
        assert_eq!(c, SubmissionId::new(3));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = PendingStore::new(dir.path());
            store.enqueue(json!({"ticket": "1"})).unwrap();
        }

        let store = PendingStore::new(dir.path());
        let records = store.list_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data["ticket"], "1");

        let next = store.enqueue(json!({"ticket": "2"})).unwrap();
        assert_eq!(next, SubmissionId::new(2));
    }

    #[test]
    fn test_lost_sequence_file_does_not_reuse_ids() {
        let dir = tempdir().unwrap();
        let store = PendingStore::new(dir.path());
        store.enqueue(json!(1)).unwrap();
        store.enqueue(json!(2)).unwrap();

        fs::remove_file(dir.path().join(SEQUENCE_FILE)).unwrap();

        let id = store.enqueue(json!(3)).unwrap();
        assert_eq!(id, SubmissionId::new(3));
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = PendingStore::new(dir.path());

        store.remove(SubmissionId::new(99)).unwrap();

        let id = store.enqueue(json!({})).unwrap();
        store.remove(id).unwrap();
        store.remove(id).unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_remove_only_touches_target() {
        let dir = tempdir().unwrap();
        let store = PendingStore::new(dir.path());

        let a = store.enqueue(json!("a")).unwrap();
        let b = store.enqueue(json!("b")).unwrap();
        store.remove(a).unwrap();

        let remaining = store.list_all().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b);
    }

    #[test]
    fn test_enqueue_storage_unavailable() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let store = PendingStore::new(file.path().join("store"));

        let err = store.enqueue(json!({"x": 1})).unwrap_err();
        assert!(err.is_storage_unavailable());
    }

    #[test]
    fn test_unwritable_sequence_leaves_nothing_queued() {
        let dir = tempdir().unwrap();
        let store = PendingStore::new(dir.path());
        store.enqueue(json!({"n": 1})).unwrap();

        let sequence = dir.path().join(SEQUENCE_FILE);
        fs::remove_file(&sequence).unwrap();
        fs::create_dir(&sequence).unwrap();

        let err = store.enqueue(json!({"n": 2})).unwrap_err();
        assert!(err.is_storage_unavailable());

        let records = store.list_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data, json!({"n": 1}));
    }

    #[test]
    fn test_record_failure_counts_attempts() {
        let dir = tempdir().unwrap();
        let store = PendingStore::new(dir.path());
        let id = store.enqueue(json!({})).unwrap();

        assert_eq!(store.record_failure(id).unwrap(), Some(1));
        assert_eq!(store.record_failure(id).unwrap(), Some(2));
        assert_eq!(store.get(id).unwrap().unwrap().attempts, 2);
        assert_eq!(store.record_failure(SubmissionId::new(50)).unwrap(), None);
    }

    #[test]
    fn test_corrupt_record_is_skipped_not_deleted() {
        let dir = tempdir().unwrap();
        let store = PendingStore::new(dir.path());
        store.enqueue(json!("ok")).unwrap();

        let bad = dir.path().join(COLLECTION).join("7.json");
        fs::write(&bad, b"{not json").unwrap();

        let records = store.list_all().unwrap();
        assert_eq!(records.len(), 1);
        assert!(bad.exists());
    }

    #[test]
    fn test_list_all_on_fresh_store() {
        let dir = tempdir().unwrap();
        let store = PendingStore::new(dir.path().join("never-created"));
        assert!(store.list_all().unwrap().is_empty());
        assert_eq!(store.len().unwrap(), 0);
    }
}
