//! In-process blob store.
//!
//! Used by tests and by hosts that do not need durability. Supports scripted
//! write failures so retry and rollback paths can be driven deterministically.

use super::{BlobStore, StorageError, StorageErrorKind, StorageResult};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug)]
struct ScriptedFailure {
    /// `None` matches every key.
    key: Option<String>,
    remaining: usize,
    kind: StorageErrorKind,
}

#[derive(Debug, Default)]
struct MemoryState {
    blobs: BTreeMap<String, Vec<u8>>,
    write_counts: BTreeMap<String, usize>,
    failures: Vec<ScriptedFailure>,
}

/// `BlobStore` backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    state: Mutex<MemoryState>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` writes (any key) fail with `kind`.
    pub fn fail_next_writes(&self, count: usize, kind: StorageErrorKind) {
        self.push_failure(None, count, kind);
    }

    /// Makes the next `count` writes to `key` fail with `kind`.
    pub fn fail_next_writes_to(&self, key: &str, count: usize, kind: StorageErrorKind) {
        self.push_failure(Some(key.to_string()), count, kind);
    }

    /// Drops every scripted failure that has not fired yet.
    /// Stores raw bytes without counting a write.
    pub fn insert_raw(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.lock().blobs.insert(key.to_string(), bytes.into());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().blobs.get(key).cloned()
    }

    /// Number of successful writes to `key`.
    pub fn write_count(&self, key: &str) -> usize {
        self.lock().write_counts.get(key).copied().unwrap_or(0)
    }

    fn push_failure(&self, key: Option<String>, count: usize, kind: StorageErrorKind) {
        if count == 0 {
            return;
        }
        self.lock().failures.push(ScriptedFailure {
            key,
            remaining: count,
            kind,
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.lock().blobs.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        let mut state = self.lock();
        let scripted = state.failures.iter_mut().position(|failure| {
            failure.remaining > 0 && failure.key.as_deref().map_or(true, |k| k == key)
        });
        if let Some(index) = scripted {
            let failure = &mut state.failures[index];
            failure.remaining -= 1;
            let kind = failure.kind;
            if failure.remaining == 0 {
                state.failures.remove(index);
            }
            return Err(StorageError::new(
                kind,
                format!("scripted write failure for `{key}`"),
            ));
        }

        state.blobs.insert(key.to_string(), bytes.to_vec());
        *state.write_counts.entry(key.to_string()).or_insert(0) += 1;
        Ok(())
    }
}
