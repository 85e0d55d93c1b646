//! Durable layout of the focus log and its stats snapshot.
//!
//! The log is written with a backup copy; the stats snapshot is derived
//! and written without one. When the backup write fails the in-memory log
//! is cut down to its most recent entries and written once more.

use super::log::FocusLog;
use crate::clock::Clock;
use crate::model::focus::{FocusLogEntry, FocusStats};
use crate::persist::{load_collection, save_collection, write_snapshot, LoadSource};
use crate::storage::{BlobStore, StorageResult, FOCUS_LOG_KEY, FOCUS_STATS_KEY};
use log::{error, info, warn};
use std::sync::Arc;

pub struct FocusLogStore {
    store: Arc<dyn BlobStore>,
    keep_on_truncate: usize,
}

impl FocusLogStore {
    pub fn new(store: Arc<dyn BlobStore>, keep_on_truncate: usize) -> Self {
        Self {
            store,
            keep_on_truncate,
        }
    }

    /// Loads the log through the primary/backup/empty chain.
    pub fn load(&self, clock: &dyn Clock) -> (FocusLog, LoadSource) {
        let loaded = load_collection::<FocusLogEntry>(self.store.as_ref(), clock, FOCUS_LOG_KEY);
        (FocusLog::from_entries(loaded.items), loaded.source)
    }

    /// Writes the log and its backup. Returns how many entries were dropped
    /// to get the backup written.
    pub fn persist_log(&self, log: &mut FocusLog) -> StorageResult<usize> {
        let receipt = save_collection(self.store.as_ref(), FOCUS_LOG_KEY, log.entries())?;
        let Some(backup_error) = receipt.backup_error else {
            return Ok(0);
        };

        let dropped = log.truncate_to_recent(self.keep_on_truncate);
        warn!(
            "event=focus_log_truncate module=focus status=ok dropped={} kept={} error_kind={}",
            dropped,
            log.len(),
            backup_error.kind.as_str()
        );

        let retry = save_collection(self.store.as_ref(), FOCUS_LOG_KEY, log.entries())?;
        match retry.backup_error {
            None => info!("event=focus_log_backup module=focus status=ok after_truncate=true"),
            Some(err) => error!(
                "event=focus_log_backup module=focus status=error after_truncate=true error_kind={} error={}",
                err.kind.as_str(),
                err
            ),
        }
        Ok(dropped)
    }

    pub fn persist_stats(&self, stats: &FocusStats) -> StorageResult<()> {
        write_snapshot(self.store.as_ref(), FOCUS_STATS_KEY, stats)
    }
}

impl std::fmt::Debug for FocusLogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusLogStore")
            .field("keep_on_truncate", &self.keep_on_truncate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::FocusLogStore;
    use crate::focus::log::FocusLog;
    use crate::model::focus::{FocusEventType, FocusLogEntry};
    use crate::persist::collections::backup_key;
    use crate::storage::{MemoryBlobStore, StorageErrorKind, FOCUS_LOG_KEY};
    use std::sync::Arc;

    #[test]
    fn backup_failure_truncates_then_rewrites() {
        let memory = Arc::new(MemoryBlobStore::new());
        let store = FocusLogStore::new(memory.clone(), 3);
        let mut log = FocusLog::new();
        for ts in 0..10 {
            log.append(FocusLogEntry::new(FocusEventType::SessionStart, ts));
        }
        memory.fail_next_writes_to(&backup_key(FOCUS_LOG_KEY), 1, StorageErrorKind::InsufficientStorage);

        assert_eq!(store.persist_log(&mut log).expect("primary write"), 7);
        assert_eq!(log.len(), 3);
        assert_eq!(memory.write_count(FOCUS_LOG_KEY), 2);

        let backup = memory.get(&backup_key(FOCUS_LOG_KEY)).expect("backup written");
        let decoded: Vec<FocusLogEntry> = serde_json::from_slice(&backup).expect("decode");
        assert_eq!(decoded.len(), 3);
    }
}
