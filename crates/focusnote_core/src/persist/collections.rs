//! Whole-collection codec over the blob port.
//!
//! # Responsibility
//! - Encode collections as JSON arrays and write them with a backup copy.
//! - Decode collections at startup with a primary -> backup -> empty chain.
//! - Preserve undecodable primaries under a timestamped key before they are
//!   replaced.
//!
//! # Invariants
//! - `load_collection` never returns an error; problems are reported in
//!   `Loaded::errors` and logged.
//! - The backup blob is only written after the primary write succeeded.

use crate::clock::Clock;
use crate::error::CoreError;
use crate::storage::{BlobStore, StorageError, StorageResult};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Key of the secondary copy written after every successful primary write.
pub fn backup_key(key: &str) -> String {
    format!("{key}.bak")
}

/// Key under which an undecodable primary is preserved.
pub fn corrupt_backup_key(key: &str, now_ms: i64) -> String {
    format!("{key}.corrupt-{now_ms}")
}

/// Where a loaded collection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Primary,
    Backup,
    /// Neither blob was usable (or both were absent).
    Empty,
}

#[derive(Debug)]
pub struct Loaded<T> {
    pub items: Vec<T>,
    pub source: LoadSource,
    /// Key the corrupted primary was copied to, if that happened.
    pub preserved_corrupt_key: Option<String>,
    /// Failures encountered on the way; informational only.
    pub errors: Vec<CoreError>,
}

/// Outcome of a successful primary write.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Set when the primary was written but the backup copy failed.
    pub backup_error: Option<StorageError>,
}

impl WriteReceipt {
    pub fn is_complete(&self) -> bool {
        self.backup_error.is_none()
    }
}

/// Loads the collection stored under `key`, degrading to backup then empty.
pub fn load_collection<T: DeserializeOwned + Serialize>(
    store: &dyn BlobStore,
    clock: &dyn Clock,
    key: &str,
) -> Loaded<T> {
    let mut errors = Vec::new();
    let mut preserved_corrupt_key = None;
    let mut primary_corrupted = false;

    match store.read(key) {
        Ok(Some(bytes)) => match serde_json::from_slice::<Vec<T>>(&bytes) {
            Ok(items) => {
                info!(
                    "event=collection_load module=persist status=ok key={} source=primary count={}",
                    key,
                    items.len()
                );
                return Loaded {
                    items,
                    source: LoadSource::Primary,
                    preserved_corrupt_key: None,
                    errors,
                };
            }
            Err(err) => {
                primary_corrupted = true;
                let target = corrupt_backup_key(key, clock.now_ms());
                match store.write(&target, &bytes) {
                    Ok(()) => {
                        warn!(
                            "event=collection_load module=persist status=corrupted key={} preserved_as={} error={}",
                            key, target, err
                        );
                        preserved_corrupt_key = Some(target);
                    }
                    Err(copy_err) => error!(
                        "event=collection_load module=persist status=corrupted key={} preserve_error={} error={}",
                        key, copy_err, err
                    ),
                }
                errors.push(CoreError::Corrupted(format!("{key}: {err}")));
            }
        },
        Ok(None) => info!(
            "event=collection_load module=persist status=missing key={}",
            key
        ),
        Err(err) => {
            warn!(
                "event=collection_load module=persist status=error key={} error_kind={} error={}",
                key,
                err.kind.as_str(),
                err
            );
            errors.push(CoreError::LoadFailed(err));
        }
    }

    let backup = backup_key(key);
    let (items, source) = match store.read(&backup) {
        Ok(Some(bytes)) => match serde_json::from_slice::<Vec<T>>(&bytes) {
            Ok(items) => {
                warn!(
                    "event=collection_load module=persist status=fallback key={} source=backup count={}",
                    key,
                    items.len()
                );
                (items, LoadSource::Backup)
            }
            Err(err) => {
                warn!(
                    "event=collection_load module=persist status=corrupted key={} error={}",
                    backup, err
                );
                errors.push(CoreError::Corrupted(format!("{backup}: {err}")));
                (Vec::new(), LoadSource::Empty)
            }
        },
        Ok(None) => (Vec::new(), LoadSource::Empty),
        Err(err) => {
            errors.push(CoreError::LoadFailed(err));
            (Vec::new(), LoadSource::Empty)
        }
    };

    if primary_corrupted {
        if let Err(err) = write_primary(store, key, &items) {
            error!(
                "event=collection_replace module=persist status=error key={} error={}",
                key, err
            );
        }
    }

    Loaded {
        items,
        source,
        preserved_corrupt_key,
        errors,
    }
}

/// Writes `items` to `key`, then the backup copy.
///
/// Fails only when the primary write fails; a backup failure is reported
/// through the receipt.
pub fn save_collection<T: Serialize>(
    store: &dyn BlobStore,
    key: &str,
    items: &[T],
) -> StorageResult<WriteReceipt> {
    let bytes = write_primary(store, key, items)?;
    let backup_error = store.write(&backup_key(key), &bytes).err();
    if let Some(err) = &backup_error {
        warn!(
            "event=collection_backup module=persist status=error key={} error_kind={} error={}",
            key,
            err.kind.as_str(),
            err
        );
    }
    Ok(WriteReceipt { backup_error })
}

/// Writes one JSON document with no backup copy.
pub fn write_snapshot<T: Serialize>(
    store: &dyn BlobStore,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let bytes = serde_json::to_vec(value)?;
    store.write(key, &bytes)
}

fn write_primary<T: Serialize>(
    store: &dyn BlobStore,
    key: &str,
    items: &[T],
) -> StorageResult<Vec<u8>> {
    let bytes = serde_json::to_vec(items)?;
    store.write(key, &bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::{backup_key, load_collection, save_collection, LoadSource};
    use crate::clock::ManualClock;
    use crate::storage::{BlobStore, MemoryBlobStore, StorageErrorKind};

    #[test]
    fn save_writes_primary_and_backup() {
        let store = MemoryBlobStore::new();
        let receipt = save_collection(&store, "items", &[1, 2, 3]).unwrap();
        assert!(receipt.is_complete());
        assert_eq!(store.get("items").unwrap(), b"[1,2,3]");
        assert_eq!(store.get(&backup_key("items")).unwrap(), b"[1,2,3]");
    }

    #[test]
    fn backup_failure_is_reported_not_raised() {
        let store = MemoryBlobStore::new();
        store.fail_next_writes_to("items.bak", 1, StorageErrorKind::InsufficientStorage);
        let receipt = save_collection(&store, "items", &[1]).unwrap();
        assert_eq!(
            receipt.backup_error.map(|err| err.kind),
            Some(StorageErrorKind::InsufficientStorage)
        );
    }

    #[test]
    fn missing_primary_and_backup_loads_empty_without_errors() {
        let store = MemoryBlobStore::new();
        let clock = ManualClock::new(0);
        let loaded = load_collection::<u32>(&store, &clock, "items");
        assert!(loaded.items.is_empty());
        assert_eq!(loaded.source, LoadSource::Empty);
        assert!(loaded.errors.is_empty());
    }

    #[test]
    fn corrupted_primary_is_preserved_then_replaced_from_backup() {
        let store = MemoryBlobStore::new();
        let clock = ManualClock::new(42);
        store.insert_raw("items", b"{not json".to_vec());
        store.insert_raw("items.bak", b"[7,8]".to_vec());

        let loaded = load_collection::<u32>(&store, &clock, "items");

        assert_eq!(loaded.items, vec![7, 8]);
        assert_eq!(loaded.source, LoadSource::Backup);
        assert_eq!(
            loaded.preserved_corrupt_key.as_deref(),
            Some("items.corrupt-42")
        );
        assert_eq!(store.get("items.corrupt-42").unwrap(), b"{not json");
        assert_eq!(store.read("items").unwrap().unwrap(), b"[7,8]");
        assert_eq!(loaded.errors.len(), 1);
    }

    #[test]
    fn corrupted_primary_without_backup_becomes_empty_collection() {
        let store = MemoryBlobStore::new();
        let clock = ManualClock::new(7);
        store.insert_raw("items", b"garbage".to_vec());

        let loaded = load_collection::<u32>(&store, &clock, "items");

        assert!(loaded.items.is_empty());
        assert_eq!(loaded.source, LoadSource::Empty);
        assert_eq!(store.get("items").unwrap(), b"[]");
        assert!(store.get("items.corrupt-7").is_some());
    }
}
