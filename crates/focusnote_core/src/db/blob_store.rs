//! `BlobStore` over a single SQLite table.
//!
//! # Invariants
//! - One row per key; `write` is an upsert.
//! - The connection is only touched under its mutex.

use super::{open_db, open_db_in_memory, DbResult};
use crate::storage::{BlobStore, StorageResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct SqliteBlobStore {
    conn: Mutex<Connection>,
}

impl SqliteBlobStore {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps a connection already bootstrapped by `open_db*`.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Lists stored keys in ascending order.
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT key FROM blobs ORDER BY key ASC;")?;
        let mut rows = stmt.query([])?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(row.get(0)?);
        }
        Ok(keys)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlobStore for SqliteBlobStore {
    fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let conn = self.lock();
        let data = conn
            .query_row("SELECT data FROM blobs WHERE key = ?1;", [key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(data)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO blobs (key, data, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at;",
            params![key, bytes],
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBlobStore").finish_non_exhaustive()
    }
}
