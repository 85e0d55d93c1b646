//! SQLite-backed implementation of the blob persistence port.
//!
//! # Responsibility
//! - Open and configure SQLite connections for FocusNote core.
//! - Bootstrap the `blobs` table before any read or write.
//! - Adapt `rusqlite` failures into classified `StorageError`s.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Core never touches a connection whose schema is not bootstrapped.

use crate::error::classify_sqlite_error;
use crate::storage::StorageError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod blob_store;
pub mod migrations;
mod open;

pub use blob_store::SqliteBlobStore;
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "blob store schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::new(classify_sqlite_error(&value), value.to_string())
    }
}
