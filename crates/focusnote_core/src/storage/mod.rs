//! Persistence port for named blobs.
//!
//! # Responsibility
//! - Define the byte-level `read`/`write` contract every durable write goes
//!   through.
//! - Carry a classified storage error so callers can pick a recovery policy.
//!
//! # Invariants
//! - A missing key is `Ok(None)`, never an error.
//! - `write` replaces the whole blob for a key.
//!
//! # See also
//! - `crate::db::SqliteBlobStore` for the SQLite-backed implementation.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;

pub use memory::MemoryBlobStore;

/// Key for the serialized note collection.
pub const NOTES_KEY: &str = "notes";
/// Key for the serialized category collection.
pub const CATEGORIES_KEY: &str = "categories";
/// Key for the append-only focus log.
pub const FOCUS_LOG_KEY: &str = "focus_log";
/// Key for the derived focus stats snapshot.
pub const FOCUS_STATS_KEY: &str = "focus_stats";

pub type StorageResult<T> = Result<T, StorageError>;

/// Byte-level blob storage owned by the host and injected into core.
pub trait BlobStore: Send + Sync {
    /// Reads the blob stored under `key`, `None` when absent.
    fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;
    /// Replaces the blob stored under `key`.
    fn write(&self, key: &str, bytes: &[u8]) -> StorageResult<()>;
}

/// Sub-kind of a storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    NotFound,
    PermissionDenied,
    InsufficientStorage,
    /// Stored bytes exist but cannot be decoded.
    Corrupted,
    /// In-memory state could not be encoded.
    Serialization,
    /// Any other transport failure.
    Io,
}

impl StorageErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::InsufficientStorage => "insufficient_storage",
            Self::Corrupted => "corrupted",
            Self::Serialization => "serialization",
            Self::Io => "io",
        }
    }
}

/// Classified storage failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Io, message)
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "storage error ({}): {}", self.kind.as_str(), self.message)
    }
}

impl Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        Self::new(crate::error::classify_io_error(&value), value.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        let kind = if value.is_io() {
            StorageErrorKind::Io
        } else {
            StorageErrorKind::Serialization
        };
        Self::new(kind, value.to_string())
    }
}
