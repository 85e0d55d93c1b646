//! Core error taxonomy and recovery classification.
//!
//! # Responsibility
//! - Define the closed set of errors surfaced by repository operations.
//! - Map low-level I/O and SQLite failures into `StorageErrorKind`.
//! - Attach a recovery policy to every error so hosts can decide between
//!   retrying, falling back, asking the user, or ignoring.
//!
//! # Invariants
//! - Validation and structural errors never trigger an automatic retry.
//! - Load failures always resolve to `Fallback`; startup never aborts.

use crate::model::category::CategoryValidationError;
use crate::storage::{StorageError, StorageErrorKind};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type CoreResult<T> = Result<T, CoreError>;

/// `ENOSPC` on Linux and macOS.
const ENOSPC: i32 = 28;
/// `ERROR_DISK_FULL` on Windows.
const ERROR_DISK_FULL: i32 = 112;
/// `ERROR_HANDLE_DISK_FULL` on Windows.
const ERROR_HANDLE_DISK_FULL: i32 = 39;

/// What a caller should do after an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Transient; the same operation may succeed later.
    Retry,
    /// Use a secondary source (backup blob, empty default).
    Fallback,
    /// Input or environment must be corrected by the user.
    UserIntervention,
    /// Nothing to do; the target is already gone.
    Ignore,
}

/// Entity kind referenced by `CoreError::NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Note,
    Category,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Category => "category",
        }
    }
}

/// Errors returned by repository and workspace operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Unknown id.
    NotFound { entity: EntityKind, id: Uuid },
    /// Category name rejected by validation.
    InvalidCategory(CategoryValidationError),
    /// The only remaining category cannot be removed.
    CannotDeleteLast,
    /// No category is left to receive reassigned notes.
    NoFallback,
    /// Durable write failed after retries were exhausted.
    SaveFailed(StorageError),
    /// Startup decode failed; the caller received a fallback collection.
    LoadFailed(StorageError),
    /// Stored bytes could not be decoded.
    Corrupted(String),
}

impl CoreError {
    pub fn note_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: EntityKind::Note,
            id,
        }
    }

    pub fn category_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: EntityKind::Category,
            id,
        }
    }

    /// Recovery policy for this error.
    pub fn recovery_policy(&self) -> RecoveryPolicy {
        match self {
            Self::NotFound { .. } => RecoveryPolicy::Ignore,
            Self::InvalidCategory(_) | Self::CannotDeleteLast | Self::NoFallback => {
                RecoveryPolicy::UserIntervention
            }
            Self::SaveFailed(err) => match err.kind {
                StorageErrorKind::InsufficientStorage | StorageErrorKind::PermissionDenied => {
                    RecoveryPolicy::UserIntervention
                }
                _ => RecoveryPolicy::Retry,
            },
            Self::LoadFailed(_) | Self::Corrupted(_) => RecoveryPolicy::Fallback,
        }
    }

    /// Whether the error should be shown to the user right away.
    pub fn is_user_actionable(&self) -> bool {
        self.recovery_policy() == RecoveryPolicy::UserIntervention
    }

    /// Storage sub-kind for persistence errors.
    pub fn storage_kind(&self) -> Option<StorageErrorKind> {
        match self {
            Self::SaveFailed(err) | Self::LoadFailed(err) => Some(err.kind),
            Self::Corrupted(_) => Some(StorageErrorKind::Corrupted),
            _ => None,
        }
    }

    /// Stable machine-readable code, used in log lines and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidCategory(err) => err.code(),
            Self::CannotDeleteLast => "cannot_delete_last",
            Self::NoFallback => "no_fallback",
            Self::SaveFailed(_) => "save_failed",
            Self::LoadFailed(_) => "load_failed",
            Self::Corrupted(_) => "corrupted",
        }
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{} not found: {id}", entity.as_str()),
            Self::InvalidCategory(err) => write!(f, "{err}"),
            Self::CannotDeleteLast => write!(f, "cannot delete the last remaining category"),
            Self::NoFallback => write!(f, "no fallback category available for reassignment"),
            Self::SaveFailed(err) => write!(f, "save failed: {err}"),
            Self::LoadFailed(err) => write!(f, "load failed: {err}"),
            Self::Corrupted(details) => write!(f, "stored data is corrupted: {details}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidCategory(err) => Some(err),
            Self::SaveFailed(err) | Self::LoadFailed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CategoryValidationError> for CoreError {
    fn from(value: CategoryValidationError) -> Self {
        Self::InvalidCategory(value)
    }
}

/// Maps an OS-level I/O failure onto a storage sub-kind.
pub fn classify_io_error(err: &std::io::Error) -> StorageErrorKind {
    if let Some(code) = err.raw_os_error() {
        let windows_disk_full =
            cfg!(windows) && matches!(code, ERROR_DISK_FULL | ERROR_HANDLE_DISK_FULL);
        if (cfg!(unix) && code == ENOSPC) || windows_disk_full {
            return StorageErrorKind::InsufficientStorage;
        }
    }

    match err.kind() {
        std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
        std::io::ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
        std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => {
            StorageErrorKind::Corrupted
        }
        _ => StorageErrorKind::Io,
    }
}

/// Maps a SQLite failure onto a storage sub-kind.
pub fn classify_sqlite_error(err: &rusqlite::Error) -> StorageErrorKind {
    use rusqlite::ErrorCode;

    match err.sqlite_error_code() {
        Some(ErrorCode::DiskFull) => StorageErrorKind::InsufficientStorage,
        Some(ErrorCode::PermissionDenied)
        | Some(ErrorCode::ReadOnly)
        | Some(ErrorCode::AuthorizationForStatementDenied) => StorageErrorKind::PermissionDenied,
        Some(ErrorCode::DatabaseCorrupt) | Some(ErrorCode::NotADatabase) => {
            StorageErrorKind::Corrupted
        }
        Some(ErrorCode::CannotOpen) => StorageErrorKind::NotFound,
        _ => StorageErrorKind::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::{classify_io_error, CoreError, RecoveryPolicy};
    use crate::model::category::CategoryValidationError;
    use crate::storage::{StorageError, StorageErrorKind};
    use std::io;

    #[test]
    fn io_errors_map_to_storage_sub_kinds() {
        assert_eq!(
            classify_io_error(&io::Error::from(io::ErrorKind::NotFound)),
            StorageErrorKind::NotFound
        );
        assert_eq!(
            classify_io_error(&io::Error::from(io::ErrorKind::PermissionDenied)),
            StorageErrorKind::PermissionDenied
        );
        assert_eq!(
            classify_io_error(&io::Error::from_raw_os_error(28)),
            StorageErrorKind::InsufficientStorage
        );
        assert_eq!(
            classify_io_error(&io::Error::other("boom")),
            StorageErrorKind::Io
        );
    }

    #[test]
    fn recovery_policy_follows_error_class() {
        assert_eq!(
            CoreError::from(CategoryValidationError::TooShort).recovery_policy(),
            RecoveryPolicy::UserIntervention
        );
        assert_eq!(
            CoreError::CannotDeleteLast.recovery_policy(),
            RecoveryPolicy::UserIntervention
        );
        assert_eq!(
            CoreError::SaveFailed(StorageError::io("flaky")).recovery_policy(),
            RecoveryPolicy::Retry
        );
        assert_eq!(
            CoreError::SaveFailed(StorageError::new(
                StorageErrorKind::InsufficientStorage,
                "disk full"
            ))
            .recovery_policy(),
            RecoveryPolicy::UserIntervention
        );
        assert_eq!(
            CoreError::Corrupted("bad json".to_string()).recovery_policy(),
            RecoveryPolicy::Fallback
        );
        assert_eq!(
            CoreError::note_not_found(uuid::Uuid::nil()).recovery_policy(),
            RecoveryPolicy::Ignore
        );
    }
}
