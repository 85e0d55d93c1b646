//! Core domain logic for FocusNote.
//! This crate is the single source of truth for note, category and focus
//! session invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod focus;
pub mod logging;
pub mod model;
pub mod persist;
pub mod repo;
pub mod schedule;
pub mod search;
pub mod service;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, CoreConfig, RetryPolicy, TimerConfig};
pub use db::{DbError, SqliteBlobStore};
pub use error::{CoreError, CoreResult, EntityKind, RecoveryPolicy};
pub use events::{CoreEvent, EventSink, Notifier, RecordingSink};
pub use focus::{
    DistractionOutcome, FocusLossChoice, FocusPrompt, PauseKind, SessionTimer, TimerError,
    TimerState,
};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::category::{Category, CategoryId, CategoryValidationError};
pub use model::focus::{FocusEventType, FocusLogEntry, FocusStats, RangeStats, StatsRange};
pub use model::note::{Note, NoteId};
pub use persist::SaveStatus;
pub use repo::note_repo::NoteRepository;
pub use service::{PollOutcome, Workspace, WorkspaceError};
pub use storage::{BlobStore, MemoryBlobStore, StorageError, StorageErrorKind, StorageResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
