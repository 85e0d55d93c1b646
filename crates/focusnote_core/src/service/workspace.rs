//! Workspace facade wiring repository, timer and ports together.
//!
//! # Responsibility
//! - Construct the repository and session timer over shared ports.
//! - Drive both scheduled-callback sources from one `poll`.
//! - Flush pending state on shutdown.
//!
//! # Invariants
//! - Repository and timer share one store, one clock and one notifier.
//! - `Workspace` is `Send`, so hosts can serialize calls through a mutex.

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, CoreConfig};
use crate::db::{DbError, SqliteBlobStore};
use crate::error::CoreResult;
use crate::events::{EventSink, Notifier};
use crate::focus::SessionTimer;
use crate::repo::note_repo::NoteRepository;
use crate::storage::BlobStore;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug)]
pub enum WorkspaceError {
    Config(ConfigError),
    Db(DbError),
}

impl Display for WorkspaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid configuration: {err}"),
            Self::Db(err) => write!(f, "cannot open data store: {err}"),
        }
    }
}

impl Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<ConfigError> for WorkspaceError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for WorkspaceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// What one `Workspace::poll` call did.
#[derive(Debug, Default)]
pub struct PollOutcome {
    /// Result of the autosave, when one was due.
    pub save: Option<CoreResult<()>>,
    /// Timer callbacks that ran.
    pub timer_callbacks: usize,
}

pub struct Workspace {
    notifier: Notifier,
    repo: NoteRepository,
    timer: SessionTimer,
}

impl Workspace {
    /// Loads all persisted state from `store`.
    pub fn open(
        store: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        config: CoreConfig,
    ) -> Result<Self, WorkspaceError> {
        config.validate()?;
        let notifier = Notifier::new();
        let repo = NoteRepository::load(store.clone(), clock.clone(), notifier.clone(), &config);
        let timer = SessionTimer::load(store, clock, notifier.clone(), &config);
        info!(
            "event=workspace_open module=service status=ok notes={} categories={} focus_entries={}",
            repo.notes().len(),
            repo.categories().len(),
            timer.log().len()
        );
        Ok(Self {
            notifier,
            repo,
            timer,
        })
    }

    /// Opens a SQLite-backed workspace on the system clock.
    pub fn open_sqlite(path: impl AsRef<Path>, config: CoreConfig) -> Result<Self, WorkspaceError> {
        let store = SqliteBlobStore::open(path)?;
        Self::open(Arc::new(store), Arc::new(SystemClock), config)
    }

    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.notifier.subscribe(sink);
    }

    pub fn repo(&self) -> &NoteRepository {
        &self.repo
    }

    pub fn repo_mut(&mut self) -> &mut NoteRepository {
        &mut self.repo
    }

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut SessionTimer {
        &mut self.timer
    }

    /// Runs every due timer callback and the autosave if due.
    pub fn poll(&mut self) -> PollOutcome {
        PollOutcome {
            timer_callbacks: self.timer.poll(),
            save: self.repo.poll(),
        }
    }

    /// Earliest instant at which `poll` has work to do.
    pub fn next_deadline_ms(&self) -> Option<i64> {
        match (self.repo.deadline_ms(), self.timer.next_deadline_ms()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Ends a running session and writes any unsaved note state.
    pub fn shutdown(&mut self) -> CoreResult<()> {
        self.timer.stop();
        let result = self.repo.flush();
        match &result {
            Ok(()) => info!("event=workspace_shutdown module=service status=ok"),
            Err(err) => error!(
                "event=workspace_shutdown module=service status=error error_code={}",
                err.code()
            ),
        }
        result
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("repo", &self.repo)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}
