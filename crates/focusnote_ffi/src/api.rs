//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose note, category and focus-session operations to Dart via FRB.
//! - Own the single process-wide `Workspace` and serialize calls through it.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Failures are reported in envelopes (`ok`, `error_code`, `message`),
//!   never as panics.
//! - Ids cross the boundary as UUID strings.

use focusnote_core::focus::format_focus_time;
use focusnote_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Category, CoreConfig, CoreError, DistractionOutcome, FocusLossChoice, Note,
    PauseKind, StatsRange, Workspace,
};
use log::{error, info};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError};
use uuid::Uuid;

const DATA_FILE_NAME: &str = "focusnote.sqlite3";
const DATA_PATH_ENV: &str = "FOCUSNOTE_DATA_PATH";
static DATA_PATH: OnceLock<PathBuf> = OnceLock::new();
static WORKSPACE: OnceLock<Mutex<Workspace>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and an error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Note projection for Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteItem {
    pub id: String,
    pub title: String,
    pub body: String,
    pub category_id: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub modified_at: i64,
}

/// Category projection for Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryItem {
    pub id: String,
    pub name: String,
    pub icon_ref: String,
    pub created_at: i64,
    pub note_count: u32,
}

/// Result envelope for single-note operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteResponse {
    pub ok: bool,
    /// Stable machine-readable code on failure (`not_found`, `save_failed`, ...).
    pub error_code: Option<String>,
    pub message: String,
    pub note: Option<NoteItem>,
}

/// Result envelope for single-category operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryResponse {
    pub ok: bool,
    pub error_code: Option<String>,
    pub message: String,
    pub category: Option<CategoryItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteListResponse {
    pub items: Vec<NoteItem>,
    pub message: String,
}

/// Generic action envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub error_code: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            error_code: None,
            message: message.into(),
        }
    }

    fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Read-only countdown display values.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusSnapshot {
    /// `idle|running|paused`.
    pub state: String,
    pub selected_duration_secs: u32,
    pub remaining_secs: u32,
    /// `MM:SS`.
    pub formatted_remaining: String,
    pub progress: f64,
    /// `typing_pause|distraction_reason|focus_loss` when a prompt is open.
    pub pending_prompt: Option<String>,
    /// Epoch milliseconds; `None` while idle.
    pub started_at_ms: Option<i64>,
    /// Focus log write status, `saved|failed`.
    pub save_status: String,
}

/// Aggregate and range focus statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusStatsResponse {
    pub total_focus_time: u64,
    /// `"1h 05m"` style label.
    pub formatted_focus_time: String,
    pub total_sessions: u32,
    pub total_distractions: u32,
    pub distractions_avoided: u32,
    pub average_session_length: f64,
    pub today_focus_time: u64,
    pub last_7_days_focus_time: u64,
    pub last_30_days_focus_time: u64,
}

/// Outcome of one host-driven poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResponse {
    /// `saved|unsaved|saving|failed`.
    pub save_status: String,
    /// Focus log write status, `saved|failed`.
    pub focus_save_status: String,
    pub timer_callbacks: u32,
    /// When the host should poll again; `None` when nothing is scheduled.
    pub next_deadline_ms: Option<i64>,
    pub message: String,
}

/// Creates an empty note in `category_id`.
///
/// # FFI contract
/// - Sync call; the write itself is debounced until `workspace_poll`.
#[flutter_rust_bridge::frb(sync)]
pub fn note_create(category_id: String) -> NoteResponse {
    note_call("note_create", |workspace| {
        let category_id = parse_id(&category_id)?;
        workspace.repo_mut().create(category_id).map_err(CallError::from)
    })
}

/// Replaces title, body and category of an existing note.
#[flutter_rust_bridge::frb(sync)]
pub fn note_update(id: String, title: String, body: String, category_id: String) -> NoteResponse {
    note_call("note_update", |workspace| {
        let id = parse_id(&id)?;
        let category_id = parse_id(&category_id)?;
        let mut note = workspace
            .repo()
            .get(id)
            .cloned()
            .ok_or_else(|| CallError::from(CoreError::note_not_found(id)))?;
        note.title = title;
        note.body = body;
        note.category_id = category_id;
        workspace.repo_mut().update(note).map_err(CallError::from)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn note_delete(id: String) -> NoteResponse {
    note_call("note_delete", |workspace| {
        let id = parse_id(&id)?;
        workspace.repo_mut().delete(id).map_err(CallError::from)
    })
}

/// Lists notes of one category, most recently modified first.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_list(category_id: String) -> NoteListResponse {
    list_call("notes_list", |workspace| {
        let category_id = parse_id(&category_id)?;
        Ok(workspace.repo_mut().list_by_category(category_id))
    })
}

/// Title/body substring search. Blank queries return no items.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_search(query: String) -> NoteListResponse {
    list_call("notes_search", |workspace| Ok(workspace.repo().search(&query)))
}

#[flutter_rust_bridge::frb(sync)]
pub fn categories_list() -> Vec<CategoryItem> {
    with_workspace(|workspace| {
        let repo = workspace.repo();
        repo.categories()
            .iter()
            .map(|category| to_category_item(category, repo.note_count(category.id)))
            .collect()
    })
    .unwrap_or_default()
}

/// Creates a category; validation failures carry their error code.
#[flutter_rust_bridge::frb(sync)]
pub fn category_create(name: String, icon: String) -> CategoryResponse {
    category_call("category_create", |workspace| {
        workspace
            .repo_mut()
            .create_category(&name, &icon)
            .map_err(CallError::from)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn category_rename(id: String, name: String) -> CategoryResponse {
    category_call("category_rename", |workspace| {
        let id = parse_id(&id)?;
        workspace
            .repo_mut()
            .rename_category(id, &name)
            .map_err(CallError::from)
    })
}

/// Deletes a category. On success `category` holds the fallback that
/// received its notes.
#[flutter_rust_bridge::frb(sync)]
pub fn category_delete(id: String) -> CategoryResponse {
    category_call("category_delete", |workspace| {
        let id = parse_id(&id)?;
        workspace
            .repo_mut()
            .delete_category(id)
            .map_err(CallError::from)
    })
}

/// Starts a session. `None` uses the currently selected duration.
#[flutter_rust_bridge::frb(sync)]
pub fn focus_start(duration_secs: Option<u32>) -> ActionResponse {
    action_call("focus_start", |workspace| {
        let timer = workspace.timer_mut();
        let started = match duration_secs {
            Some(secs) => timer.start(secs),
            None => timer.start_selected(),
        };
        started.map_err(CallError::timer)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn focus_stop() -> ActionResponse {
    action_call("focus_stop", |workspace| {
        workspace.timer_mut().stop();
        Ok(())
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn focus_pause() -> ActionResponse {
    action_call("focus_pause", |workspace| {
        if workspace.timer_mut().pause() {
            Ok(())
        } else {
            Err(CallError::new("not_running", "no running session to pause"))
        }
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn focus_resume() -> ActionResponse {
    action_call("focus_resume", |workspace| {
        workspace.timer_mut().resume().map_err(CallError::timer)
    })
}

/// Advances to the next preset duration while idle.
#[flutter_rust_bridge::frb(sync)]
pub fn focus_cycle_duration() -> ActionResponse {
    action_call("focus_cycle_duration", |workspace| {
        workspace
            .timer_mut()
            .cycle_duration()
            .map(|_| ())
            .map_err(CallError::timer)
    })
}

/// Keystroke signal for the inactivity watch.
#[flutter_rust_bridge::frb(sync)]
pub fn focus_note_typing() {
    let _ = with_workspace(|workspace| workspace.timer_mut().note_typing());
}

/// Host window lost foreground focus.
#[flutter_rust_bridge::frb(sync)]
pub fn focus_lost() -> bool {
    with_workspace(|workspace| workspace.timer_mut().focus_lost()).unwrap_or(false)
}

#[flutter_rust_bridge::frb(sync)]
pub fn focus_resolve_loss(return_to_session: bool) -> ActionResponse {
    let choice = if return_to_session {
        FocusLossChoice::Return
    } else {
        FocusLossChoice::Cancel
    };
    action_call("focus_resolve_loss", |workspace| {
        workspace
            .timer_mut()
            .resolve_focus_loss(choice)
            .map_err(CallError::timer)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn focus_classify_pause(distracted: bool) -> ActionResponse {
    let kind = if distracted {
        PauseKind::Distracted
    } else {
        PauseKind::Thinking
    };
    action_call("focus_classify_pause", |workspace| {
        workspace
            .timer_mut()
            .classify_pause(kind)
            .map_err(CallError::timer)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn focus_record_distraction(reason: String, end_session: bool) -> ActionResponse {
    let outcome = if end_session {
        DistractionOutcome::EndSession
    } else {
        DistractionOutcome::Resume
    };
    action_call("focus_record_distraction", |workspace| {
        workspace
            .timer_mut()
            .record_distraction(&reason, outcome)
            .map_err(CallError::timer)
    })
}

/// Counts one distraction avoided (tab change, explicit return).
#[flutter_rust_bridge::frb(sync)]
pub fn focus_log_distraction_avoided(trigger: String, reason: Option<String>) -> ActionResponse {
    action_call("focus_log_distraction_avoided", |workspace| {
        workspace
            .timer_mut()
            .log_distraction_avoided(trigger.trim(), reason.as_deref());
        Ok(())
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn focus_snapshot() -> Option<FocusSnapshot> {
    with_workspace(|workspace| {
        let timer = workspace.timer();
        FocusSnapshot {
            state: timer.state().as_str().to_string(),
            selected_duration_secs: timer.selected_duration_secs(),
            remaining_secs: timer.remaining_secs(),
            formatted_remaining: timer.formatted_remaining(),
            progress: timer.progress(),
            pending_prompt: timer.pending_prompt().map(|prompt| prompt.as_str().to_string()),
            started_at_ms: timer.started_at_ms(),
            save_status: timer.save_status().label().to_string(),
        }
    })
    .ok()
}

#[flutter_rust_bridge::frb(sync)]
pub fn focus_stats() -> Option<FocusStatsResponse> {
    with_workspace(|workspace| {
        let timer = workspace.timer();
        let stats = timer.stats();
        FocusStatsResponse {
            total_focus_time: stats.total_focus_time,
            formatted_focus_time: format_focus_time(stats.total_focus_time),
            total_sessions: stats.total_sessions,
            total_distractions: stats.total_distractions,
            distractions_avoided: stats.distractions_avoided,
            average_session_length: stats.average_session_length,
            today_focus_time: timer.range_stats(StatsRange::Today).focus_time,
            last_7_days_focus_time: timer.range_stats(StatsRange::Last7Days).focus_time,
            last_30_days_focus_time: timer.range_stats(StatsRange::Last30Days).focus_time,
        }
    })
    .ok()
}

/// Runs due timer callbacks and the pending autosave.
///
/// # FFI contract
/// - Hosts call this from their UI loop, at the latest by
///   `next_deadline_ms`.
/// - May block for the bounded retry window when writes fail.
#[flutter_rust_bridge::frb(sync)]
pub fn workspace_poll() -> PollResponse {
    match with_workspace(|workspace| {
        let outcome = workspace.poll();
        let message = match &outcome.save {
            Some(Err(err)) => err.to_string(),
            _ => String::new(),
        };
        PollResponse {
            save_status: workspace.repo().save_status().label().to_string(),
            focus_save_status: workspace.timer().save_status().label().to_string(),
            timer_callbacks: u32::try_from(outcome.timer_callbacks).unwrap_or(u32::MAX),
            next_deadline_ms: workspace.next_deadline_ms(),
            message,
        }
    }) {
        Ok(response) => response,
        Err(err) => PollResponse {
            save_status: "failed".to_string(),
            focus_save_status: "failed".to_string(),
            timer_callbacks: 0,
            next_deadline_ms: None,
            message: err.message,
        },
    }
}

/// `saved|unsaved|saving|failed` for the note save indicator.
#[flutter_rust_bridge::frb(sync)]
pub fn save_status() -> String {
    with_workspace(|workspace| workspace.repo().save_status().label().to_string())
        .unwrap_or_else(|_| "failed".to_string())
}

/// Writes pending note state now (app pause / shutdown).
#[flutter_rust_bridge::frb(sync)]
pub fn workspace_flush() -> ActionResponse {
    action_call("workspace_flush", |workspace| {
        workspace.repo_mut().flush().map_err(CallError::from)
    })
}

struct CallError {
    code: String,
    message: String,
}

impl CallError {
    fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    fn timer(err: focusnote_core::TimerError) -> Self {
        Self::new("timer_rejected", err.to_string())
    }
}

impl From<CoreError> for CallError {
    fn from(value: CoreError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}

fn note_call(
    op: &'static str,
    f: impl FnOnce(&mut Workspace) -> Result<Note, CallError>,
) -> NoteResponse {
    match with_workspace(f).and_then(|result| result) {
        Ok(note) => NoteResponse {
            ok: true,
            error_code: None,
            message: format!("{op} ok"),
            note: Some(to_note_item(&note)),
        },
        Err(err) => NoteResponse {
            ok: false,
            error_code: Some(err.code),
            message: format!("{op} failed: {}", err.message),
            note: None,
        },
    }
}

fn category_call(
    op: &'static str,
    f: impl FnOnce(&mut Workspace) -> Result<Category, CallError>,
) -> CategoryResponse {
    let result = with_workspace(|workspace| {
        f(workspace).map(|category| {
            let count = workspace.repo().note_count(category.id);
            to_category_item(&category, count)
        })
    })
    .and_then(|result| result);
    match result {
        Ok(category) => CategoryResponse {
            ok: true,
            error_code: None,
            message: format!("{op} ok"),
            category: Some(category),
        },
        Err(err) => CategoryResponse {
            ok: false,
            error_code: Some(err.code),
            message: format!("{op} failed: {}", err.message),
            category: None,
        },
    }
}

fn list_call(
    op: &'static str,
    f: impl FnOnce(&mut Workspace) -> Result<Vec<Note>, CallError>,
) -> NoteListResponse {
    match with_workspace(f).and_then(|result| result) {
        Ok(notes) => NoteListResponse {
            message: format!("{} note(s).", notes.len()),
            items: notes.iter().map(to_note_item).collect(),
        },
        Err(err) => NoteListResponse {
            items: Vec::new(),
            message: format!("{op} failed: {}", err.message),
        },
    }
}

fn action_call(
    op: &'static str,
    f: impl FnOnce(&mut Workspace) -> Result<(), CallError>,
) -> ActionResponse {
    match with_workspace(f).and_then(|result| result) {
        Ok(()) => ActionResponse::success(format!("{op} ok")),
        Err(err) => ActionResponse::failure(err.code, format!("{op} failed: {}", err.message)),
    }
}

fn with_workspace<T>(f: impl FnOnce(&mut Workspace) -> T) -> Result<T, CallError> {
    let workspace = shared_workspace()?;
    let mut guard = workspace.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(f(&mut guard))
}

fn shared_workspace() -> Result<&'static Mutex<Workspace>, CallError> {
    if let Some(existing) = WORKSPACE.get() {
        return Ok(existing);
    }

    let path = resolve_data_path();
    let opened = Workspace::open_sqlite(&path, CoreConfig::default()).map_err(|err| {
        error!(
            "event=ffi_workspace_open module=ffi status=error path={} error={}",
            path.display(),
            err
        );
        CallError::new("workspace_unavailable", err.to_string())
    })?;
    info!(
        "event=ffi_workspace_open module=ffi status=ok path={}",
        path.display()
    );
    // A concurrent first call may have won the race; its workspace is kept.
    let _ = WORKSPACE.set(Mutex::new(opened));
    WORKSPACE
        .get()
        .ok_or_else(|| CallError::new("workspace_unavailable", "workspace not initialized"))
}

fn resolve_data_path() -> PathBuf {
    DATA_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DATA_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DATA_FILE_NAME)
        })
        .clone()
}

fn parse_id(raw: &str) -> Result<Uuid, CallError> {
    Uuid::parse_str(raw.trim())
        .map_err(|err| CallError::new("invalid_id", format!("invalid id `{raw}`: {err}")))
}

fn to_note_item(note: &Note) -> NoteItem {
    NoteItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        body: note.body.clone(),
        category_id: note.category_id.to_string(),
        created_at: note.created_at,
        modified_at: note.modified_at,
    }
}

fn to_category_item(category: &Category, note_count: usize) -> CategoryItem {
    CategoryItem {
        id: category.id.to_string(),
        name: category.name.clone(),
        icon_ref: category.icon_ref.clone(),
        created_at: category.created_at,
        note_count: u32::try_from(note_count).unwrap_or(u32::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        categories_list, category_create, category_delete, core_version, init_logging,
        note_create, note_update, notes_list, notes_search, ping, workspace_flush,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn note_lifecycle_through_envelopes() {
        let token = unique_token("ffi-note");
        let category = category_create(token.clone(), String::new());
        assert!(category.ok, "{}", category.message);
        let category_id = category.category.expect("category item").id;

        let created = note_create(category_id.clone());
        assert!(created.ok, "{}", created.message);
        let note_id = created.note.expect("note item").id;

        let updated = note_update(
            note_id.clone(),
            format!("title {token}"),
            "body".to_string(),
            category_id.clone(),
        );
        assert!(updated.ok, "{}", updated.message);

        let listed = notes_list(category_id.clone());
        assert_eq!(listed.items.len(), 1);
        assert!(notes_search(token.clone())
            .items
            .iter()
            .any(|item| item.id == note_id));
        assert!(workspace_flush().ok);

        let deleted = category_delete(category_id.clone());
        assert!(deleted.ok, "{}", deleted.message);
        assert!(categories_list().iter().all(|item| item.id != category_id));
    }

    #[test]
    fn invalid_input_reports_error_codes() {
        let bad_id = note_create("not-a-uuid".to_string());
        assert_eq!(bad_id.error_code.as_deref(), Some("invalid_id"));

        let bad_name = category_create("a/b".to_string(), String::new());
        assert_eq!(bad_name.error_code.as_deref(), Some("invalid_chars"));
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
