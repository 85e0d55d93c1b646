//! Focus session countdown state machine.
//!
//! # Responsibility
//! - Run the `Idle -> Running (-> Paused) -> Idle` session lifecycle.
//! - Watch typing inactivity and host focus loss, and prompt the user.
//! - Append every lifecycle event to the focus log and refold stats.
//!
//! # Invariants
//! - Timer callbacks only run inside `poll`, in deadline order.
//! - `stop`, `pause` and completion clear every pending callback, so no
//!   tick or completion fires after they return.
//! - At most one prompt is pending; inactivity is not watched while one is.
//! - Stats are refolded after each append of a stats-affecting event.
//!
//! # See also
//! - `focus::stats` for the fold and display helpers.
//! - `focus::store` for the durable layout.

use super::log::FocusLog;
use super::stats::{fold_stats, format_clock, range_stats};
use super::store::FocusLogStore;
use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::events::{CoreEvent, Notifier};
use crate::model::focus::{FocusEventType, FocusLogEntry, FocusStats, RangeStats, StatsRange};
use crate::persist::{SaveStateMachine, SaveStatus};
use crate::schedule::TimerQueue;
use crate::storage::BlobStore;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

const TICK_MS: i64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    /// Countdown suspended by `pause` or by a focus-loss prompt.
    Paused,
}

impl TimerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

/// Prompt the host must show and answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPrompt {
    /// Answer with `classify_pause`.
    TypingPause,
    /// Answer with `record_distraction`.
    DistractionReason,
    /// Answer with `resolve_focus_loss`.
    FocusLoss,
}

impl FocusPrompt {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TypingPause => "typing_pause",
            Self::DistractionReason => "distraction_reason",
            Self::FocusLoss => "focus_loss",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseKind {
    Thinking,
    Distracted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistractionOutcome {
    Resume,
    EndSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusLossChoice {
    Return,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    AlreadyRunning,
    NotIdle,
    NotPaused,
    InvalidDuration,
    NoPendingPrompt,
    PromptPending,
}

impl Display for TimerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::AlreadyRunning => "a focus session is already in progress",
            Self::NotIdle => "session duration can only change while idle",
            Self::NotPaused => "no paused session to resume",
            Self::InvalidDuration => "session duration must be positive",
            Self::NoPendingPrompt => "no matching prompt is pending",
            Self::PromptPending => "answer the pending prompt first",
        };
        write!(f, "{message}")
    }
}

impl Error for TimerError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerToken {
    Tick,
    InactivityCheck,
}

pub struct SessionTimer {
    clock: Arc<dyn Clock>,
    notifier: Notifier,
    log_store: FocusLogStore,
    saves: SaveStateMachine,
    log: FocusLog,
    stats: FocusStats,
    durations_secs: Vec<u32>,
    selected_index: usize,
    selected_secs: u32,
    remaining_secs: u32,
    state: TimerState,
    started_at_ms: Option<i64>,
    last_typing_ms: i64,
    inactivity_threshold_ms: i64,
    pending_prompt: Option<FocusPrompt>,
    queue: TimerQueue<TimerToken>,
}

impl SessionTimer {
    /// Loads the focus log and folds stats from it.
    ///
    /// The stored stats snapshot is not read back; it is derived data.
    pub fn load(
        store: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        notifier: Notifier,
        config: &CoreConfig,
    ) -> Self {
        let log_store = FocusLogStore::new(store, config.timer.focus_log_keep_on_truncate);
        let (log, source) = log_store.load(clock.as_ref());
        let stats = fold_stats(log.entries(), clock.now_ms());
        let durations_secs = config.timer.durations_secs.clone();
        let selected_secs = durations_secs.first().copied().unwrap_or(0);

        info!(
            "event=focus_load module=focus status=ok entries={} source={:?} sessions={}",
            log.len(),
            source,
            stats.total_sessions
        );

        // Focus writes surface as `FocusSaveStatusChanged`, not on the note
        // save indicator.
        let saves =
            SaveStateMachine::new(clock.clone(), Notifier::new(), Duration::ZERO, config.retry);

        Self {
            saves,
            last_typing_ms: clock.now_ms(),
            clock,
            notifier,
            log_store,
            log,
            stats,
            durations_secs,
            selected_index: 0,
            selected_secs,
            remaining_secs: selected_secs,
            state: TimerState::Idle,
            started_at_ms: None,
            inactivity_threshold_ms: i64::from(config.timer.inactivity_threshold_secs) * 1_000,
            pending_prompt: None,
            queue: TimerQueue::new(),
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn selected_duration_secs(&self) -> u32 {
        self.selected_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn started_at_ms(&self) -> Option<i64> {
        self.started_at_ms
    }

    pub fn pending_prompt(&self) -> Option<FocusPrompt> {
        self.pending_prompt
    }

    pub fn log(&self) -> &FocusLog {
        &self.log
    }

    pub fn stats(&self) -> &FocusStats {
        &self.stats
    }

    /// Status of the most recent focus log write.
    pub fn save_status(&self) -> &SaveStatus {
        self.saves.status()
    }

    pub fn range_stats(&self, range: StatsRange) -> RangeStats {
        range_stats(self.log.entries(), range, self.clock.now_ms())
    }

    /// Remaining time as `MM:SS`.
    pub fn formatted_remaining(&self) -> String {
        format_clock(self.remaining_secs)
    }

    /// Fraction of the selected duration already elapsed, `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.selected_secs == 0 {
            return 0.0;
        }
        let elapsed = self.selected_secs.saturating_sub(self.remaining_secs);
        f64::from(elapsed) / f64::from(self.selected_secs)
    }

    pub fn next_deadline_ms(&self) -> Option<i64> {
        self.queue.next_deadline()
    }

    /// Advances to the next configured duration. Only allowed while idle.
    pub fn cycle_duration(&mut self) -> Result<u32, TimerError> {
        if self.state != TimerState::Idle {
            return Err(TimerError::NotIdle);
        }
        if self.durations_secs.is_empty() {
            return Err(TimerError::InvalidDuration);
        }
        self.selected_index = (self.selected_index + 1) % self.durations_secs.len();
        self.selected_secs = self.durations_secs[self.selected_index];
        self.remaining_secs = self.selected_secs;
        debug!(
            "event=focus_cycle module=focus status=ok duration_secs={}",
            self.selected_secs
        );
        Ok(self.selected_secs)
    }

    /// Starts a session with the currently selected duration.
    pub fn start_selected(&mut self) -> Result<(), TimerError> {
        self.start(self.selected_secs)
    }

    pub fn start(&mut self, duration_secs: u32) -> Result<(), TimerError> {
        if self.state != TimerState::Idle {
            return Err(TimerError::AlreadyRunning);
        }
        if duration_secs == 0 {
            return Err(TimerError::InvalidDuration);
        }

        let now = self.clock.now_ms();
        self.selected_secs = duration_secs;
        self.remaining_secs = duration_secs;
        self.state = TimerState::Running;
        self.started_at_ms = Some(now);
        self.pending_prompt = None;
        self.record(
            FocusLogEntry::new(FocusEventType::SessionStart, now).with_duration(duration_secs),
            now,
        );
        self.arm(now);

        info!("event=focus_start module=focus status=ok duration_secs={duration_secs}");
        self.notifier.emit(CoreEvent::SessionStarted { duration_secs });
        Ok(())
    }

    /// Ends the session early. Returns the elapsed seconds, `None` when idle.
    pub fn stop(&mut self) -> Option<u32> {
        if self.state == TimerState::Idle {
            return None;
        }

        let now = self.clock.now_ms();
        let elapsed_secs = self.selected_secs.saturating_sub(self.remaining_secs);
        self.record(
            FocusLogEntry::new(FocusEventType::SessionEnd, now)
                .with_duration(elapsed_secs)
                .with_remaining(self.remaining_secs),
            now,
        );
        self.reset_to_idle();

        info!("event=focus_stop module=focus status=ok elapsed_secs={elapsed_secs}");
        self.notifier.emit(CoreEvent::SessionStopped { elapsed_secs });
        Some(elapsed_secs)
    }

    /// Suspends the countdown without ending the session.
    ///
    /// Returns `false` when no session is running.
    pub fn pause(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.queue.clear();
        self.state = TimerState::Paused;
        debug!(
            "event=focus_pause module=focus status=ok remaining_secs={}",
            self.remaining_secs
        );
        self.notifier.emit(CoreEvent::SessionPaused {
            remaining_secs: self.remaining_secs,
        });
        true
    }

    pub fn resume(&mut self) -> Result<(), TimerError> {
        if self.state != TimerState::Paused {
            return Err(TimerError::NotPaused);
        }
        if self.pending_prompt.is_some() {
            return Err(TimerError::PromptPending);
        }
        self.resume_countdown();
        Ok(())
    }

    /// Host keystroke signal.
    pub fn note_typing(&mut self) {
        self.last_typing_ms = self.clock.now_ms();
    }

    /// Host lost foreground focus. Suspends the countdown and prompts.
    ///
    /// An open typing-pause or distraction prompt is dropped; its
    /// `typing_pause` entry stays in the log unresolved.
    /// Returns `false` when no session is running.
    pub fn focus_lost(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        let now = self.clock.now_ms();
        if let Some(replaced) = self.pending_prompt {
            debug!(
                "event=focus_prompt_replaced module=focus status=ok replaced={} by=focus_loss",
                replaced.as_str()
            );
        }
        self.queue.clear();
        self.state = TimerState::Paused;
        self.pending_prompt = Some(FocusPrompt::FocusLoss);
        self.record(
            FocusLogEntry::new(FocusEventType::FocusLoss, now).with_remaining(self.remaining_secs),
            now,
        );
        self.notifier.emit(CoreEvent::FocusLossPrompt);
        true
    }

    /// Answers a focus-loss prompt.
    pub fn resolve_focus_loss(&mut self, choice: FocusLossChoice) -> Result<(), TimerError> {
        self.take_prompt(FocusPrompt::FocusLoss)?;
        match choice {
            FocusLossChoice::Return => {
                self.log_distraction_avoided("focus_return", None);
                self.resume_countdown();
            }
            FocusLossChoice::Cancel => {
                self.stop();
            }
        }
        Ok(())
    }

    /// Answers a typing-pause prompt.
    pub fn classify_pause(&mut self, kind: PauseKind) -> Result<(), TimerError> {
        self.take_prompt(FocusPrompt::TypingPause)?;
        match kind {
            PauseKind::Thinking => self.rearm_inactivity(),
            PauseKind::Distracted => {
                self.pending_prompt = Some(FocusPrompt::DistractionReason);
                self.notifier.emit(CoreEvent::DistractionReasonPrompt);
            }
        }
        Ok(())
    }

    /// Records what distracted the user, then resumes or ends the session.
    pub fn record_distraction(
        &mut self,
        reason: &str,
        outcome: DistractionOutcome,
    ) -> Result<(), TimerError> {
        self.take_prompt(FocusPrompt::DistractionReason)?;
        let now = self.clock.now_ms();
        self.record(
            FocusLogEntry::new(FocusEventType::Distraction, now)
                .with_reason(reason.trim())
                .with_remaining(self.remaining_secs),
            now,
        );
        match outcome {
            DistractionOutcome::Resume => self.rearm_inactivity(),
            DistractionOutcome::EndSession => {
                self.stop();
            }
        }
        Ok(())
    }

    /// Counts one distraction avoided, e.g. the user came back from another
    /// tab. `trigger` names the path that detected it.
    pub fn log_distraction_avoided(&mut self, trigger: &str, reason: Option<&str>) {
        let now = self.clock.now_ms();
        let label = match reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reason) => format!("{trigger}: {reason}"),
            None => trigger.to_string(),
        };
        let mut entry = FocusLogEntry::new(FocusEventType::SessionReturn, now).with_reason(label);
        if self.state != TimerState::Idle {
            entry = entry.with_remaining(self.remaining_secs);
        }
        self.record(entry, now);
        debug!("event=distraction_avoided module=focus status=ok trigger={trigger}");
    }

    /// Runs every timer callback due at the current time. Returns how many
    /// ran.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut fired = 0;
        while let Some((due_ms, token)) = self.queue.pop_due(now) {
            fired += 1;
            match token {
                TimerToken::Tick => self.on_tick(due_ms),
                TimerToken::InactivityCheck => self.on_inactivity_check(due_ms),
            }
        }
        fired
    }

    fn on_tick(&mut self, due_ms: i64) {
        if self.state != TimerState::Running {
            return;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        self.notifier.emit(CoreEvent::Tick {
            remaining_secs: self.remaining_secs,
        });
        if self.remaining_secs == 0 {
            self.complete(due_ms);
        } else {
            self.queue.schedule_at(due_ms + TICK_MS, TimerToken::Tick);
        }
    }

    fn on_inactivity_check(&mut self, due_ms: i64) {
        if self.state != TimerState::Running || self.pending_prompt.is_some() {
            return;
        }
        let idle_ms = due_ms - self.last_typing_ms;
        if idle_ms < self.inactivity_threshold_ms {
            self.queue.schedule_at(
                self.last_typing_ms + self.inactivity_threshold_ms,
                TimerToken::InactivityCheck,
            );
            return;
        }

        let idle_secs = u32::try_from(idle_ms / 1_000).unwrap_or(u32::MAX);
        self.pending_prompt = Some(FocusPrompt::TypingPause);
        self.record(
            FocusLogEntry::new(FocusEventType::TypingPause, due_ms)
                .with_remaining(self.remaining_secs),
            due_ms,
        );
        self.notifier.emit(CoreEvent::TypingPausePrompt { idle_secs });
    }

    fn complete(&mut self, at_ms: i64) {
        let duration_secs = self.selected_secs;
        self.record(
            FocusLogEntry::new(FocusEventType::SessionEnd, at_ms)
                .with_duration(duration_secs)
                .with_remaining(0),
            at_ms,
        );
        self.reset_to_idle();

        info!("event=focus_complete module=focus status=ok duration_secs={duration_secs}");
        self.notifier.emit(CoreEvent::SessionCompleted { duration_secs });
    }

    fn reset_to_idle(&mut self) {
        self.queue.clear();
        self.state = TimerState::Idle;
        self.remaining_secs = self.selected_secs;
        self.started_at_ms = None;
        self.pending_prompt = None;
    }

    fn resume_countdown(&mut self) {
        let now = self.clock.now_ms();
        self.state = TimerState::Running;
        self.arm(now);
        self.notifier.emit(CoreEvent::SessionResumed {
            remaining_secs: self.remaining_secs,
        });
    }

    /// Schedules the next tick and restarts the inactivity watch from `now`.
    fn arm(&mut self, now: i64) {
        self.queue.clear();
        self.queue.schedule_at(now + TICK_MS, TimerToken::Tick);
        self.last_typing_ms = now;
        self.queue
            .schedule_at(now + self.inactivity_threshold_ms, TimerToken::InactivityCheck);
    }

    fn rearm_inactivity(&mut self) {
        let now = self.clock.now_ms();
        self.last_typing_ms = now;
        if self.state == TimerState::Running {
            self.queue
                .schedule_at(now + self.inactivity_threshold_ms, TimerToken::InactivityCheck);
        }
    }

    fn take_prompt(&mut self, expected: FocusPrompt) -> Result<(), TimerError> {
        if self.pending_prompt != Some(expected) {
            return Err(TimerError::NoPendingPrompt);
        }
        self.pending_prompt = None;
        Ok(())
    }

    /// Appends `entry`, refolds stats when needed and writes both out.
    fn record(&mut self, entry: FocusLogEntry, at_ms: i64) {
        let affects_stats = entry.event_type.affects_stats();
        debug!(
            "event=focus_log_append module=focus status=ok event_type={}",
            entry.event_type.as_str()
        );
        self.log.append(entry);
        if affects_stats {
            self.stats = fold_stats(self.log.entries(), at_ms);
        }

        let status_before = self.saves.status().clone();
        let mut truncated = false;
        let (log_store, log, stats) = (&self.log_store, &mut self.log, &mut self.stats);
        let saved = self.saves.perform_immediate_save(|| {
            if log_store.persist_log(log)? > 0 {
                *stats = fold_stats(log.entries(), at_ms);
                truncated = true;
            }
            log_store.persist_stats(stats)
        });

        if affects_stats || truncated {
            self.notifier.emit(CoreEvent::StatsUpdated(self.stats.clone()));
        }
        if let Err(err) = &saved {
            warn!(
                "event=focus_log_write module=focus status=error error_kind={} log_len={}",
                err.kind.as_str(),
                self.log.len()
            );
        }
        if self.saves.status() != &status_before {
            self.notifier
                .emit(CoreEvent::FocusSaveStatusChanged(self.saves.status().clone()));
        }
    }
}

impl std::fmt::Debug for SessionTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTimer")
            .field("state", &self.state)
            .field("selected_secs", &self.selected_secs)
            .field("remaining_secs", &self.remaining_secs)
            .field("pending_prompt", &self.pending_prompt)
            .field("log_len", &self.log.len())
            .finish_non_exhaustive()
    }
}
