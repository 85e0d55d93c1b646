//! Save-status state machine with debounced autosave and bounded retry.
//!
//! # Responsibility
//! - Expose `Saved/Unsaved/Saving/Failed` for UI indicators.
//! - Coalesce mutation bursts into one write via `Debouncer`.
//! - Retry a failed write a fixed number of times with a fixed delay.
//!
//! # Invariants
//! - At most one autosave is pending; scheduling again replaces it.
//! - Retries run sequentially inside the caller's `poll`/immediate-save call.
//! - Every status change is published as `CoreEvent::SaveStatusChanged`.

use crate::clock::Clock;
use crate::config::RetryPolicy;
use crate::events::{CoreEvent, Notifier};
use crate::schedule::Debouncer;
use crate::storage::{StorageError, StorageResult};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// UI-facing save status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    Unsaved,
    Saving,
    Failed(StorageError),
}

impl SaveStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Unsaved => "unsaved",
            Self::Saving => "saving",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

pub struct SaveStateMachine {
    clock: Arc<dyn Clock>,
    notifier: Notifier,
    debouncer: Debouncer<()>,
    autosave_delay: Duration,
    retry: RetryPolicy,
    status: SaveStatus,
    retry_count: u32,
}

impl SaveStateMachine {
    pub fn new(
        clock: Arc<dyn Clock>,
        notifier: Notifier,
        autosave_delay: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            debouncer: Debouncer::new(clock.clone()),
            clock,
            notifier,
            autosave_delay,
            retry,
            status: SaveStatus::Saved,
            retry_count: 0,
        }
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    /// Retries spent by the most recent save.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn deadline_ms(&self) -> Option<i64> {
        self.debouncer.deadline_ms()
    }

    /// `Saved -> Unsaved`; no-op in every other state.
    pub fn mark_unsaved(&mut self) {
        if self.status == SaveStatus::Saved {
            self.set_status(SaveStatus::Unsaved);
        }
    }

    /// Marks state dirty and (re)starts the autosave window.
    pub fn schedule_auto_save(&mut self) {
        self.mark_unsaved();
        self.debouncer.debounce((), self.autosave_delay);
        debug!(
            "event=autosave_scheduled module=persist status=pending delay_ms={}",
            self.autosave_delay.as_millis()
        );
    }

    /// Runs `op` if the autosave window has elapsed.
    ///
    /// Returns `None` when nothing was due.
    pub fn poll<F>(&mut self, op: F) -> Option<StorageResult<()>>
    where
        F: FnMut() -> StorageResult<()>,
    {
        self.debouncer.poll()?;
        Some(self.save_with_retry(op, "autosave"))
    }

    /// Cancels any pending autosave and runs `op` now.
    pub fn perform_immediate_save<F>(&mut self, op: F) -> StorageResult<()>
    where
        F: FnMut() -> StorageResult<()>,
    {
        self.debouncer.cancel();
        self.save_with_retry(op, "immediate")
    }

    /// Drops pending work and forces `Saved`. Used when the active entity
    /// changes and the old pending state must not be written.
    pub fn reset(&mut self) {
        self.debouncer.cancel();
        self.retry_count = 0;
        if self.status != SaveStatus::Saved {
            self.set_status(SaveStatus::Saved);
        }
    }

    fn save_with_retry<F>(&mut self, mut op: F, trigger: &'static str) -> StorageResult<()>
    where
        F: FnMut() -> StorageResult<()>,
    {
        let started_at = self.clock.now_ms();
        self.retry_count = 0;
        self.set_status(SaveStatus::Saving);

        let outcome = loop {
            match op() {
                Ok(()) => break Ok(()),
                Err(err) if self.retry_count < self.retry.max_retries => {
                    self.retry_count += 1;
                    warn!(
                        "event=save_retry module=persist status=retry trigger={} attempt={} max_retries={} error_kind={}",
                        trigger,
                        self.retry_count,
                        self.retry.max_retries,
                        err.kind.as_str()
                    );
                    self.clock.sleep(self.retry.delay());
                }
                Err(err) => break Err(err),
            }
        };

        let duration_ms = self.clock.now_ms().saturating_sub(started_at);
        match outcome {
            Ok(()) => {
                info!(
                    "event=save module=persist status=ok trigger={} retries={} duration_ms={}",
                    trigger, self.retry_count, duration_ms
                );
                self.set_status(SaveStatus::Saved);
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=save module=persist status=error trigger={} retries={} duration_ms={} error_kind={} error={}",
                    trigger,
                    self.retry_count,
                    duration_ms,
                    err.kind.as_str(),
                    err
                );
                self.set_status(SaveStatus::Failed(err.clone()));
                Err(err)
            }
        }
    }

    fn set_status(&mut self, status: SaveStatus) {
        self.status = status.clone();
        self.notifier.emit(CoreEvent::SaveStatusChanged(status));
    }
}

impl std::fmt::Debug for SaveStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveStateMachine")
            .field("status", &self.status)
            .field("retry_count", &self.retry_count)
            .field("pending", &self.debouncer.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{SaveStateMachine, SaveStatus};
    use crate::clock::{Clock, ManualClock};
    use crate::config::RetryPolicy;
    use crate::events::{CoreEvent, Notifier, RecordingSink};
    use crate::storage::{StorageError, StorageErrorKind};
    use std::sync::Arc;
    use std::time::Duration;

    fn machine(clock: Arc<ManualClock>, notifier: Notifier) -> SaveStateMachine {
        SaveStateMachine::new(
            clock,
            notifier,
            Duration::from_millis(500),
            RetryPolicy::default(),
        )
    }

    #[test]
    fn autosave_moves_through_unsaved_saving_saved() {
        let clock = Arc::new(ManualClock::new(0));
        let notifier = Notifier::new();
        let sink = Arc::new(RecordingSink::new());
        notifier.subscribe(sink.clone());
        let mut saves = machine(clock.clone(), notifier);

        saves.schedule_auto_save();
        assert_eq!(saves.status(), &SaveStatus::Unsaved);
        assert!(saves.poll(|| Ok(())).is_none());

        clock.advance_ms(500);
        assert_eq!(saves.poll(|| Ok(())), Some(Ok(())));
        assert_eq!(saves.status(), &SaveStatus::Saved);
        assert_eq!(
            sink.events(),
            vec![
                CoreEvent::SaveStatusChanged(SaveStatus::Unsaved),
                CoreEvent::SaveStatusChanged(SaveStatus::Saving),
                CoreEvent::SaveStatusChanged(SaveStatus::Saved),
            ]
        );
    }

    #[test]
    fn failure_retries_three_times_with_two_second_spacing() {
        let clock = Arc::new(ManualClock::new(0));
        let mut saves = machine(clock.clone(), Notifier::new());
        let mut attempts = Vec::new();

        let result = saves.perform_immediate_save(|| {
            attempts.push(clock.now_ms());
            Err(StorageError::io("offline"))
        });

        assert!(result.is_err());
        assert_eq!(attempts, vec![0, 2_000, 4_000, 6_000]);
        assert_eq!(saves.retry_count(), 3);
        assert!(saves.status().is_failed());
    }

    #[test]
    fn transient_failure_recovers_within_retry_budget() {
        let clock = Arc::new(ManualClock::new(0));
        let mut saves = machine(clock, Notifier::new());
        let mut remaining_failures = 2;

        let result = saves.perform_immediate_save(|| {
            if remaining_failures > 0 {
                remaining_failures -= 1;
                return Err(StorageError::new(StorageErrorKind::Io, "busy"));
            }
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(saves.retry_count(), 2);
        assert_eq!(saves.status(), &SaveStatus::Saved);
    }

    #[test]
    fn mark_unsaved_is_noop_outside_saved() {
        let clock = Arc::new(ManualClock::new(0));
        let mut saves = machine(clock, Notifier::new());
        let _ = saves.perform_immediate_save(|| Err(StorageError::io("down")));

        saves.mark_unsaved();
        assert!(saves.status().is_failed());
    }

    #[test]
    fn reset_cancels_pending_and_forces_saved() {
        let clock = Arc::new(ManualClock::new(0));
        let mut saves = machine(clock.clone(), Notifier::new());
        saves.schedule_auto_save();

        saves.reset();
        clock.advance_ms(10_000);
        assert!(saves.poll(|| panic!("reset must cancel the pending save")).is_none());
        assert_eq!(saves.status(), &SaveStatus::Saved);
        assert_eq!(saves.retry_count(), 0);
    }
}
