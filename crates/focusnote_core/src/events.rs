//! Outbound notification interface.
//!
//! # Responsibility
//! - Publish save-status and focus-session events to any number of
//!   subscribers without depending on a rendering framework.
//!
//! # Invariants
//! - Sinks are invoked synchronously on the caller's context, in
//!   subscription order.
//! - The subscriber list is not locked while sinks run, so a sink may
//!   subscribe further sinks without deadlocking.

use crate::model::focus::FocusStats;
use crate::persist::save_state::SaveStatus;
use std::sync::{Arc, Mutex, PoisonError};

/// Events emitted by the repository save pipeline and the session timer.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    SaveStatusChanged(SaveStatus),
    /// Status of focus log writes changed. Not emitted for the transient
    /// `Saving` step, so a healthy log stays silent.
    FocusSaveStatusChanged(SaveStatus),
    SessionStarted { duration_secs: u32 },
    Tick { remaining_secs: u32 },
    /// Countdown reached zero.
    SessionCompleted { duration_secs: u32 },
    /// Session ended early by the user or by a prompt resolution.
    SessionStopped { elapsed_secs: u32 },
    SessionPaused { remaining_secs: u32 },
    SessionResumed { remaining_secs: u32 },
    /// Ask the user whether the typing pause is thinking or a distraction.
    TypingPausePrompt { idle_secs: u32 },
    /// Ask the user what distracted them.
    DistractionReasonPrompt,
    /// Ask the user to return to the session or cancel it.
    FocusLossPrompt,
    StatsUpdated(FocusStats),
}

/// Subscriber contract.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &CoreEvent);
}

/// Shared fan-out list of sinks. Clones share the same subscriber list.
#[derive(Clone, Default)]
pub struct Notifier {
    sinks: Arc<Mutex<Vec<Arc<dyn EventSink>>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn emit(&self, event: CoreEvent) {
        let sinks = self
            .sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for sink in sinks {
            sink.on_event(&event);
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Sink that stores every event; used by tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CoreEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CoreEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns and clears the recorded events.
    pub fn take(&self) -> Vec<CoreEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &CoreEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreEvent, Notifier, RecordingSink};
    use std::sync::Arc;

    #[test]
    fn clones_share_subscribers_and_deliver_in_order() {
        let notifier = Notifier::new();
        let clone = notifier.clone();
        let sink = Arc::new(RecordingSink::new());
        notifier.subscribe(sink.clone());

        clone.emit(CoreEvent::DistractionReasonPrompt);
        clone.emit(CoreEvent::FocusLossPrompt);

        assert_eq!(
            sink.take(),
            vec![CoreEvent::DistractionReasonPrompt, CoreEvent::FocusLossPrompt]
        );
        assert!(sink.events().is_empty());
    }
}
