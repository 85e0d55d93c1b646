//! Single-slot debouncer.
//!
//! A burst of `debounce` calls keeps only the most recent action and pushes
//! its deadline out, so the owner sees exactly one fire per quiet window.

use crate::clock::{duration_to_ms, Clock};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct PendingAction<A> {
    action: A,
    due_ms: i64,
}

/// Holds at most one pending action.
pub struct Debouncer<A> {
    clock: Arc<dyn Clock>,
    pending: Option<PendingAction<A>>,
}

impl<A> Debouncer<A> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            pending: None,
        }
    }

    /// Schedules `action` to fire after `delay`, replacing any pending one.
    ///
    /// Returns the replaced action, which will never fire.
    pub fn debounce(&mut self, action: A, delay: Duration) -> Option<A> {
        let due_ms = self.clock.now_ms().saturating_add(duration_to_ms(delay));
        self.pending
            .replace(PendingAction { action, due_ms })
            .map(|replaced| replaced.action)
    }

    /// Discards the pending action without running it.
    pub fn cancel(&mut self) -> Option<A> {
        self.pending.take().map(|pending| pending.action)
    }

    /// Takes the pending action once its deadline has passed.
    pub fn poll(&mut self) -> Option<A> {
        let due_ms = self.deadline_ms()?;
        if due_ms <= self.clock.now_ms() {
            self.cancel()
        } else {
            None
        }
    }

    /// Takes the pending action immediately, ignoring its deadline.
    pub fn flush(&mut self) -> Option<A> {
        self.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Epoch ms at which the pending action becomes due.
    pub fn deadline_ms(&self) -> Option<i64> {
        self.pending.as_ref().map(|pending| pending.due_ms)
    }
}

impl<A> std::fmt::Debug for Debouncer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("deadline_ms", &self.deadline_ms())
            .finish()
    }
}
