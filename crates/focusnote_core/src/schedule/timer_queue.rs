//! Min-heap of pending timer callbacks keyed by deadline.
//!
//! Payloads are plain values; the owner interprets them when `pop_due`
//! hands them back. Cancellation is lazy: the heap keeps the slot until it
//! surfaces, but its payload is already gone.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Handle returned by `schedule_at`, used to cancel one timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Slot {
    due_ms: i64,
    // Insertion order breaks deadline ties.
    id: TimerId,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<Slot>>,
    payloads: HashMap<TimerId, T>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            payloads: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_at(&mut self, due_ms: i64, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.heap.push(Reverse(Slot { due_ms, id }));
        self.payloads.insert(id, payload);
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        self.payloads.remove(&id)
    }

    /// Cancels every pending timer.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.payloads.clear();
    }

    /// Pops the earliest live timer whose deadline is `<= now_ms`.
    ///
    /// Returns `(deadline, payload)`.
    pub fn pop_due(&mut self, now_ms: i64) -> Option<(i64, T)> {
        while let Some(Reverse(slot)) = self.heap.peek().copied() {
            if !self.payloads.contains_key(&slot.id) {
                self.heap.pop();
                continue;
            }
            if slot.due_ms > now_ms {
                return None;
            }
            self.heap.pop();
            return self
                .payloads
                .remove(&slot.id)
                .map(|payload| (slot.due_ms, payload));
        }
        None
    }

    /// Earliest live deadline.
    pub fn next_deadline(&self) -> Option<i64> {
        self.heap
            .iter()
            .filter(|Reverse(slot)| self.payloads.contains_key(&slot.id))
            .map(|Reverse(slot)| slot.due_ms)
            .min()
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}
