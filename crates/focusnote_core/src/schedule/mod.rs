//! Deterministic scheduling primitives.
//!
//! # Responsibility
//! - Provide a single-slot debouncer and a min-heap timer queue driven by the
//!   injected `Clock`.
//! - Hand due work back to the owner through `poll`, so callbacks always run
//!   on the owner's context and never on a background thread.
//!
//! # Invariants
//! - Nothing fires without an explicit `poll`.
//! - Cancelled work is never returned by `poll`.

pub mod debounce;
pub mod timer_queue;

pub use debounce::Debouncer;
pub use timer_queue::{TimerId, TimerQueue};
