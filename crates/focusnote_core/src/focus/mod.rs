//! Focus session timer and its event-sourced log.
//!
//! # Responsibility
//! - Drive the countdown, inactivity and focus-loss state machine.
//! - Keep the append-only focus log and fold statistics from it.
//!
//! # Invariants
//! - `FocusStats` always equals `fold_stats(log)` after a recompute.
//! - Log entries are only appended; truncation happens solely when the
//!   backup write fails.

pub mod log;
pub mod stats;
pub mod store;
pub mod timer;

pub use self::log::FocusLog;
pub use stats::{fold_stats, format_clock, format_focus_time, range_stats};
pub use store::FocusLogStore;
pub use timer::{
    DistractionOutcome, FocusLossChoice, FocusPrompt, PauseKind, SessionTimer, TimerError,
    TimerState,
};
