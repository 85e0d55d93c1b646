//! Focus-session log records and derived statistics.
//!
//! # Responsibility
//! - Define the append-only `FocusLogEntry` record.
//! - Define the `FocusStats` and `RangeStats` projections folded from the log.
//!
//! # Invariants
//! - Entries are never mutated after construction by the timer.
//! - `FocusStats` is a cache of `fold(log)`; the log is the source of truth.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a focus log event. Serialized in camelCase (`sessionStart`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FocusEventType {
    SessionStart,
    SessionEnd,
    FocusLoss,
    TypingPause,
    Distraction,
    /// User came back after a focus loss; counted as a distraction avoided.
    SessionReturn,
}

impl FocusEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
            Self::FocusLoss => "focus_loss",
            Self::TypingPause => "typing_pause",
            Self::Distraction => "distraction",
            Self::SessionReturn => "session_return",
        }
    }

    /// Whether appending this event changes `FocusStats`.
    pub fn affects_stats(self) -> bool {
        matches!(
            self,
            Self::SessionEnd | Self::Distraction | Self::SessionReturn
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusLogEntry {
    pub id: Uuid,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub event_type: FocusEventType,
    /// Seconds. Set on `SessionStart` (planned) and `SessionEnd` (actual).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distraction_reason: Option<String>,
    /// Seconds left on the countdown when the event happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_time: Option<u32>,
}

impl FocusLogEntry {
    pub fn new(event_type: FocusEventType, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            event_type,
            session_duration: None,
            distraction_reason: None,
            remaining_time: None,
        }
    }

    pub fn with_duration(mut self, secs: u32) -> Self {
        self.session_duration = Some(secs);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.distraction_reason = Some(reason.into());
        self
    }

    pub fn with_remaining(mut self, secs: u32) -> Self {
        self.remaining_time = Some(secs);
        self
    }
}

/// Aggregate focus statistics folded from the full log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusStats {
    /// Seconds.
    pub total_focus_time: u64,
    pub total_sessions: u32,
    pub total_distractions: u32,
    pub distractions_avoided: u32,
    /// Seconds; `0.0` when no session has ended.
    pub average_session_length: f64,
    /// Epoch milliseconds of the last recompute.
    pub last_updated: i64,
}

/// Query window for time-range statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatsRange {
    /// Since 00:00 UTC of the current day.
    Today,
    Last7Days,
    Last30Days,
}

/// Session totals restricted to one `StatsRange`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeStats {
    pub range: StatsRange,
    /// Seconds.
    pub focus_time: u64,
    pub sessions: u32,
    /// Seconds.
    pub average_session_length: f64,
}
