//! Statistics folded from the focus log, plus display formatting.
//!
//! # Invariants
//! - Every function here is pure; results depend only on the entries and
//!   the `now_ms` passed in.
//! - Range windows are evaluated at query time, never maintained
//!   incrementally.

use crate::model::focus::{FocusEventType, FocusLogEntry, FocusStats, RangeStats, StatsRange};

const DAY_MS: i64 = 24 * 60 * 60 * 1_000;

/// Folds the whole log into aggregate statistics.
pub fn fold_stats(entries: &[FocusLogEntry], now_ms: i64) -> FocusStats {
    let mut stats = FocusStats {
        last_updated: now_ms,
        ..FocusStats::default()
    };
    for entry in entries {
        match entry.event_type {
            FocusEventType::SessionEnd => {
                stats.total_sessions += 1;
                stats.total_focus_time += u64::from(entry.session_duration.unwrap_or(0));
            }
            FocusEventType::Distraction => stats.total_distractions += 1,
            FocusEventType::SessionReturn => stats.distractions_avoided += 1,
            FocusEventType::SessionStart
            | FocusEventType::FocusLoss
            | FocusEventType::TypingPause => {}
        }
    }
    stats.average_session_length = average(stats.total_focus_time, stats.total_sessions);
    stats
}

/// First instant (inclusive) covered by `range` at `now_ms`.
pub fn range_start_ms(range: StatsRange, now_ms: i64) -> i64 {
    match range {
        StatsRange::Today => now_ms - now_ms.rem_euclid(DAY_MS),
        StatsRange::Last7Days => now_ms - 7 * DAY_MS,
        StatsRange::Last30Days => now_ms - 30 * DAY_MS,
    }
}

/// Session totals for `session_end` entries inside `range`.
pub fn range_stats(entries: &[FocusLogEntry], range: StatsRange, now_ms: i64) -> RangeStats {
    let start_ms = range_start_ms(range, now_ms);
    let (focus_time, sessions) = entries
        .iter()
        .filter(|entry| entry.event_type == FocusEventType::SessionEnd)
        .filter(|entry| entry.timestamp >= start_ms && entry.timestamp <= now_ms)
        .fold((0u64, 0u32), |(time, count), entry| {
            (
                time + u64::from(entry.session_duration.unwrap_or(0)),
                count + 1,
            )
        });
    RangeStats {
        range,
        focus_time,
        sessions,
        average_session_length: average(focus_time, sessions),
    }
}

/// `"1h 05m"` from one hour up, `"12m"` below it.
pub fn format_focus_time(secs: u64) -> String {
    let hours = secs / 3_600;
    let minutes = (secs % 3_600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

/// Countdown display, `MM:SS`.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn average(total: u64, count: u32) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / f64::from(count)
    }
}

#[cfg(test)]
mod tests {
    use super::{fold_stats, format_clock, format_focus_time, range_stats, DAY_MS};
    use crate::model::focus::{FocusEventType, FocusLogEntry, StatsRange};

    fn session_end(ts: i64, secs: u32) -> FocusLogEntry {
        FocusLogEntry::new(FocusEventType::SessionEnd, ts).with_duration(secs)
    }

    #[test]
    fn fold_counts_each_event_kind() {
        let entries = vec![
            FocusLogEntry::new(FocusEventType::SessionStart, 0).with_duration(300),
            FocusLogEntry::new(FocusEventType::Distraction, 1).with_reason("phone"),
            FocusLogEntry::new(FocusEventType::SessionReturn, 2),
            session_end(3, 300),
            session_end(4, 100),
        ];

        let stats = fold_stats(&entries, 10);
        assert_eq!(stats.total_focus_time, 400);
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_distractions, 1);
        assert_eq!(stats.distractions_avoided, 1);
        assert_eq!(stats.average_session_length, 200.0);
        assert_eq!(stats.last_updated, 10);
    }

    #[test]
    fn empty_log_has_zero_average() {
        assert_eq!(fold_stats(&[], 0).average_session_length, 0.0);
    }

    #[test]
    fn today_starts_at_utc_midnight() {
        let now = 10 * DAY_MS + 3_600_000;
        let entries = vec![
            session_end(10 * DAY_MS - 1, 60),
            session_end(10 * DAY_MS, 120),
            session_end(now, 180),
        ];

        let today = range_stats(&entries, StatsRange::Today, now);
        assert_eq!((today.sessions, today.focus_time), (2, 300));

        let week = range_stats(&entries, StatsRange::Last7Days, now);
        assert_eq!(week.sessions, 3);
    }

    #[test]
    fn formats_display_values() {
        assert_eq!(format_focus_time(0), "0m");
        assert_eq!(format_focus_time(12 * 60 + 59), "12m");
        assert_eq!(format_focus_time(3_600 + 5 * 60), "1h 05m");
        assert_eq!(format_clock(300), "05:00");
        assert_eq!(format_clock(61), "01:01");
    }
}
