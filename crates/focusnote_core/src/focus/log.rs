//! Append-only focus event log.

use crate::model::focus::{FocusEventType, FocusLogEntry};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FocusLog {
    entries: Vec<FocusLogEntry>,
}

impl FocusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<FocusLogEntry>) -> Self {
        Self { entries }
    }

    pub fn append(&mut self, entry: FocusLogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[FocusLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&FocusLogEntry> {
        self.entries.last()
    }

    pub fn count(&self, event_type: FocusEventType) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.event_type == event_type)
            .count()
    }

    /// Keeps only the `keep` most recent entries. Returns how many were
    /// dropped.
    pub fn truncate_to_recent(&mut self, keep: usize) -> usize {
        let dropped = self.entries.len().saturating_sub(keep);
        self.entries.drain(..dropped);
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::FocusLog;
    use crate::model::focus::{FocusEventType, FocusLogEntry};

    #[test]
    fn truncate_keeps_most_recent_entries() {
        let mut log = FocusLog::new();
        for ts in 0..5 {
            log.append(FocusLogEntry::new(FocusEventType::TypingPause, ts));
        }

        assert_eq!(log.truncate_to_recent(2), 3);
        let kept = log.entries().iter().map(|e| e.timestamp).collect::<Vec<_>>();
        assert_eq!(kept, vec![3, 4]);
        assert_eq!(log.truncate_to_recent(10), 0);
    }
}
