//! Case-insensitive substring matcher over note title and body.
//!
//! # Invariants
//! - Query text is trimmed; an empty trimmed query yields no hits.
//! - Title matches rank strictly before body-only matches.
//! - Within a rank, results follow `recency_order`.

use crate::model::note::{recency_order, Note};

/// Which field produced the match. Declaration order is rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchRank {
    Title,
    Body,
}

/// Normalized search needle; `None` for blank input.
pub fn normalize_query(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Rank of `note` for an already-normalized `needle`.
pub fn match_rank(note: &Note, needle: &str) -> Option<MatchRank> {
    if note.title.to_lowercase().contains(needle) {
        Some(MatchRank::Title)
    } else if note.body.to_lowercase().contains(needle) {
        Some(MatchRank::Body)
    } else {
        None
    }
}

/// Returns matching notes, title hits first, each group most recent first.
pub fn search_notes<'a>(notes: impl IntoIterator<Item = &'a Note>, query: &str) -> Vec<Note> {
    let Some(needle) = normalize_query(query) else {
        return Vec::new();
    };

    let mut hits = notes
        .into_iter()
        .filter_map(|note| match_rank(note, &needle).map(|rank| (rank, note)))
        .collect::<Vec<_>>();
    hits.sort_by(|(rank_a, a), (rank_b, b)| rank_a.cmp(rank_b).then_with(|| recency_order(a, b)));
    hits.into_iter().map(|(_, note)| note.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::{match_rank, normalize_query, search_notes, MatchRank};
    use crate::model::note::Note;
    use uuid::Uuid;

    fn note(title: &str, body: &str, modified_at: i64) -> Note {
        let mut note = Note::new(Uuid::new_v4(), 0);
        note.title = title.to_string();
        note.body = body.to_string();
        note.modified_at = modified_at;
        note
    }

    #[test]
    fn blank_queries_match_nothing() {
        let notes = vec![note("alpha", "beta", 1)];
        assert!(search_notes(&notes, "").is_empty());
        assert!(search_notes(&notes, "   ").is_empty());
        assert_eq!(normalize_query("  Foo "), Some("foo".to_string()));
    }

    #[test]
    fn title_hits_rank_before_more_recent_body_hits() {
        let body_hit = note("groceries", "remember the Rust book", 200);
        let title_hit = note("Rust notes", "ownership", 100);
        let miss = note("other", "nothing", 300);
        let notes = vec![body_hit.clone(), title_hit.clone(), miss];

        let results = search_notes(&notes, "rust");
        assert_eq!(results, vec![title_hit, body_hit]);
    }

    #[test]
    fn same_rank_sorted_by_modified_desc() {
        let older = note("plan a", "", 10);
        let newer = note("plan b", "", 20);
        let notes = vec![older.clone(), newer.clone()];
        assert_eq!(search_notes(&notes, "PLAN"), vec![newer, older]);
    }

    #[test]
    fn match_rank_prefers_title() {
        let both = note("focus", "focus", 0);
        assert_eq!(match_rank(&both, "focus"), Some(MatchRank::Title));
    }
}
