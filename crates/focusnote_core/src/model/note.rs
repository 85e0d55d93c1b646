//! Note domain model.
//!
//! # Invariants
//! - `category_id` always references a live category (enforced by the
//!   repository, not by this type).
//! - `modified_at >= created_at` for notes built through `Note::new`.

use crate::model::category::CategoryId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

pub type NoteId = Uuid;

/// Title given to notes created without user input.
pub const DEFAULT_NOTE_TITLE: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    pub category_id: CategoryId,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds. Bumped by every repository update.
    pub modified_at: i64,
}

impl Note {
    /// Creates an empty note in `category_id` with a generated id.
    pub fn new(category_id: CategoryId, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: DEFAULT_NOTE_TITLE.to_string(),
            body: String::new(),
            category_id,
            created_at: now_ms,
            modified_at: now_ms,
        }
    }
}

/// Listing order: `modified_at` desc, then `created_at` desc, then id.
pub fn recency_order(a: &Note, b: &Note) -> Ordering {
    b.modified_at
        .cmp(&a.modified_at)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
