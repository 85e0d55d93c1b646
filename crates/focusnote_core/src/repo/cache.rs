//! Read-through cache of per-category note listings.
//!
//! Entries are only created on a listing miss and are dropped (never
//! patched) when a mutation touches their category.

use crate::model::category::CategoryId;
use crate::model::note::Note;
use std::collections::HashMap;

/// Hit/miss counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
pub struct CategoryCache {
    entries: HashMap<CategoryId, Vec<Note>>,
    hits: u64,
    misses: u64,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, category_id: CategoryId) -> Option<&[Note]> {
        match self.entries.get(&category_id) {
            Some(notes) => {
                self.hits += 1;
                Some(notes.as_slice())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, category_id: CategoryId, notes: Vec<Note>) {
        self.entries.insert(category_id, notes);
    }

    /// Drops one entry. Returns whether it was present.
    pub fn invalidate(&mut self, category_id: CategoryId) -> bool {
        self.entries.remove(&category_id).is_some()
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, category_id: CategoryId) -> bool {
        self.entries.contains_key(&category_id)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}
