//! Note/category repository.
//!
//! # Responsibility
//! - Own the in-memory note and category collections.
//! - Serve per-category listings through a read-through cache.
//! - Route every mutation through the save-state machine.
//!
//! # Invariants
//! - Every note references a live category; the category set is never empty.
//! - A present cache entry always equals a fresh filter+sort of live notes.

pub mod cache;
pub mod note_repo;
