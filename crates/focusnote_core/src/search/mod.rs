//! In-memory note search.
//!
//! # Responsibility
//! - Rank notes for a free-text query without touching storage.
//!
//! # Invariants
//! - Blank queries return no results, never "all notes".

pub mod matcher;
