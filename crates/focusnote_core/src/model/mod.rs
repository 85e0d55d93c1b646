//! Domain model for notes, categories and focus sessions.
//!
//! # Responsibility
//! - Define the records persisted by the repository and the focus timer.
//! - Own category-name validation rules.
//!
//! # Invariants
//! - Every record is identified by a UUID v4 generated at construction.
//! - Timestamps are Unix epoch milliseconds; log durations are whole seconds.

pub mod category;
pub mod focus;
pub mod note;
