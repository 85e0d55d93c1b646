//! Durable-write pipeline.
//!
//! # Responsibility
//! - Track save status and retry failed writes (`save_state`).
//! - Encode/decode whole collections with backup and corruption handling
//!   (`collections`).
//!
//! # Invariants
//! - Collections are always written wholesale; there are no partial updates.
//! - A load never fails: it degrades to backup, then to an empty collection.

pub mod collections;
pub mod save_state;

pub use collections::{
    load_collection, save_collection, write_snapshot, LoadSource, Loaded, WriteReceipt,
};
pub use save_state::{SaveStateMachine, SaveStatus};
