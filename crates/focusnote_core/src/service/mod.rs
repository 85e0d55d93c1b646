//! Host-facing services.
//!
//! # Responsibility
//! - Bundle the repository and timer behind one owner for FFI and CLI hosts.
//! - Keep hosts decoupled from storage and scheduling details.

pub mod workspace;

pub use workspace::{PollOutcome, Workspace, WorkspaceError};
