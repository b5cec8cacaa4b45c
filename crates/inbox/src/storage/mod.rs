//! Storage traits and implementations
//!
//! This module defines the storage abstraction layer for inbox entities.
//! The trait-based design allows swapping between the in-memory store used
//! in tests and the SQLite store used by the CLI.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryInboxStore;
pub use sqlite::SqliteInboxStore;
pub use traits::{InboxStore, ThreadPatch};
