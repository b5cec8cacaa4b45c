//! Thread actions module
//!
//! Provides the action handler for thread state transitions like archive,
//! trash, restore, spam, read/unread and delete.

mod handler;

pub use handler::{ActionHandler, ActionOutcome, ThreadAction};
