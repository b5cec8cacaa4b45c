//! Action handler for thread state transitions
//!
//! Each action is one persisted write (or delete) against the store.
//! There are no transition guards: any folder can move to any other.

use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{InboxError, InboxResult};
use crate::models::{ThreadId, ThreadStatus};
use crate::storage::{InboxStore, ThreadPatch};

/// The closed set of actions a caller may apply to a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThreadAction {
    Archive,
    Trash,
    Restore,
    Spam,
    ToggleRead,
    MarkAsRead,
    Delete,
}

impl ThreadAction {
    pub const ALL: [ThreadAction; 7] = [
        ThreadAction::Archive,
        ThreadAction::Trash,
        ThreadAction::Restore,
        ThreadAction::Spam,
        ThreadAction::ToggleRead,
        ThreadAction::MarkAsRead,
        ThreadAction::Delete,
    ];

    /// Name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadAction::Archive => "archive",
            ThreadAction::Trash => "trash",
            ThreadAction::Restore => "restore",
            ThreadAction::Spam => "spam",
            ThreadAction::ToggleRead => "toggleRead",
            ThreadAction::MarkAsRead => "markAsRead",
            ThreadAction::Delete => "delete",
        }
    }
}

impl fmt::Display for ThreadAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreadAction {
    type Err = InboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThreadAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| InboxError::InvalidAction(s.to_string()))
    }
}

/// What an applied action did to the thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActionOutcome {
    /// Thread moved to a folder
    Moved { status: ThreadStatus },
    /// Unread flag set to the given value
    ReadState { unread: bool },
    /// Thread removed permanently
    Deleted,
}

/// Handler for thread actions like archive, trash, read/unread
pub struct ActionHandler {
    store: Arc<dyn InboxStore>,
}

impl ActionHandler {
    /// Create a new action handler
    pub fn new(store: Arc<dyn InboxStore>) -> Self {
        Self { store }
    }

    /// Parse an action name and apply it
    ///
    /// Unknown names fail with [`InboxError::InvalidAction`] before the
    /// store is touched.
    pub fn apply_named(&self, thread_id: &ThreadId, action: &str) -> InboxResult<ActionOutcome> {
        let action = action.parse::<ThreadAction>()?;
        self.apply(thread_id, action)
    }

    /// Apply an action to a thread
    pub fn apply(&self, thread_id: &ThreadId, action: ThreadAction) -> InboxResult<ActionOutcome> {
        debug!("Applying {} to thread {}", action, thread_id);

        let outcome = match action {
            ThreadAction::Archive => self.move_to(thread_id, ThreadStatus::Archive)?,
            ThreadAction::Trash => self.move_to(thread_id, ThreadStatus::Trash)?,
            ThreadAction::Restore => self.move_to(thread_id, ThreadStatus::Inbox)?,
            ThreadAction::Spam => self.move_to(thread_id, ThreadStatus::Spam)?,
            ThreadAction::ToggleRead => self.toggle_read(thread_id)?,
            ThreadAction::MarkAsRead => self.set_unread(thread_id, false)?,
            ThreadAction::Delete => self.delete(thread_id)?,
        };

        info!("Applied {} to thread {}", action, thread_id);
        Ok(outcome)
    }

    fn move_to(&self, thread_id: &ThreadId, status: ThreadStatus) -> InboxResult<ActionOutcome> {
        let patch = ThreadPatch::status(status, Utc::now());
        if !self.store.update_thread(thread_id, &patch)? {
            return Err(InboxError::NotFound(thread_id.clone()));
        }
        Ok(ActionOutcome::Moved { status })
    }

    /// Flip the unread flag based on the currently stored value
    fn toggle_read(&self, thread_id: &ThreadId) -> InboxResult<ActionOutcome> {
        let thread = self
            .store
            .get_thread(thread_id)?
            .ok_or_else(|| InboxError::NotFound(thread_id.clone()))?;
        self.set_unread(thread_id, !thread.unread)
    }

    fn set_unread(&self, thread_id: &ThreadId, unread: bool) -> InboxResult<ActionOutcome> {
        if !self.store.update_thread(thread_id, &ThreadPatch::unread(unread))? {
            return Err(InboxError::NotFound(thread_id.clone()));
        }
        Ok(ActionOutcome::ReadState { unread })
    }

    fn delete(&self, thread_id: &ThreadId) -> InboxResult<ActionOutcome> {
        if !self.store.delete_thread(thread_id)? {
            return Err(InboxError::NotFound(thread_id.clone()));
        }
        Ok(ActionOutcome::Deleted)
    }
}
