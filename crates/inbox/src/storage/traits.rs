//! Storage trait definitions

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::{Mailbox, MailboxId, Message, Signature, Thread, ThreadId, ThreadStatus};

/// Partial update of a thread's mutable fields
///
/// `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadPatch {
    pub status: Option<ThreadStatus>,
    pub unread: Option<bool>,
    pub starred: Option<bool>,
    pub send_failed: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ThreadPatch {
    /// Move the thread to `status` and refresh `updated_at`
    pub fn status(status: ThreadStatus, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            updated_at: Some(now),
            ..Self::default()
        }
    }

    /// Set the unread flag only
    pub fn unread(unread: bool) -> Self {
        Self {
            unread: Some(unread),
            ..Self::default()
        }
    }

    /// Set the send-failed flag only
    pub fn send_failed(send_failed: bool) -> Self {
        Self {
            send_failed: Some(send_failed),
            ..Self::default()
        }
    }

    /// Apply the patch to an in-memory thread
    pub fn apply_to(&self, thread: &mut Thread) {
        if let Some(status) = self.status {
            thread.status = status;
        }
        if let Some(unread) = self.unread {
            thread.unread = unread;
        }
        if let Some(starred) = self.starred {
            thread.starred = starred;
        }
        if let Some(send_failed) = self.send_failed {
            thread.send_failed = send_failed;
        }
        if let Some(updated_at) = self.updated_at {
            thread.updated_at = updated_at;
        }
    }
}

/// Trait for inbox storage operations
///
/// Abstracts over storage backends (in-memory, SQLite) and provides the
/// typed read/update/delete operations the inbox components need.
pub trait InboxStore: Send + Sync {
    /// Insert a new thread (replaces an existing thread with the same ID)
    fn insert_thread(&self, thread: Thread) -> Result<()>;

    /// Insert a new thread together with its first message, all or nothing
    fn insert_thread_with_message(&self, thread: Thread, message: Message) -> Result<()>;

    /// Get a thread by ID
    fn get_thread(&self, id: &ThreadId) -> Result<Option<Thread>>;

    /// Apply a partial update; returns false if the thread doesn't exist
    fn update_thread(&self, id: &ThreadId, patch: &ThreadPatch) -> Result<bool>;

    /// Remove a thread; returns false if the thread doesn't exist
    fn delete_thread(&self, id: &ThreadId) -> Result<bool>;

    /// List threads in a folder, ordered by updated_at descending
    fn list_threads(&self, status: ThreadStatus, limit: usize, offset: usize)
    -> Result<Vec<Thread>>;

    /// Count threads in a folder
    fn count_threads(&self, status: ThreadStatus) -> Result<usize>;

    /// Count unread threads in a folder
    fn count_unread(&self, status: ThreadStatus) -> Result<usize>;

    /// Check if a thread exists
    fn has_thread(&self, id: &ThreadId) -> Result<bool>;

    /// Append a message to its thread's history
    fn append_message(&self, message: Message) -> Result<()>;

    /// List messages for a thread in append order
    fn list_messages_for_thread(&self, thread_id: &ThreadId) -> Result<Vec<Message>>;

    /// Insert or update a mailbox
    fn upsert_mailbox(&self, mailbox: Mailbox) -> Result<()>;

    /// Find a mailbox by its address (case-insensitive)
    fn get_mailbox_by_address(&self, address: &str) -> Result<Option<Mailbox>>;

    /// Insert or replace the signature for a mailbox
    fn save_signature(&self, signature: Signature) -> Result<()>;

    /// Get the signature for a mailbox
    fn get_signature(&self, mailbox_id: &MailboxId) -> Result<Option<Signature>>;
}
