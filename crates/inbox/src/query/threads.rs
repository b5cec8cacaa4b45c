//! Thread query functions

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Message, Thread, ThreadId, ThreadStatus};
use crate::storage::InboxStore;

/// Summary information for displaying a thread in a folder list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: ThreadId,
    /// Client display name, falling back to the address local part
    pub client_name: String,
    pub client_email: String,
    pub subject: String,
    pub status: ThreadStatus,
    pub starred: bool,
    pub unread: bool,
    pub send_failed: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<Thread> for ThreadSummary {
    fn from(thread: Thread) -> Self {
        Self {
            client_name: thread.client_display_name(),
            id: thread.id,
            client_email: thread.client_email,
            subject: thread.subject,
            status: thread.status,
            starred: thread.starred,
            unread: thread.unread,
            send_failed: thread.send_failed,
            updated_at: thread.updated_at,
        }
    }
}

/// Detailed thread information including all messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadDetail {
    /// The thread metadata
    pub thread: Thread,
    /// All messages in the thread, in append order
    pub messages: Vec<Message>,
}

/// Number of threads per folder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderCounts {
    pub inbox: usize,
    pub sent: usize,
    pub archive: usize,
    pub trash: usize,
    pub spam: usize,
    /// Unread threads in the inbox
    pub unread: usize,
}

impl FolderCounts {
    pub fn get(&self, status: ThreadStatus) -> usize {
        match status {
            ThreadStatus::Inbox => self.inbox,
            ThreadStatus::Sent => self.sent,
            ThreadStatus::Archive => self.archive,
            ThreadStatus::Trash => self.trash,
            ThreadStatus::Spam => self.spam,
        }
    }
}

/// List threads in a folder with pagination
///
/// Returns threads sorted by updated_at descending (most recent first).
///
/// # Arguments
/// * `store` - The storage backend
/// * `folder` - The folder to list
/// * `limit` - Maximum number of threads to return
/// * `offset` - Number of threads to skip
pub fn list_threads(
    store: &dyn InboxStore,
    folder: ThreadStatus,
    limit: usize,
    offset: usize,
) -> Result<Vec<ThreadSummary>> {
    let threads = store.list_threads(folder, limit, offset)?;
    Ok(threads.into_iter().map(ThreadSummary::from).collect())
}

/// Count threads in every folder, plus unread inbox threads
pub fn folder_counts(store: &dyn InboxStore) -> Result<FolderCounts> {
    Ok(FolderCounts {
        inbox: store.count_threads(ThreadStatus::Inbox)?,
        sent: store.count_threads(ThreadStatus::Sent)?,
        archive: store.count_threads(ThreadStatus::Archive)?,
        trash: store.count_threads(ThreadStatus::Trash)?,
        spam: store.count_threads(ThreadStatus::Spam)?,
        unread: store.count_unread(ThreadStatus::Inbox)?,
    })
}

/// Get a thread with its full message history
pub fn get_thread_detail(store: &dyn InboxStore, thread_id: &ThreadId) -> Result<Option<ThreadDetail>> {
    let Some(thread) = store.get_thread(thread_id)? else {
        return Ok(None);
    };
    let messages = store.list_messages_for_thread(thread_id)?;
    Ok(Some(ThreadDetail { thread, messages }))
}
