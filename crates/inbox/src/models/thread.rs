//! Thread model representing one conversation with a client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::EmailAddress;

/// Unique identifier for a thread
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random thread ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Folder a thread currently lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    Inbox,
    Sent,
    Archive,
    Trash,
    Spam,
}

impl ThreadStatus {
    /// All statuses, in sidebar order
    pub const ALL: [ThreadStatus; 5] = [
        ThreadStatus::Inbox,
        ThreadStatus::Sent,
        ThreadStatus::Archive,
        ThreadStatus::Trash,
        ThreadStatus::Spam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadStatus::Inbox => "inbox",
            ThreadStatus::Sent => "sent",
            ThreadStatus::Archive => "archive",
            ThreadStatus::Trash => "trash",
            ThreadStatus::Spam => "spam",
        }
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a status string outside the known set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown thread status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ThreadStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThreadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A thread is a conversation with one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    /// Address of the client on the other side of the conversation
    pub client_email: String,
    /// Display name of the client, when known
    #[serde(default)]
    pub client_name: Option<String>,
    /// Subject line of the thread
    pub subject: String,
    pub status: ThreadStatus,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub unread: bool,
    /// Set when the last dispatch for this thread failed
    #[serde(default)]
    pub send_failed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// Create a new thread with both timestamps set to `now`
    ///
    /// Flags start cleared; callers set `unread` for inbound threads.
    pub fn new(
        id: ThreadId,
        client: &EmailAddress,
        subject: impl Into<String>,
        status: ThreadStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client_email: client.email.clone(),
            client_name: client.name.clone(),
            subject: subject.into(),
            status,
            starred: false,
            unread: false,
            send_failed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Display name for the client, falling back to the address local part
    pub fn client_display_name(&self) -> String {
        match &self.client_name {
            Some(name) => name.clone(),
            None => EmailAddress::new(self.client_email.as_str()).display_name(),
        }
    }
}
