//! Filing mail received from clients

use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::require_address;
use crate::error::InboxResult;
use crate::models::{Attachment, Direction, Message, MessageId, Thread, ThreadId, ThreadStatus};
use crate::storage::{InboxStore, ThreadPatch};

/// An inbound email already extracted from the provider's webhook payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMail {
    /// Sender, either `client@x.com` or `Name <client@x.com>`
    pub from: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Thread this mail answers, when the caller could resolve one
    #[serde(default)]
    pub thread_id: Option<ThreadId>,
}

/// File an inbound email and return the thread it landed in
///
/// Mail for a known thread is appended there and brings the thread back to
/// the inbox as unread. Anything else starts a new unread inbox thread.
pub fn record_inbound(store: &dyn InboxStore, mail: InboundMail) -> InboxResult<ThreadId> {
    let from = require_address(&mail.from, "sender")?;
    let now = Utc::now();

    let existing = match &mail.thread_id {
        Some(id) if store.has_thread(id)? => Some(id.clone()),
        Some(id) => {
            debug!("Inbound mail references unknown thread {}, starting a new one", id);
            None
        }
        None => None,
    };

    let thread_id = match existing {
        Some(id) => id,
        None => {
            let mut thread = Thread::new(
                ThreadId::generate(),
                &from,
                mail.subject.as_str(),
                ThreadStatus::Inbox,
                now,
            );
            thread.unread = true;
            let id = thread.id.clone();
            store.insert_thread(thread)?;
            info!("Created inbox thread {} for {}", id, from.email);
            id
        }
    };

    let message = Message::builder(MessageId::generate(), thread_id.clone())
        .sender(from.email.as_str())
        .direction(Direction::Inbound)
        .body(mail.body)
        .attachments(mail.attachments)
        .sent_at(now)
        .build();
    store.append_message(message)?;

    let patch = ThreadPatch {
        status: Some(ThreadStatus::Inbox),
        unread: Some(true),
        updated_at: Some(now),
        ..ThreadPatch::default()
    };
    store.update_thread(&thread_id, &patch)?;

    info!("Recorded inbound mail from {} in thread {}", from.email, thread_id);
    Ok(thread_id)
}
