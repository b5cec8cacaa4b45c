//! Composer for new outbound conversations

use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{dispatch_failed, require_address};
use crate::error::InboxResult;
use crate::models::{
    ADMIN_SENDER, Attachment, Direction, Message, MessageId, Thread, ThreadId, ThreadStatus,
};
use crate::send::{MailBody, MailSender, OutgoingAttachment, OutgoingEmail};
use crate::storage::InboxStore;

/// A new message to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeRequest {
    /// Recipient, either `client@x.com` or `Name <client@x.com>`
    pub to: String,
    pub subject: String,
    /// Plain text body
    pub body: String,
    /// Sender address
    pub from: String,
    /// Display name for the From header; defaults to the sender local part
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Result of a successful compose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeOutcome {
    pub thread_id: ThreadId,
    pub message_id: MessageId,
    /// Delivery ID assigned by the mail sender
    pub delivery_id: String,
}

/// Starts new conversations with clients
///
/// The thread and its first message are persisted before dispatch, so a
/// failed send never loses the record: the thread stays in `sent` with
/// `send_failed` set.
pub struct Composer {
    store: Arc<dyn InboxStore>,
    sender: Arc<dyn MailSender>,
}

impl Composer {
    pub fn new(store: Arc<dyn InboxStore>, sender: Arc<dyn MailSender>) -> Self {
        Self { store, sender }
    }

    pub fn compose(&self, request: ComposeRequest) -> InboxResult<ComposeOutcome> {
        let recipient = require_address(&request.to, "recipient")?;
        let mut sender = require_address(&request.from, "sender")?;

        let now = Utc::now();
        if let Some(name) = request.from_name.as_deref().filter(|n| !n.trim().is_empty()) {
            sender.name = Some(name.trim().to_string());
        }

        let mut thread = Thread::new(
            ThreadId::generate(),
            &recipient,
            request.subject.as_str(),
            ThreadStatus::Sent,
            now,
        );
        thread.client_name = Some(recipient.display_name());
        let thread_id = thread.id.clone();

        let message = Message::builder(MessageId::generate(), thread_id.clone())
            .sender(ADMIN_SENDER)
            .direction(Direction::Outbound)
            .body(request.body.as_str())
            .attachments(request.attachments.clone())
            .sent_at(now)
            .build();
        let message_id = message.id.clone();

        self.store.insert_thread_with_message(thread, message)?;
        info!("Created thread {} for {}", thread_id, recipient.email);

        let email = OutgoingEmail {
            from: sender.from_header(),
            to: vec![recipient.email.clone()],
            subject: request.subject,
            body: MailBody::Text(request.body),
            attachments: request.attachments.iter().map(OutgoingAttachment::from).collect(),
        };

        let receipt = self
            .sender
            .send(&email)
            .map_err(|e| dispatch_failed(self.store.as_ref(), &thread_id, e))?;

        info!("Sent thread {} as delivery {}", thread_id, receipt.id);
        Ok(ComposeOutcome {
            thread_id,
            message_id,
            delivery_id: receipt.id,
        })
    }
}
