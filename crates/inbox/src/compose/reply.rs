//! Thread-scoped replies with mailbox signatures

use chrono::Utc;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{dispatch_failed, html, require_address};
use crate::error::{InboxError, InboxResult};
use crate::models::{ADMIN_SENDER, Attachment, Direction, Message, MessageId, ThreadId};
use crate::send::{MailBody, MailSender, OutgoingAttachment, OutgoingEmail};
use crate::storage::{InboxStore, ThreadPatch};

/// A reply inside an existing thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRequest {
    pub thread_id: ThreadId,
    /// Plain text reply; converted to HTML before dispatch
    pub body: String,
    pub to: String,
    pub subject: String,
    /// Address of the mailbox sending the reply
    pub from: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Result of a delivered reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyOutcome {
    pub message_id: MessageId,
    pub delivery_id: String,
    /// Whether a mailbox signature was appended
    pub signed: bool,
}

/// Sends replies from a studio mailbox
///
/// The message is added to the thread history only after the mail sender
/// accepted it; a failed dispatch appends nothing and flags the thread.
pub struct ReplySender {
    store: Arc<dyn InboxStore>,
    sender: Arc<dyn MailSender>,
}

impl ReplySender {
    pub fn new(store: Arc<dyn InboxStore>, sender: Arc<dyn MailSender>) -> Self {
        Self { store, sender }
    }

    pub fn reply(&self, request: ReplyRequest) -> InboxResult<ReplyOutcome> {
        let recipient = require_address(&request.to, "recipient")?;
        let from_address = require_address(&request.from, "sender")?;

        if !self.store.has_thread(&request.thread_id)? {
            return Err(InboxError::NotFound(request.thread_id));
        }

        let mailbox = self.store.get_mailbox_by_address(&from_address.email)?;
        let signature = match &mailbox {
            Some(mailbox) => self.store.get_signature(&mailbox.id)?,
            None => {
                debug!("No mailbox registered for {}", request.from);
                None
            }
        };
        let from = match &mailbox {
            Some(mailbox) => mailbox.email_address(),
            None => from_address,
        };

        let body_html = html::reply_html(&request.body, signature.as_ref().map(|s| s.html.as_str()));
        let email = OutgoingEmail {
            from: from.from_header(),
            to: vec![recipient.email],
            subject: request.subject,
            body: MailBody::Html(body_html),
            attachments: request.attachments.iter().map(OutgoingAttachment::from).collect(),
        };

        let receipt = self
            .sender
            .send(&email)
            .map_err(|e| dispatch_failed(self.store.as_ref(), &request.thread_id, e))?;

        let now = Utc::now();
        let message = Message::builder(MessageId::generate(), request.thread_id.clone())
            .sender(ADMIN_SENDER)
            .direction(Direction::Outbound)
            .body(request.body)
            .attachments(request.attachments)
            .sent_at(now)
            .build();
        let message_id = message.id.clone();

        // The mail is already out; failures past this point leave only the log
        // line to reconcile history with the provider.
        let unrecorded = |err: anyhow::Error| {
            error!(
                "Delivery {} in thread {} was sent but not recorded: {:#}",
                receipt.id, request.thread_id, err
            );
            InboxError::from(err)
        };
        self.store.append_message(message).map_err(unrecorded)?;

        let patch = ThreadPatch {
            send_failed: Some(false),
            updated_at: Some(now),
            ..ThreadPatch::default()
        };
        self.store
            .update_thread(&request.thread_id, &patch)
            .map_err(unrecorded)?;

        info!(
            "Replied in thread {} as delivery {}",
            request.thread_id, receipt.id
        );
        Ok(ReplyOutcome {
            message_id,
            delivery_id: receipt.id,
            signed: signature.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::html::SIGNATURE_SEPARATOR;
    use crate::models::{EmailAddress, Mailbox, MailboxId, Signature, Thread, ThreadStatus};
    use crate::send::MemoryMailSender;
    use crate::storage::{InMemoryInboxStore, SqliteInboxStore};
    use chrono::Duration;

    struct Fixture {
        store: Arc<InMemoryInboxStore>,
        sender: Arc<MemoryMailSender>,
        replies: ReplySender,
        thread: Thread,
    }

    fn setup() -> Fixture {
        let store = Arc::new(InMemoryInboxStore::new());
        let sender = Arc::new(MemoryMailSender::new());
        let mut thread = Thread::new(
            ThreadId::new("t1"),
            &EmailAddress::new("client@x.com"),
            "Logo feedback",
            ThreadStatus::Inbox,
            Utc::now() - Duration::hours(2),
        );
        thread.send_failed = true;
        store.insert_thread(thread.clone()).unwrap();
        let replies = ReplySender::new(store.clone(), sender.clone());
        Fixture {
            store,
            sender,
            replies,
            thread,
        }
    }

    fn request(thread_id: &ThreadId) -> ReplyRequest {
        ReplyRequest {
            thread_id: thread_id.clone(),
            body: "Thanks!\nWill do.".to_string(),
            to: "client@x.com".to_string(),
            subject: "Re: Logo feedback".to_string(),
            from: "hello@studio.dev".to_string(),
            attachments: Vec::new(),
        }
    }

    fn html_of(email: &OutgoingEmail) -> &str {
        match &email.body {
            MailBody::Html(html) => html,
            MailBody::Text(_) => panic!("reply should be HTML"),
        }
    }

    #[test]
    fn test_reply_without_signature() {
        let f = setup();
        let outcome = f.replies.reply(request(&f.thread.id)).unwrap();
        assert!(!outcome.signed);

        let sent = f.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(html_of(&sent[0]), "Thanks!<br>Will do.");
        assert!(!html_of(&sent[0]).contains(SIGNATURE_SEPARATOR));
        assert_eq!(sent[0].from, "hello <hello@studio.dev>");
    }

    #[test]
    fn test_reply_with_mailbox_signature() {
        let f = setup();
        let mailbox = Mailbox::new(
            MailboxId::new("mb1"),
            "hello@studio.dev",
            Some("Studio".to_string()),
        );
        f.store.upsert_mailbox(mailbox.clone()).unwrap();
        f.store
            .save_signature(Signature {
                mailbox_id: mailbox.id,
                html: "<p>Studio &middot; Lisbon</p>".to_string(),
            })
            .unwrap();

        let outcome = f.replies.reply(request(&f.thread.id)).unwrap();
        assert!(outcome.signed);

        let sent = f.sender.sent();
        let html = html_of(&sent[0]);
        assert!(html.ends_with(&format!("{}<p>Studio &middot; Lisbon</p>", SIGNATURE_SEPARATOR)));
        assert_eq!(sent[0].from, "Studio <hello@studio.dev>");
    }

    #[test]
    fn test_successful_reply_appends_history_and_clears_flag() {
        let f = setup();
        let outcome = f.replies.reply(request(&f.thread.id)).unwrap();

        let messages = f.store.list_messages_for_thread(&f.thread.id).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, outcome.message_id);
        assert_eq!(messages[0].sender, ADMIN_SENDER);
        assert_eq!(messages[0].body, "Thanks!\nWill do.");

        let thread = f.store.get_thread(&f.thread.id).unwrap().unwrap();
        assert!(!thread.send_failed);
        assert!(thread.updated_at > f.thread.updated_at);
        assert_eq!(thread.status, ThreadStatus::Inbox);
    }

    #[test]
    fn test_failed_dispatch_appends_nothing() {
        let f = setup();
        f.store
            .update_thread(&f.thread.id, &ThreadPatch::send_failed(false))
            .unwrap();
        f.sender.set_failure(Some("rate limited".to_string()));

        let err = f.replies.reply(request(&f.thread.id)).unwrap_err();
        assert!(matches!(err, InboxError::DispatchFailed(_)));
        assert!(f.store.list_messages_for_thread(&f.thread.id).unwrap().is_empty());
        assert!(f.store.get_thread(&f.thread.id).unwrap().unwrap().send_failed);
    }

    #[test]
    fn test_recipient_without_address_is_rejected() {
        let f = setup();
        let writes = f.store.write_count();
        let mut req = request(&f.thread.id);
        req.to = "Client <>".to_string();

        let err = f.replies.reply(req).unwrap_err();
        assert!(matches!(err, InboxError::InvalidInput(_)));
        assert_eq!(f.sender.attempts(), 0);
        assert_eq!(f.store.write_count(), writes);
    }

    #[test]
    fn test_delivered_reply_that_cannot_be_recorded_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inbox.test.sqlite");
        let store = Arc::new(SqliteInboxStore::new(&path).unwrap());
        let thread = Thread::new(
            ThreadId::new("t1"),
            &EmailAddress::new("client@x.com"),
            "Logo feedback",
            ThreadStatus::Inbox,
            Utc::now(),
        );
        store.insert_thread(thread.clone()).unwrap();

        // Break message storage behind the store's back
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("DROP TABLE messages;")
            .unwrap();

        let sender = Arc::new(MemoryMailSender::new());
        let replies = ReplySender::new(store.clone(), sender.clone());
        let err = replies.reply(request(&thread.id)).unwrap_err();

        assert!(matches!(err, InboxError::Persistence(_)));
        assert_eq!(sender.sent().len(), 1);
        assert!(!store.get_thread(&thread.id).unwrap().unwrap().send_failed);
    }

    #[test]
    fn test_unknown_thread_is_not_dispatched() {
        let f = setup();
        let err = f.replies.reply(request(&ThreadId::new("ghost"))).unwrap_err();
        assert!(matches!(err, InboxError::NotFound(_)));
        assert_eq!(f.sender.attempts(), 0);
    }
}
