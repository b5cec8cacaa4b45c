//! Inbox crate - Business logic for the studio inbox
//!
//! This crate provides the mail-thread core behind the client inbox:
//! - Domain models (Thread, Message, Mailbox, Signature)
//! - Storage trait abstractions with in-memory and SQLite backends
//! - Action handler for thread state transitions (archive, trash, read/unread)
//! - Composer and reply sender for outbound mail
//! - Mail sender abstraction with a Resend HTTP client
//! - Query API for listing folders and loading thread detail
//!
//! Collaborators are injected (`Arc<dyn InboxStore>`, `Arc<dyn MailSender>`),
//! so every component can be exercised with the in-memory fakes.

pub mod actions;
pub mod compose;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod send;
pub mod storage;

pub use actions::{ActionHandler, ActionOutcome, ThreadAction};
pub use compose::{
    ComposeOutcome, ComposeRequest, Composer, InboundMail, ReplyOutcome, ReplyRequest,
    ReplySender, record_inbound,
};
pub use config::InboxConfig;
pub use error::{InboxError, InboxResult};
pub use models::{
    ADMIN_SENDER, Attachment, Direction, EmailAddress, Mailbox, MailboxId, Message, MessageId,
    Signature, Thread, ThreadId, ThreadStatus,
};
pub use query::{FolderCounts, ThreadDetail, ThreadSummary, folder_counts, get_thread_detail, list_threads};
pub use send::{
    MailBody, MailSender, MemoryMailSender, OutgoingAttachment, OutgoingEmail, ResendSender,
    SendError, SendReceipt,
};
pub use storage::{InMemoryInboxStore, InboxStore, SqliteInboxStore, ThreadPatch};
