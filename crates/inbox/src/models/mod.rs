//! Domain models for inbox entities

mod mailbox;
mod message;
mod thread;

pub use mailbox::{Mailbox, MailboxId, Signature};
pub use message::{ADMIN_SENDER, Attachment, Direction, EmailAddress, Message, MessageId};
pub use thread::{Thread, ThreadId, ThreadStatus, UnknownStatus};
