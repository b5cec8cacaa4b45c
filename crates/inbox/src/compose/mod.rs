//! Outbound and inbound mail flows
//!
//! - [`Composer`] starts a new thread and dispatches its first message
//! - [`ReplySender`] sends a signed reply inside an existing thread
//! - [`record_inbound`] files mail received from a client
//!
//! Dispatch failures always surface as [`InboxError::DispatchFailed`] and set
//! the thread's `send_failed` flag; nothing already persisted is rolled back.
//!
//! [`InboxError::DispatchFailed`]: crate::error::InboxError::DispatchFailed

mod composer;
pub mod html;
mod inbound;
mod reply;

pub use composer::{ComposeOutcome, ComposeRequest, Composer};
pub use inbound::{InboundMail, record_inbound};
pub use reply::{ReplyOutcome, ReplyRequest, ReplySender};

use log::{error, warn};

use crate::error::InboxError;
use crate::models::{EmailAddress, ThreadId};
use crate::send::SendError;
use crate::storage::{InboxStore, ThreadPatch};

/// Record a failed dispatch on the thread and build the error to return
///
/// A failure to set the flag is logged; the dispatch error still wins.
fn dispatch_failed(store: &dyn InboxStore, thread_id: &ThreadId, err: SendError) -> InboxError {
    warn!("Dispatch for thread {} failed: {}", thread_id, err);
    if let Err(flag_err) = store.update_thread(thread_id, &ThreadPatch::send_failed(true)) {
        error!(
            "Could not flag thread {} as send-failed: {:#}",
            thread_id, flag_err
        );
    }
    InboxError::DispatchFailed(err.to_string())
}

/// Parse an address, rejecting input that leaves no usable mailbox behind
///
/// `Jane <>` parses to an empty address; that must never reach the store.
fn require_address(value: &str, what: &str) -> Result<EmailAddress, InboxError> {
    let address = EmailAddress::parse(value);
    let email = address.email.as_str();
    if email.is_empty() {
        return Err(InboxError::InvalidInput(format!("{} address is required", what)));
    }
    if !email.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(InboxError::InvalidInput(format!(
            "{} address is invalid: {}",
            what, email
        )));
    }
    Ok(address)
}
