//! Outbound mail dispatch
//!
//! [`MailSender`] is the seam between the inbox and whatever actually
//! delivers mail. [`ResendSender`] talks to the Resend HTTP API;
//! [`MemoryMailSender`] records messages for tests and dry runs.

mod memory;
mod resend;

pub use memory::MemoryMailSender;
pub use resend::ResendSender;

use serde::{Deserialize, Serialize};

use crate::models::Attachment;

/// Body of an outgoing email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailBody {
    Text(String),
    Html(String),
}

/// Attachment in the shape mail APIs expect: a filename and a source URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingAttachment {
    pub filename: String,
    pub path: String,
}

impl From<&Attachment> for OutgoingAttachment {
    fn from(attachment: &Attachment) -> Self {
        Self {
            filename: attachment.name.clone(),
            path: attachment.url.clone(),
        }
    }
}

/// A fully composed email ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    /// From header, e.g. `Studio <hello@studio.dev>`
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: MailBody,
    #[serde(default)]
    pub attachments: Vec<OutgoingAttachment>,
}

impl OutgoingEmail {
    /// Reject emails no sender could deliver
    pub fn validate(&self) -> Result<(), SendError> {
        if self.to.is_empty() || self.to.iter().any(|addr| addr.trim().is_empty()) {
            return Err(SendError::InvalidRequest("no recipient".to_string()));
        }
        if self.from.trim().is_empty() {
            return Err(SendError::InvalidRequest("no sender".to_string()));
        }
        Ok(())
    }
}

/// Acknowledgement returned by a successful dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Provider-assigned delivery ID
    pub id: String,
}

/// Errors reported by a mail sender
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The provider refused the message
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider could not be reached or answered garbage
    #[error("transport error: {0}")]
    Transport(String),

    /// The email was malformed before it left the process
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Something that can deliver an [`OutgoingEmail`]
pub trait MailSender: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, SendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: Vec<&str>) -> OutgoingEmail {
        OutgoingEmail {
            from: "studio <hello@studio.dev>".to_string(),
            to: to.into_iter().map(String::from).collect(),
            subject: "Hello".to_string(),
            body: MailBody::Text("Hi there".to_string()),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_validate_requires_recipient() {
        assert!(email(vec!["client@x.com"]).validate().is_ok());
        assert!(matches!(
            email(vec![]).validate(),
            Err(SendError::InvalidRequest(_))
        ));
        assert!(email(vec![" "]).validate().is_err());
    }

    #[test]
    fn test_attachment_mapping() {
        let attachment = Attachment::new("brief.pdf", "https://files.example/brief.pdf");
        let outgoing = OutgoingAttachment::from(&attachment);
        assert_eq!(outgoing.filename, "brief.pdf");
        assert_eq!(outgoing.path, "https://files.example/brief.pdf");
    }
}
