//! Mailbox and signature models

use serde::{Deserialize, Serialize};

use super::EmailAddress;

/// Unique identifier for a mailbox
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MailboxId(pub String);

impl MailboxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random mailbox ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A sending identity the studio can reply from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    pub id: MailboxId,
    /// Address mail is sent from; lookups compare it case-insensitively
    pub address: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Mailbox {
    pub fn new(id: MailboxId, address: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id,
            address: address.into(),
            display_name,
        }
    }

    /// The mailbox as a sender address
    pub fn email_address(&self) -> EmailAddress {
        EmailAddress {
            name: self.display_name.clone(),
            email: self.address.clone(),
        }
    }
}

/// HTML signature saved for a mailbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub mailbox_id: MailboxId,
    pub html: String,
}
