//! Error taxonomy for inbox operations

use crate::models::ThreadId;

/// Result alias for inbox operations
pub type InboxResult<T> = std::result::Result<T, InboxError>;

/// Errors surfaced by the action handler, composer and reply sender
///
/// Store implementations report failures as `anyhow::Error`; those are
/// wrapped into [`InboxError::Persistence`] at the component boundary.
#[derive(Debug, thiserror::Error)]
pub enum InboxError {
    /// Action name is not one of the recognized thread actions
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Referenced thread does not exist
    #[error("thread not found: {}", .0.as_str())]
    NotFound(ThreadId),

    /// The mail-sending collaborator rejected the message
    #[error("dispatch failed: {0}")]
    DispatchFailed(String),

    /// Caller is not authenticated (raised by the calling layer)
    #[error("unauthorized")]
    Unauthorized,

    /// Request rejected before touching the store
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Store unreachable or rejected the write
    #[error("persistence error: {0:#}")]
    Persistence(anyhow::Error),
}

impl InboxError {
    /// Whether the error was caused by the request itself (400-class)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAction(_) | Self::InvalidInput(_) | Self::NotFound(_) | Self::Unauthorized
        )
    }
}

impl From<anyhow::Error> for InboxError {
    fn from(err: anyhow::Error) -> Self {
        Self::Persistence(err)
    }
}
