//! Recording mail sender for tests and dry runs

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;

use super::{MailSender, OutgoingEmail, SendError, SendReceipt};

/// Mail sender that keeps every email in memory instead of delivering it
///
/// Can be switched into a failing mode to exercise dispatch errors.
#[derive(Default)]
pub struct MemoryMailSender {
    sent: Mutex<Vec<OutgoingEmail>>,
    failure: Mutex<Option<String>>,
    attempts: AtomicUsize,
}

impl MemoryMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every dispatch fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        let sender = Self::new();
        sender.set_failure(Some(message.into()));
        sender
    }

    /// Make subsequent sends fail (`Some`) or succeed (`None`)
    pub fn set_failure(&self, message: Option<String>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = message;
        }
    }

    /// Emails accepted so far, in dispatch order
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of send calls, including failed ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl MailSender for MemoryMailSender {
    fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, SendError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        email.validate()?;

        let failure = self
            .failure
            .lock()
            .map_err(|_| SendError::Transport("sender lock poisoned".to_string()))?
            .clone();
        if let Some(message) = failure {
            return Err(SendError::Rejected {
                status: 500,
                message,
            });
        }

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| SendError::Transport("sender lock poisoned".to_string()))?;
        sent.push(email.clone());
        let id = format!("memory-{}", sent.len());
        debug!("Recorded email {} to {:?}", id, email.to);
        Ok(SendReceipt { id })
    }
}
