//! Resend HTTP API client
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{MailBody, MailSender, OutgoingAttachment, OutgoingEmail, SendError, SendReceipt};

/// Request body for `POST /emails`
#[derive(Debug, Serialize)]
struct EmailPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachments: Option<&'a [OutgoingAttachment]>,
}

impl<'a> From<&'a OutgoingEmail> for EmailPayload<'a> {
    fn from(email: &'a OutgoingEmail) -> Self {
        let (text, html) = match &email.body {
            MailBody::Text(text) => (Some(text.as_str()), None),
            MailBody::Html(html) => (None, Some(html.as_str())),
        };
        Self {
            from: &email.from,
            to: &email.to,
            subject: &email.subject,
            text,
            html,
            attachments: (!email.attachments.is_empty()).then_some(email.attachments.as_slice()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Mail sender backed by the Resend API
pub struct ResendSender {
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl ResendSender {
    /// Resend API base URL
    pub const DEFAULT_BASE_URL: &'static str = "https://api.resend.com";

    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a client for the public Resend API
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Point the client at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl MailSender for ResendSender {
    fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, SendError> {
        email.validate()?;

        let url = format!("{}/emails", self.base_url);
        let payload = EmailPayload::from(email);

        let mut response = ureq::post(&url)
            .config()
            .http_status_as_error(false)
            .timeout_global(Some(self.timeout))
            .build()
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&payload)
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let sent: SendResponse = response
                .body_mut()
                .read_json()
                .map_err(|e| SendError::Transport(format!("unreadable send response: {}", e)))?;
            info!("Dispatched email {} to {:?}", sent.id, email.to);
            return Ok(SendReceipt { id: sent.id });
        }

        // Resend explains rejections in a JSON body; fall back to the status text
        let message = response
            .body_mut()
            .read_json::<ErrorResponse>()
            .map(|body| body.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
        warn!("Resend rejected email to {:?}: {} {}", email.to, status.as_u16(), message);

        Err(SendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
