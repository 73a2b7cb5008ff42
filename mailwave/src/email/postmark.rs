//! Postmark backend
//!
//! Drives the Postmark `email` API over HTTPS. Second choice after SendGrid
//! when its server token is configured.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PostmarkSettings;

use super::{
    classify_http_error, AdapterError, EmailSender, OutboundEmail, Provider, SendReceipt,
};

/// Postmark API backend
pub struct PostmarkBackend {
    settings: PostmarkSettings,
    client: reqwest::Client,
    timeout: Duration,
}

impl PostmarkBackend {
    /// Create a backend from usable credentials
    #[must_use]
    pub fn new(settings: PostmarkSettings, timeout_secs: u64) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EmailRequest {
    from: String,
    to: String,
    subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentPayload>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
struct AttachmentPayload {
    name: String,
    content: String,
    content_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EmailResponse {
    #[serde(rename = "MessageID")]
    message_id: Option<String>,
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    message: String,
}

/// Build the request body for one email
///
/// Postmark rejects messages with neither body; an empty text body stands in
/// so that validation failures stay on the provider side of the contract.
pub(crate) fn build_payload(email: &OutboundEmail) -> EmailRequest {
    let text_body = match (&email.html_body, &email.text_body) {
        (None, None) => Some(String::new()),
        (_, text) => text.clone(),
    };

    EmailRequest {
        from: email.formatted_from(),
        to: email.to.clone(),
        subject: email.subject.clone(),
        html_body: email.html_body.clone(),
        text_body,
        reply_to: email.reply_to.clone(),
        attachments: email
            .attachments
            .iter()
            .map(|a| AttachmentPayload {
                name: a.filename.clone(),
                content: base64::engine::general_purpose::STANDARD.encode(&a.content),
                content_type: a.content_type.clone(),
            })
            .collect(),
    }
}

#[async_trait]
impl EmailSender for PostmarkBackend {
    fn provider(&self) -> Provider {
        Provider::Postmark
    }

    async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, AdapterError> {
        let url = format!("{}/email", self.settings.base_url.trim_end_matches('/'));
        let payload = build_payload(email);

        let response = self
            .client
            .post(&url)
            .header("X-Postmark-Server-Token", &self.settings.server_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_http_error(Provider::Postmark, self.timeout.as_secs(), &e))?;

        let status = response.status();
        let body: EmailResponse = response
            .json()
            .await
            .map_err(|e| classify_http_error(Provider::Postmark, self.timeout.as_secs(), &e))?;

        if status.is_success() && body.error_code == 0 {
            debug!(to = %email.to, message_id = ?body.message_id, "postmark accepted message");
            Ok(SendReceipt {
                provider: Provider::Postmark,
                message_id: body.message_id,
            })
        } else {
            warn!(to = %email.to, %status, error_code = body.error_code, "postmark rejected message");
            Err(AdapterError::Rejected {
                provider: Provider::Postmark,
                message: format!("error code {}: {}", body.error_code, body.message),
            })
        }
    }
}
