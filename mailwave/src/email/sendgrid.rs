//! SendGrid backend
//!
//! Drives the SendGrid v3 `mail/send` API over HTTPS. Preferred transport
//! when its API key is configured.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SendGridSettings;

use super::{
    classify_http_error, AdapterError, EmailSender, OutboundEmail, Provider, SendReceipt,
};

/// SendGrid v3 API backend
pub struct SendGridBackend {
    settings: SendGridSettings,
    client: reqwest::Client,
    timeout: Duration,
}

impl SendGridBackend {
    /// Create a backend from usable credentials
    #[must_use]
    pub fn new(settings: SendGridSettings, timeout_secs: u64) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct MailSendRequest {
    personalizations: Vec<Personalization>,
    from: Party,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<Party>,
    subject: String,
    content: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentPayload>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Personalization {
    to: Vec<Party>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Party {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Content {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct AttachmentPayload {
    content: String,
    #[serde(rename = "type")]
    content_type: String,
    filename: String,
    disposition: String,
}

/// Build the v3 request body for one email
///
/// SendGrid requires `text/plain` content to precede `text/html`, and at
/// least one content part; an empty plain part stands in when the campaign
/// has no body at all.
pub(crate) fn build_payload(email: &OutboundEmail) -> MailSendRequest {
    let mut content = Vec::new();
    if let Some(text) = &email.text_body {
        content.push(Content {
            kind: "text/plain".to_string(),
            value: text.clone(),
        });
    }
    if let Some(html) = &email.html_body {
        content.push(Content {
            kind: "text/html".to_string(),
            value: html.clone(),
        });
    }
    if content.is_empty() {
        content.push(Content {
            kind: "text/plain".to_string(),
            value: String::new(),
        });
    }

    let attachments = email
        .attachments
        .iter()
        .map(|a| AttachmentPayload {
            content: base64::engine::general_purpose::STANDARD.encode(&a.content),
            content_type: a.content_type.clone(),
            filename: a.filename.clone(),
            disposition: "attachment".to_string(),
        })
        .collect();

    MailSendRequest {
        personalizations: vec![Personalization {
            to: vec![Party {
                email: email.to.clone(),
                name: None,
            }],
        }],
        from: Party {
            email: email.from_address.clone(),
            name: email.from_name.clone().filter(|n| !n.is_empty()),
        },
        reply_to: email.reply_to.clone().map(|address| Party {
            email: address,
            name: None,
        }),
        subject: email.subject.clone(),
        content,
        attachments,
    }
}

#[async_trait]
impl EmailSender for SendGridBackend {
    fn provider(&self) -> Provider {
        Provider::SendGrid
    }

    async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, AdapterError> {
        let url = format!(
            "{}/v3/mail/send",
            self.settings.base_url.trim_end_matches('/')
        );
        let payload = build_payload(email);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_http_error(Provider::SendGrid, self.timeout.as_secs(), &e))?;

        let status = response.status();
        if status.is_success() {
            let message_id = response
                .headers()
                .get("x-message-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            debug!(to = %email.to, ?message_id, "sendgrid accepted message");
            Ok(SendReceipt {
                provider: Provider::SendGrid,
                message_id,
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(to = %email.to, %status, "sendgrid rejected message");
            Err(AdapterError::Rejected {
                provider: Provider::SendGrid,
                message: format!("HTTP {status}: {}", body.trim()),
            })
        }
    }
}
