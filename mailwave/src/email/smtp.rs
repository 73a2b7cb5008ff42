//! SMTP backend
//!
//! Direct submission through a configured relay via `lettre`. This is the
//! unconditional last resort in the provider priority order: the backend
//! always constructs, and reports a per-call `NotConfigured` failure when
//! its credentials are absent.

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment as MessagePart, Body, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, warn};

use crate::config::SmtpSettings;

use super::{AdapterError, EmailSender, OutboundEmail, Provider, SendReceipt};

/// SMTP relay backend
pub struct SmtpBackend {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    host: String,
}

enum BodyContent {
    Single(SinglePart),
    Multi(MultiPart),
}

impl SmtpBackend {
    /// Create a backend from relay settings
    ///
    /// `fallback_username` is used as the relay login when the settings omit
    /// one, matching the convention of authenticating as the sending
    /// address. A backend without a usable password still constructs; its
    /// `send` reports `NotConfigured` per call.
    #[must_use]
    pub fn new(
        settings: SmtpSettings,
        fallback_username: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let fallback_username = fallback_username.into();
        let host = settings.host.clone();

        let transport = if settings.is_usable() {
            match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host) {
                Ok(builder) => {
                    let username = settings
                        .username
                        .clone()
                        .filter(|u| !u.is_empty())
                        .unwrap_or(fallback_username);
                    let password = settings.password.clone().unwrap_or_default();
                    Some(
                        builder
                            .port(settings.port)
                            .credentials(Credentials::new(username, password))
                            .timeout(Some(Duration::from_secs(timeout_secs)))
                            .build(),
                    )
                }
                Err(err) => {
                    warn!(host = %settings.host, error = %err, "failed to construct smtp transport");
                    None
                }
            }
        } else {
            None
        };

        Self { transport, host }
    }

    /// Whether the relay has usable credentials
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    fn parse_address(raw: &str) -> Result<Address, AdapterError> {
        raw.parse::<Address>().map_err(|e| AdapterError::Rejected {
            provider: Provider::Smtp,
            message: format!("invalid address {raw:?}: {e}"),
        })
    }

    fn build_message(email: &OutboundEmail) -> Result<Message, AdapterError> {
        let from = Mailbox::new(
            email.from_name.clone().filter(|n| !n.is_empty()),
            Self::parse_address(&email.from_address)?,
        );
        let to = Mailbox::new(None, Self::parse_address(&email.to)?);

        let mut builder = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.clone());
        if let Some(reply_to) = email.reply_to.as_deref().filter(|r| !r.is_empty()) {
            builder = builder.reply_to(Mailbox::new(None, Self::parse_address(reply_to)?));
        }

        let content = match (&email.html_body, &email.text_body) {
            (Some(html), Some(text)) => {
                BodyContent::Multi(MultiPart::alternative_plain_html(text.clone(), html.clone()))
            }
            (Some(html), None) => BodyContent::Single(SinglePart::html(html.clone())),
            (None, Some(text)) => BodyContent::Single(SinglePart::plain(text.clone())),
            (None, None) => BodyContent::Single(SinglePart::plain(String::new())),
        };

        let built = if email.attachments.is_empty() {
            match content {
                BodyContent::Single(part) => builder.singlepart(part),
                BodyContent::Multi(part) => builder.multipart(part),
            }
        } else {
            let mut mixed = match content {
                BodyContent::Single(part) => MultiPart::mixed().singlepart(part),
                BodyContent::Multi(part) => MultiPart::mixed().multipart(part),
            };
            for attachment in &email.attachments {
                let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                    AdapterError::Rejected {
                        provider: Provider::Smtp,
                        message: format!(
                            "invalid attachment content type {:?}: {e}",
                            attachment.content_type
                        ),
                    }
                })?;
                mixed = mixed.singlepart(
                    MessagePart::new(attachment.filename.clone())
                        .body(Body::new(attachment.content.clone()), content_type),
                );
            }
            builder.multipart(mixed)
        };

        built.map_err(|e| AdapterError::Rejected {
            provider: Provider::Smtp,
            message: format!("message build failed: {e}"),
        })
    }
}

#[async_trait]
impl EmailSender for SmtpBackend {
    fn provider(&self) -> Provider {
        Provider::Smtp
    }

    async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, AdapterError> {
        let Some(transport) = &self.transport else {
            return Err(AdapterError::NotConfigured {
                provider: Provider::Smtp,
                reason: "SMTP password not configured".to_string(),
            });
        };

        let message = Self::build_message(email)?;

        match transport.send(message).await {
            Ok(_) => {
                debug!(to = %email.to, host = %self.host, "smtp relay accepted message");
                // SMTP gives back no provider-assigned message id
                Ok(SendReceipt {
                    provider: Provider::Smtp,
                    message_id: None,
                })
            }
            Err(e) => Err(AdapterError::Transport {
                provider: Provider::Smtp,
                message: e.to_string(),
            }),
        }
    }
}
