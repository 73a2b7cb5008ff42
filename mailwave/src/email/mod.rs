//! Multi-provider email sending
//!
//! Three transports sit behind the [`EmailSender`] trait: two hosted
//! transactional APIs ([`SendGridBackend`], [`PostmarkBackend`]) and direct
//! SMTP submission ([`SmtpBackend`]). The [`Mailer`] selects exactly one of
//! them per send pass in fixed priority order.
//!
//! The adapter contract is deliberate: transport, auth, and validation
//! failures are *returned* as [`AdapterError`], never panicked or silently
//! swallowed. Callers treat an `Err` as a per-recipient failure and move on.

pub mod postmark;
pub mod selector;
pub mod sender;
pub mod sendgrid;
pub mod smtp;

pub use postmark::PostmarkBackend;
pub use selector::Mailer;
pub use sender::EmailSender;
pub use sendgrid::SendGridBackend;
pub use smtp::SmtpBackend;

use thiserror::Error;

/// Identifies one of the configured transports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// SendGrid v3 mail send API
    SendGrid,
    /// Postmark email API
    Postmark,
    /// Direct SMTP submission
    Smtp,
}

impl Provider {
    /// Stable identifier persisted on delivery records
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SendGrid => "sendgrid",
            Self::Postmark => "postmark",
            Self::Smtp => "smtp",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file attached to an outbound email
#[derive(Debug, Clone)]
pub struct Attachment {
    /// File name shown to the recipient
    pub filename: String,
    /// MIME type, e.g. `application/pdf`
    pub content_type: String,
    /// Raw file bytes
    pub content: Vec<u8>,
}

/// One fully-rendered email, ready for a transport
///
/// # Examples
///
/// ```rust
/// use mailwave::email::OutboundEmail;
///
/// let email = OutboundEmail::new("ann@example.com", "Welcome!")
///     .from("noreply@mailwave.dev")
///     .from_name("Mailwave")
///     .text("Hello, Ann!");
/// assert_eq!(email.formatted_from(), "Mailwave <noreply@mailwave.dev>");
/// ```
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    /// Recipient address
    pub to: String,
    /// Rendered subject line
    pub subject: String,
    /// Rendered HTML body, if any
    pub html_body: Option<String>,
    /// Rendered plain-text body, if any
    pub text_body: Option<String>,
    /// Sender address
    pub from_address: String,
    /// Sender display name
    pub from_name: Option<String>,
    /// Reply-To address
    pub reply_to: Option<String>,
    /// Attachments
    pub attachments: Vec<Attachment>,
}

impl OutboundEmail {
    /// Start building an email to one recipient
    #[must_use]
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html_body: None,
            text_body: None,
            from_address: String::new(),
            from_name: None,
            reply_to: None,
            attachments: Vec::new(),
        }
    }

    /// Set the sender address
    #[must_use]
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from_address = address.into();
        self
    }

    /// Set the sender display name
    #[must_use]
    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = Some(name.into());
        self
    }

    /// Set the Reply-To address
    #[must_use]
    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    /// Set the HTML body
    #[must_use]
    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self
    }

    /// Set the plain-text body
    #[must_use]
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.text_body = Some(body.into());
        self
    }

    /// Attach a file
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// RFC 5322 style `From` header value: `Name <address>` or bare address
    #[must_use]
    pub fn formatted_from(&self) -> String {
        match self.from_name.as_deref() {
            Some(name) if !name.is_empty() => format!("{name} <{}>", self.from_address),
            _ => self.from_address.clone(),
        }
    }
}

/// What a transport reports back for one accepted message
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Which transport accepted the message
    pub provider: Provider,
    /// Provider-assigned message id, when the transport supplies one
    pub message_id: Option<String>,
}

/// A failed send attempt, returned (never raised) by adapters
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The adapter's own credentials are missing or unusable
    #[error("{provider} is not configured: {reason}")]
    NotConfigured {
        /// Transport that refused to run
        provider: Provider,
        /// Human-readable reason
        reason: String,
    },

    /// Network or protocol failure while talking to the transport
    #[error("transport failure via {provider}: {message}")]
    Transport {
        /// Transport that failed
        provider: Provider,
        /// Human-readable error detail
        message: String,
    },

    /// The transport understood the request and rejected it
    #[error("{provider} rejected the message: {message}")]
    Rejected {
        /// Transport that rejected the message
        provider: Provider,
        /// Human-readable rejection detail
        message: String,
    },

    /// The transport did not answer within the configured deadline
    #[error("timed out after {seconds}s waiting on {provider}")]
    Timeout {
        /// Transport that timed out
        provider: Provider,
        /// Configured deadline
        seconds: u64,
    },
}

impl AdapterError {
    /// Transport the failure is attributed to
    #[must_use]
    pub fn provider(&self) -> Provider {
        match self {
            Self::NotConfigured { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Rejected { provider, .. }
            | Self::Timeout { provider, .. } => *provider,
        }
    }
}

/// Map a `reqwest` failure onto the adapter error taxonomy
pub(crate) fn classify_http_error(
    provider: Provider,
    timeout_secs: u64,
    err: &reqwest::Error,
) -> AdapterError {
    if err.is_timeout() {
        AdapterError::Timeout {
            provider,
            seconds: timeout_secs,
        }
    } else {
        AdapterError::Transport {
            provider,
            message: err.to_string(),
        }
    }
}
