//! Email sender trait abstraction
//!
//! This module defines the core `EmailSender` trait that all transport
//! backends implement.

use async_trait::async_trait;

use super::{AdapterError, OutboundEmail, Provider, SendReceipt};

/// Uniform send contract over one external transport
///
/// Implemented by all backends (SMTP, SendGrid, Postmark).
///
/// Implementations must not panic and must not propagate transport failures
/// as anything other than a returned [`AdapterError`]: a bad address, an
/// auth failure, or a provider outage is a per-message outcome, not a fault
/// of the caller. The only short-circuit allowed before a network call is a
/// missing-credentials check, reported as [`AdapterError::NotConfigured`].
///
/// # Examples
///
/// ```rust,no_run
/// use mailwave::config::SmtpSettings;
/// use mailwave::email::{EmailSender, OutboundEmail, SmtpBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sender = SmtpBackend::new(SmtpSettings::default(), "noreply@example.com", 30);
///
/// let email = OutboundEmail::new("user@example.com", "Hello!")
///     .from("noreply@example.com")
///     .text("Hello, World!");
///
/// let receipt = sender.send(&email).await?;
/// println!("sent via {}", receipt.provider);
/// # Ok(())
/// # }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Which transport this backend drives
    fn provider(&self) -> Provider;

    /// Send one email
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the transport is unconfigured, rejects
    /// the message, fails, or times out. Never panics.
    async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, AdapterError>;
}
