//! Provider selection
//!
//! The [`Mailer`] owns the concrete adapter set, built once from
//! configuration at startup. Selection is deterministic and fixed-priority:
//! SendGrid when configured, else Postmark when configured, else SMTP
//! unconditionally. The orchestrator selects once per send pass so every
//! recipient of a pass shares one transport.

use std::sync::Arc;

use tracing::info;

use crate::config::EmailSettings;

use super::{EmailSender, PostmarkBackend, SendGridBackend, SmtpBackend};

/// The configured adapter set and its selection policy
pub struct Mailer {
    sendgrid: Option<Arc<SendGridBackend>>,
    postmark: Option<Arc<PostmarkBackend>>,
    smtp: Arc<SmtpBackend>,
    #[cfg(test)]
    scripted: Option<Arc<dyn EmailSender>>,
}

impl Mailer {
    /// Build the adapter set from configuration
    ///
    /// Hosted providers with absent or blank credentials are simply not
    /// constructed; SMTP always is, and carries its own per-call
    /// configuration check.
    #[must_use]
    pub fn from_config(email: &EmailSettings) -> Self {
        let timeout = email.send_timeout_secs;

        let sendgrid = email
            .sendgrid
            .as_ref()
            .filter(|s| s.is_usable())
            .map(|s| Arc::new(SendGridBackend::new(s.clone(), timeout)));

        let postmark = email
            .postmark
            .as_ref()
            .filter(|s| s.is_usable())
            .map(|s| Arc::new(PostmarkBackend::new(s.clone(), timeout)));

        let smtp = Arc::new(SmtpBackend::new(
            email.smtp.clone(),
            email.default_from_address.clone(),
            timeout,
        ));

        Self {
            sendgrid,
            postmark,
            smtp,
            #[cfg(test)]
            scripted: None,
        }
    }

    /// A mailer that always selects the given backend
    #[cfg(test)]
    pub(crate) fn scripted(backend: Arc<dyn EmailSender>) -> Self {
        let smtp = Arc::new(SmtpBackend::new(
            crate::config::SmtpSettings::default(),
            String::new(),
            1,
        ));
        Self {
            sendgrid: None,
            postmark: None,
            smtp,
            scripted: Some(backend),
        }
    }

    /// Select the active transport in fixed priority order
    ///
    /// Never fails: SMTP is the always-available last resort, itself
    /// reporting failure per call when its credentials are absent.
    #[must_use]
    pub fn select(&self) -> Arc<dyn EmailSender> {
        #[cfg(test)]
        if let Some(backend) = &self.scripted {
            return backend.clone();
        }

        let backend: Arc<dyn EmailSender> = if let Some(sendgrid) = &self.sendgrid {
            sendgrid.clone()
        } else if let Some(postmark) = &self.postmark {
            postmark.clone()
        } else {
            self.smtp.clone()
        };

        info!(provider = %backend.provider(), "selected email backend");
        backend
    }

    /// Whether any transport at all has usable credentials
    ///
    /// When this is false a send pass cannot possibly deliver anything and
    /// fails up front as a configuration failure.
    #[must_use]
    pub fn any_configured(&self) -> bool {
        #[cfg(test)]
        if self.scripted.is_some() {
            return true;
        }

        self.sendgrid.is_some() || self.postmark.is_some() || self.smtp.is_configured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PostmarkSettings, SendGridSettings, SmtpSettings};
    use crate::email::Provider;

    fn sendgrid_settings() -> SendGridSettings {
        SendGridSettings {
            api_key: "SG.test".to_string(),
            base_url: "https://api.sendgrid.com".to_string(),
        }
    }

    fn postmark_settings() -> PostmarkSettings {
        PostmarkSettings {
            server_token: "pm-test".to_string(),
            base_url: "https://api.postmarkapp.com".to_string(),
        }
    }

    #[test]
    fn prefers_sendgrid_regardless_of_postmark() {
        let settings = EmailSettings {
            sendgrid: Some(sendgrid_settings()),
            postmark: Some(postmark_settings()),
            ..EmailSettings::default()
        };
        let mailer = Mailer::from_config(&settings);
        assert_eq!(mailer.select().provider(), Provider::SendGrid);
        assert!(mailer.any_configured());
    }

    #[test]
    fn falls_back_to_postmark_without_sendgrid() {
        let settings = EmailSettings {
            postmark: Some(postmark_settings()),
            ..EmailSettings::default()
        };
        let mailer = Mailer::from_config(&settings);
        assert_eq!(mailer.select().provider(), Provider::Postmark);
    }

    #[tokio::test]
    async fn falls_back_to_smtp_with_only_smtp_credentials() {
        let settings = EmailSettings {
            smtp: SmtpSettings {
                password: Some("hunter2".to_string()),
                ..SmtpSettings::default()
            },
            ..EmailSettings::default()
        };
        let mailer = Mailer::from_config(&settings);
        assert_eq!(mailer.select().provider(), Provider::Smtp);
        assert!(mailer.any_configured());
    }

    #[test]
    fn blank_hosted_credentials_do_not_count_as_configured() {
        let settings = EmailSettings {
            sendgrid: Some(SendGridSettings {
                api_key: "  ".to_string(),
                base_url: "https://api.sendgrid.com".to_string(),
            }),
            ..EmailSettings::default()
        };
        let mailer = Mailer::from_config(&settings);
        // Selection still answers (SMTP last resort), but nothing is usable.
        assert_eq!(mailer.select().provider(), Provider::Smtp);
        assert!(!mailer.any_configured());
    }
}
