//! Configuration management
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `MAILWAVE_` prefix)
//! 2. `./mailwave.toml`
//! 3. Hardcoded defaults (fallback)
//!
//! Provider credentials are deliberately modeled as `Option`s: the absence
//! of a hosted provider's credentials is a normal, detectable condition the
//! provider selector uses to skip it, never a runtime probe or an error.
//!
//! # Example Configuration
//!
//! ```toml
//! # mailwave.toml
//! [server]
//! host = "0.0.0.0"
//! port = 3000
//!
//! [database]
//! url = "postgres://localhost/mailwave"
//!
//! [email]
//! default_from_address = "noreply@example.com"
//! default_from_name = "Mailwave"
//! send_timeout_secs = 30
//!
//! [email.sendgrid]
//! api_key = "SG.xxxx"
//!
//! [email.smtp]
//! host = "smtp.example.com"
//! port = 587
//! username = "mailer"
//! password = "secret"
//!
//! [scheduler]
//! poll_interval_secs = 60
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection URL
    pub url: String,

    /// Maximum pool size
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/mailwave".to_string(),
            max_connections: 10,
        }
    }
}

/// SendGrid credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendGridSettings {
    /// API key (`SG.` prefixed)
    pub api_key: String,

    /// API base URL, overridable for testing
    #[serde(default = "SendGridSettings::default_base_url")]
    pub base_url: String,
}

impl SendGridSettings {
    fn default_base_url() -> String {
        "https://api.sendgrid.com".to_string()
    }

    /// Whether these credentials are actually usable
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Postmark credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostmarkSettings {
    /// Server token
    pub server_token: String,

    /// API base URL, overridable for testing
    #[serde(default = "PostmarkSettings::default_base_url")]
    pub base_url: String,
}

impl PostmarkSettings {
    fn default_base_url() -> String {
        "https://api.postmarkapp.com".to_string()
    }

    /// Whether these credentials are actually usable
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.server_token.trim().is_empty()
    }
}

/// SMTP submission settings
///
/// SMTP is the always-available last resort: the settings struct is never
/// optional, the backend itself reports a per-call configuration failure
/// when the password is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    /// Relay host
    pub host: String,

    /// Submission port
    pub port: u16,

    /// Relay username; falls back to the from address when absent
    pub username: Option<String>,

    /// Relay password; absence makes the SMTP backend unusable
    pub password: Option<String>,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: None,
            password: None,
        }
    }
}

impl SmtpSettings {
    /// Whether credentials are present
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Email sending settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    /// Sender address used when a campaign does not set one
    pub default_from_address: String,

    /// Sender display name used when a campaign does not set one
    pub default_from_name: Option<String>,

    /// Per-call transport timeout in seconds
    pub send_timeout_secs: u64,

    /// SendGrid credentials (preferred provider)
    pub sendgrid: Option<SendGridSettings>,

    /// Postmark credentials (second choice)
    pub postmark: Option<PostmarkSettings>,

    /// SMTP relay (unconditional fallback)
    pub smtp: SmtpSettings,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            default_from_address: "noreply@example.com".to_string(),
            default_from_name: Some("Mailwave".to_string()),
            send_timeout_secs: 30,
            sendgrid: None,
            postmark: None,
            smtp: SmtpSettings::default(),
        }
    }
}

/// Scheduler settings for deferred campaign sends
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Whether the scheduler loop runs at all
    pub enabled: bool,

    /// How often to poll for due scheduled campaigns, in seconds
    pub poll_interval_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 60,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Email sending settings
    #[serde(default)]
    pub email: EmailSettings,

    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

impl AppConfig {
    /// Load configuration from `./mailwave.toml` and `MAILWAVE_*` environment
    /// variables
    ///
    /// Environment variables take precedence and use `__` as the section
    /// separator, e.g. `MAILWAVE_EMAIL__SENDGRID__API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error when a source is present but malformed.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("mailwave.toml"))
                .merge(Env::prefixed("MAILWAVE_").split("__")),
        )
    }

    /// Load configuration from a specific TOML file plus the environment
    ///
    /// # Errors
    ///
    /// Returns an error when the file or environment is malformed.
    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(path))
                .merge(Env::prefixed("MAILWAVE_").split("__")),
        )
    }

    fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_fallbacks() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.email.send_timeout_secs, 30);
        assert!(config.email.sendgrid.is_none());
        assert!(config.email.postmark.is_none());
        assert!(!config.email.smtp.is_usable());
        assert!(config.scheduler.enabled);
    }

    #[test]
    fn toml_overrides_defaults() {
        let figment = Figment::new().merge(Toml::string(
            r#"
            [server]
            port = 8080

            [email]
            default_from_address = "hello@mailwave.dev"

            [email.sendgrid]
            api_key = "SG.test"

            [email.smtp]
            password = "hunter2"
            "#,
        ));

        let config = AppConfig::from_figment(figment).expect("config should parse");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.email.default_from_address, "hello@mailwave.dev");

        let sendgrid = config.email.sendgrid.expect("sendgrid section");
        assert!(sendgrid.is_usable());
        assert_eq!(sendgrid.base_url, "https://api.sendgrid.com");
        assert!(config.email.smtp.is_usable());
    }

    #[test]
    fn blank_credentials_are_not_usable() {
        let sendgrid = SendGridSettings {
            api_key: "   ".to_string(),
            base_url: SendGridSettings::default_base_url(),
        };
        assert!(!sendgrid.is_usable());

        let smtp = SmtpSettings {
            password: Some(String::new()),
            ..SmtpSettings::default()
        };
        assert!(!smtp.is_usable());
    }
}
