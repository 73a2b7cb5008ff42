//! Delivery records: the durable email log
//!
//! One record per (campaign, recipient) send attempt, created by the send
//! orchestrator with the rendered content actually sent. Records are
//! immutable after creation except for the lifecycle status/timestamp
//! fields that asynchronous delivery events update.

pub mod events;
pub mod store;

pub use events::{DeliveryEvent, DeliveryEventKind, DeliveryEventProcessor};
pub use store::{DeliveryStore, PgDeliveryStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle status of one send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Created but not yet handed to a transport
    Pending,
    /// Accepted by the transport
    Sent,
    /// Confirmed delivered by a delivery event
    Delivered,
    /// The transport refused or failed the message
    Failed,
    /// Hard bounce reported
    Bounced,
    /// Spam complaint reported
    Spam,
    /// Dropped by the provider before delivery
    Dropped,
}

impl DeliveryStatus {
    /// Storage/display form
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Bounced => "bounced",
            Self::Spam => "spam",
            Self::Dropped => "dropped",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The durable record of one send attempt to one recipient
#[derive(Debug, Clone, FromRow)]
pub struct DeliveryRecord {
    /// Identity
    pub id: Uuid,
    /// Campaign the attempt belongs to
    pub campaign_id: Uuid,
    /// Resolved contact, when known
    pub contact_id: Option<Uuid>,
    /// Owning user account
    pub user_id: Uuid,
    /// Recipient address
    pub to_email: String,
    /// Rendered subject actually sent
    pub subject: String,
    /// Rendered HTML body actually sent
    pub html_body: Option<String>,
    /// Rendered plain-text body actually sent
    pub text_body: Option<String>,
    /// Lifecycle status
    pub status: DeliveryStatus,
    /// Transport that handled the attempt
    pub provider: Option<String>,
    /// Provider-assigned message id
    pub provider_message_id: Option<String>,
    /// Error detail for failed attempts
    pub error: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// When the transport accepted the message
    pub sent_at: Option<DateTime<Utc>>,
    /// When delivery was confirmed
    pub delivered_at: Option<DateTime<Utc>>,
    /// First reported open
    pub opened_at: Option<DateTime<Utc>>,
    /// First reported click
    pub clicked_at: Option<DateTime<Utc>>,
    /// When a bounce was reported
    pub bounced_at: Option<DateTime<Utc>>,
    /// When the recipient unsubscribed
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

/// Fields the orchestrator supplies when recording one attempt
#[derive(Debug, Clone)]
pub struct NewDeliveryRecord {
    /// Campaign the attempt belongs to
    pub campaign_id: Uuid,
    /// Resolved contact
    pub contact_id: Option<Uuid>,
    /// Owning user account
    pub user_id: Uuid,
    /// Recipient address
    pub to_email: String,
    /// Rendered subject actually sent
    pub subject: String,
    /// Rendered HTML body actually sent
    pub html_body: Option<String>,
    /// Rendered plain-text body actually sent
    pub text_body: Option<String>,
    /// Outcome status (`sent` or `failed`)
    pub status: DeliveryStatus,
    /// Transport that handled the attempt
    pub provider: Option<String>,
    /// Provider-assigned message id
    pub provider_message_id: Option<String>,
    /// Error detail for failed attempts
    pub error: Option<String>,
    /// Acceptance time, set only on success
    pub sent_at: Option<DateTime<Utc>>,
}
