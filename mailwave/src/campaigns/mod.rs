//! Campaigns: the outbound send domain
//!
//! A campaign owns its content (subject and body templates, sender
//! identity), its targeting (list references), its lifecycle status, and the
//! aggregate counters the dashboard reads. Status and counters are mutated
//! only by the send orchestrator once sending starts; content is mutated
//! only by the composing user before that.

pub mod personalize;
pub mod recipients;
pub mod schedule;
pub mod send;
pub mod store;

pub use personalize::render;
pub use recipients::{Recipient, RecipientResolver};
pub use schedule::CampaignScheduler;
pub use send::{CampaignSender, SendError, SendSummary};
pub use store::{CampaignStore, EngagementCounter, NewCampaign, PgCampaignStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Campaign lifecycle status
///
/// Happy path is `draft → sending → sent`, with `draft → scheduled →
/// sending` for deferred sends and pause/resume arcs off `scheduled` and
/// `sending`. `sent` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    /// Being composed; sendable
    Draft,
    /// Armed for a deferred send
    Scheduled,
    /// A send pass is in flight
    Sending,
    /// Terminal: the send pass completed
    Sent,
    /// Withdrawn from trigger eligibility
    Paused,
}

impl CampaignStatus {
    /// Storage/display form
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Paused => "paused",
        }
    }

    /// Whether the state machine permits moving to `next`
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Scheduled | Self::Sending)
                | (Self::Scheduled, Self::Sending | Self::Paused)
                | (Self::Sending, Self::Sent | Self::Paused)
                | (Self::Paused, Self::Draft | Self::Scheduled)
        )
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of campaign this row describes
///
/// Only one-time campaigns flow through the send orchestrator; drip
/// sequences and A/B tests carry their composition in [`Campaign::settings`]
/// and are expanded into one-time sends by the composing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignKind {
    /// A single outbound send
    OneTime,
    /// A triggered email sequence
    Drip,
    /// A split test between content variants
    AbTest,
}

/// One outbound email send definition
#[derive(Debug, Clone, FromRow)]
pub struct Campaign {
    /// Identity
    pub id: Uuid,
    /// Owning user account
    pub user_id: Uuid,
    /// Display name
    pub name: String,
    /// Campaign kind
    pub kind: CampaignKind,
    /// Subject template (`{{placeholder}}` substitution applies)
    pub subject: String,
    /// HTML body template
    pub html_body: Option<String>,
    /// Plain-text body template
    pub text_body: Option<String>,
    /// Sender address
    pub from_address: String,
    /// Sender display name
    pub from_name: Option<String>,
    /// Reply-To address
    pub reply_to: Option<String>,
    /// Referenced contact lists; empty means "all active contacts of the owner"
    pub list_ids: Vec<Uuid>,
    /// Lifecycle status
    pub status: CampaignStatus,
    /// Kind-specific composition data (drip sequence, A/B split, ...)
    pub settings: Json<serde_json::Value>,
    /// Resolved recipient count, persisted when sending starts
    pub recipient_count: i32,
    /// Successful sends of the pass; webhook events never lower it
    pub delivered_count: i32,
    /// Unique opens reported by delivery events
    pub opened_count: i32,
    /// Clicks reported by delivery events
    pub clicked_count: i32,
    /// Bounces reported by delivery events
    pub bounced_count: i32,
    /// Unsubscribes reported by delivery events
    pub unsubscribed_count: i32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Deferred send time, when scheduled
    pub scheduled_at: Option<DateTime<Utc>>,
    /// When the send pass completed
    pub sent_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_permitted() {
        assert!(CampaignStatus::Draft.can_transition_to(CampaignStatus::Sending));
        assert!(CampaignStatus::Draft.can_transition_to(CampaignStatus::Scheduled));
        assert!(CampaignStatus::Scheduled.can_transition_to(CampaignStatus::Sending));
        assert!(CampaignStatus::Sending.can_transition_to(CampaignStatus::Sent));
    }

    #[test]
    fn pause_and_resume_arcs_are_permitted() {
        assert!(CampaignStatus::Scheduled.can_transition_to(CampaignStatus::Paused));
        assert!(CampaignStatus::Sending.can_transition_to(CampaignStatus::Paused));
        assert!(CampaignStatus::Paused.can_transition_to(CampaignStatus::Scheduled));
        assert!(CampaignStatus::Paused.can_transition_to(CampaignStatus::Draft));
    }

    #[test]
    fn sent_is_terminal() {
        for next in [
            CampaignStatus::Draft,
            CampaignStatus::Scheduled,
            CampaignStatus::Sending,
            CampaignStatus::Paused,
        ] {
            assert!(!CampaignStatus::Sent.can_transition_to(next));
        }
    }

    #[test]
    fn draft_cannot_jump_to_sent() {
        assert!(!CampaignStatus::Draft.can_transition_to(CampaignStatus::Sent));
    }
}
