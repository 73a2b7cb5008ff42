//! Asynchronous delivery events
//!
//! Providers report what happened to a message after the send pass handed
//! it over: delivery confirmations, opens, clicks, bounces, complaints.
//! Events correlate back to a [`DeliveryRecord`](super::DeliveryRecord)
//! through the provider-assigned message id and fan out into record
//! updates, contact status flips, and campaign engagement counters.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::campaigns::{CampaignStore, EngagementCounter};
use crate::contacts::{ContactStatus, ContactStore};
use crate::error::StoreError;

use super::{DeliveryStatus, DeliveryStore};

/// What a provider reported about a delivered message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryEventKind {
    /// The message reached the recipient's mailbox
    Delivered,
    /// The recipient opened the message
    Opened,
    /// The recipient clicked a link in the message
    Clicked,
    /// The message hard-bounced
    Bounced,
    /// The provider dropped the message before delivery
    Dropped,
    /// The recipient flagged the message as spam
    Spam,
    /// The recipient unsubscribed
    Unsubscribed,
}

impl DeliveryEventKind {
    /// Map a provider's event name onto a kind
    ///
    /// Both SendGrid's (`open`, `click`, `spamreport`) and Postmark's
    /// (`Open`, `Click`, `SpamComplaint`) spellings are accepted.
    #[must_use]
    pub fn from_provider_event(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "delivered" | "delivery" => Some(Self::Delivered),
            "open" | "opened" => Some(Self::Opened),
            "click" | "clicked" => Some(Self::Clicked),
            "bounce" | "bounced" => Some(Self::Bounced),
            "dropped" => Some(Self::Dropped),
            "spam" | "spamreport" | "spamcomplaint" => Some(Self::Spam),
            "unsubscribe" | "unsubscribed" => Some(Self::Unsubscribed),
            _ => None,
        }
    }

    /// The delivery-record status this event moves the record to, if any
    ///
    /// Opens, clicks, and unsubscribes touch only their timestamp; the
    /// record keeps its terminal delivery status.
    #[must_use]
    pub fn record_status(self) -> Option<DeliveryStatus> {
        match self {
            Self::Delivered => Some(DeliveryStatus::Delivered),
            Self::Bounced => Some(DeliveryStatus::Bounced),
            Self::Dropped => Some(DeliveryStatus::Dropped),
            Self::Spam => Some(DeliveryStatus::Spam),
            Self::Opened | Self::Clicked | Self::Unsubscribed => None,
        }
    }

    /// The contact status flip this event triggers, if any
    #[must_use]
    pub fn contact_status(self) -> Option<ContactStatus> {
        match self {
            Self::Bounced => Some(ContactStatus::Bounced),
            Self::Unsubscribed => Some(ContactStatus::Unsubscribed),
            _ => None,
        }
    }

    /// The campaign engagement counter this event bumps, if any
    #[must_use]
    pub fn counter(self) -> Option<EngagementCounter> {
        match self {
            Self::Opened => Some(EngagementCounter::Opened),
            Self::Clicked => Some(EngagementCounter::Clicked),
            Self::Bounced => Some(EngagementCounter::Bounced),
            Self::Unsubscribed => Some(EngagementCounter::Unsubscribed),
            Self::Delivered | Self::Dropped | Self::Spam => None,
        }
    }
}

/// One provider-reported event, already parsed from the webhook payload
#[derive(Debug, Clone)]
pub struct DeliveryEvent {
    /// Provider-assigned id of the message the event refers to
    pub provider_message_id: String,
    /// What happened
    pub kind: DeliveryEventKind,
    /// When the provider says it happened
    pub occurred_at: DateTime<Utc>,
    /// Provider-supplied detail, e.g. a drop reason
    pub reason: Option<String>,
}

/// Applies delivery events across records, contacts, and campaigns
pub struct DeliveryEventProcessor {
    deliveries: Arc<dyn DeliveryStore>,
    contacts: Arc<dyn ContactStore>,
    campaigns: Arc<dyn CampaignStore>,
}

impl DeliveryEventProcessor {
    /// Wire the processor to its stores
    #[must_use]
    pub fn new(
        deliveries: Arc<dyn DeliveryStore>,
        contacts: Arc<dyn ContactStore>,
        campaigns: Arc<dyn CampaignStore>,
    ) -> Self {
        Self {
            deliveries,
            contacts,
            campaigns,
        }
    }

    /// Apply one event
    ///
    /// Returns `false` when no delivery record matches the event's message
    /// id; unmatched events are logged and dropped rather than treated as
    /// failures, since providers replay events and report on mail sent
    /// outside this system.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when any of the stores fail.
    pub async fn process(&self, event: &DeliveryEvent) -> Result<bool, StoreError> {
        let Some(record) = self
            .deliveries
            .find_by_message_id(&event.provider_message_id)
            .await?
        else {
            warn!(
                message_id = %event.provider_message_id,
                kind = ?event.kind,
                "delivery event matches no record, dropping"
            );
            return Ok(false);
        };

        self.deliveries.record_event(record.id, event).await?;

        if let Some(status) = event.kind.contact_status() {
            if let Some(contact_id) = record.contact_id {
                self.contacts.set_status(contact_id, status).await?;
            }
        }

        if let Some(counter) = event.kind.counter() {
            self.campaigns
                .increment_counter(record.campaign_id, counter)
                .await?;
        }

        debug!(
            record_id = %record.id,
            campaign_id = %record.campaign_id,
            kind = ?event.kind,
            "delivery event applied"
        );
        Ok(true)
    }
}
