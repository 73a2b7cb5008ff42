//! Campaign send orchestration
//!
//! [`CampaignSender`] drives one campaign through a send pass: resolve
//! recipients, claim the campaign, select a transport, deliver to each
//! recipient in turn, and complete. Per-recipient failures are isolated:
//! a bad address or a provider hiccup is recorded against that recipient
//! and the pass moves on, so a campaign always terminates in `sent` with
//! honest counts once its pass has started.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::contacts::ContactStore;
use crate::delivery::{DeliveryStatus, DeliveryStore, NewDeliveryRecord};
use crate::email::{EmailSender, Mailer, OutboundEmail};
use crate::error::StoreError;

use super::{render, Campaign, CampaignStatus, CampaignStore, Recipient, RecipientResolver};

/// Outcome of one completed send pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SendSummary {
    /// Recipients the transport accepted
    pub sent_count: u32,
    /// Recipients whose attempt failed
    pub failed_count: u32,
    /// Size of the resolved recipient set
    pub total_recipients: u32,
}

/// Why a send pass could not start (or a status change could not apply)
#[derive(Debug, Error)]
pub enum SendError {
    /// No campaign with the given id
    #[error("Campaign not found")]
    NotFound,

    /// The campaign's current status does not permit the operation
    #[error("operation not permitted while campaign is {0}")]
    InvalidState(CampaignStatus),

    /// The campaign resolved to an empty recipient set
    #[error("No recipients found")]
    NoRecipients,

    /// No transport has usable credentials
    #[error("no email transport is configured")]
    NotConfigured,

    /// A store failed before or while the pass ran
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives campaigns through their send passes
pub struct CampaignSender {
    campaigns: Arc<dyn CampaignStore>,
    contacts: Arc<dyn ContactStore>,
    deliveries: Arc<dyn DeliveryStore>,
    mailer: Arc<Mailer>,
    default_from_address: String,
    default_from_name: Option<String>,
}

impl CampaignSender {
    /// Wire the orchestrator to its stores and transports
    #[must_use]
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        contacts: Arc<dyn ContactStore>,
        deliveries: Arc<dyn DeliveryStore>,
        mailer: Arc<Mailer>,
    ) -> Self {
        Self {
            campaigns,
            contacts,
            deliveries,
            mailer,
            default_from_address: String::new(),
            default_from_name: None,
        }
    }

    /// Sender identity used when a campaign does not set its own
    #[must_use]
    pub fn with_default_identity(
        mut self,
        from_address: impl Into<String>,
        from_name: Option<String>,
    ) -> Self {
        self.default_from_address = from_address.into();
        self.default_from_name = from_name;
        self
    }

    /// Trigger a send pass for a draft campaign
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] when the campaign is missing, not in `draft`,
    /// resolves no recipients, or no transport is configured. Once the pass
    /// starts, per-recipient failures are absorbed into the summary instead.
    pub async fn send(&self, id: Uuid) -> Result<SendSummary, SendError> {
        self.send_from(id, &[CampaignStatus::Draft]).await
    }

    /// Trigger a send pass for a scheduled campaign whose time has come
    pub(crate) async fn send_scheduled(&self, id: Uuid) -> Result<SendSummary, SendError> {
        self.send_from(id, &[CampaignStatus::Scheduled]).await
    }

    async fn send_from(
        &self,
        id: Uuid,
        allowed: &[CampaignStatus],
    ) -> Result<SendSummary, SendError> {
        let campaign = self.campaigns.fetch(id).await?.ok_or(SendError::NotFound)?;
        if !allowed.contains(&campaign.status) {
            return Err(SendError::InvalidState(campaign.status));
        }

        let recipients = RecipientResolver::new(self.contacts.as_ref())
            .resolve(&campaign)
            .await?;
        if recipients.is_empty() {
            return Err(SendError::NoRecipients);
        }
        if !self.mailer.any_configured() {
            return Err(SendError::NotConfigured);
        }

        let total = u32::try_from(recipients.len()).unwrap_or(u32::MAX);
        if !self.campaigns.claim_for_sending(id, total).await? {
            // Another trigger won the claim between our fetch and now.
            let status = self
                .campaigns
                .fetch(id)
                .await?
                .map_or(CampaignStatus::Sending, |c| c.status);
            return Err(SendError::InvalidState(status));
        }

        // One transport per pass.
        let backend = self.mailer.select();
        info!(
            campaign_id = %id,
            provider = %backend.provider(),
            recipients = total,
            "send pass starting"
        );

        let mut sent_count: u32 = 0;
        let mut failed_count: u32 = 0;
        for recipient in &recipients {
            if self.deliver_one(&campaign, recipient, backend.as_ref()).await {
                sent_count += 1;
            } else {
                failed_count += 1;
            }
        }

        self.campaigns.mark_sent(id, sent_count).await?;
        info!(
            campaign_id = %id,
            sent = sent_count,
            failed = failed_count,
            "send pass complete"
        );

        Ok(SendSummary {
            sent_count,
            failed_count,
            total_recipients: total,
        })
    }

    /// Deliver to one recipient and record the attempt
    ///
    /// Never propagates: the return value is the attempt's success, and
    /// every code path leaves a delivery record behind when the store
    /// cooperates.
    async fn deliver_one(
        &self,
        campaign: &Campaign,
        recipient: &Recipient,
        backend: &dyn EmailSender,
    ) -> bool {
        let attributes = recipient.attributes();
        let subject = render(&campaign.subject, &attributes);
        let html_body = campaign
            .html_body
            .as_deref()
            .map(|body| render(body, &attributes));
        let text_body = campaign
            .text_body
            .as_deref()
            .map(|body| render(body, &attributes));

        let from_address = if campaign.from_address.trim().is_empty() {
            self.default_from_address.as_str()
        } else {
            campaign.from_address.as_str()
        };
        let from_name = campaign
            .from_name
            .as_deref()
            .or(self.default_from_name.as_deref());

        let mut email = OutboundEmail::new(&recipient.email, &subject).from(from_address);
        if let Some(name) = from_name {
            email = email.from_name(name);
        }
        if let Some(reply_to) = &campaign.reply_to {
            email = email.reply_to(reply_to);
        }
        if let Some(body) = &html_body {
            email = email.html(body);
        }
        if let Some(body) = &text_body {
            email = email.text(body);
        }

        let outcome = backend.send(&email).await;

        let record = match &outcome {
            Ok(receipt) => NewDeliveryRecord {
                campaign_id: campaign.id,
                contact_id: Some(recipient.contact_id),
                user_id: campaign.user_id,
                to_email: recipient.email.clone(),
                subject,
                html_body,
                text_body,
                status: DeliveryStatus::Sent,
                provider: Some(receipt.provider.as_str().to_string()),
                provider_message_id: receipt.message_id.clone(),
                error: None,
                sent_at: Some(chrono::Utc::now()),
            },
            Err(err) => {
                warn!(
                    campaign_id = %campaign.id,
                    to = %recipient.email,
                    error = %err,
                    "recipient send failed"
                );
                NewDeliveryRecord {
                    campaign_id: campaign.id,
                    contact_id: Some(recipient.contact_id),
                    user_id: campaign.user_id,
                    to_email: recipient.email.clone(),
                    subject,
                    html_body,
                    text_body,
                    status: DeliveryStatus::Failed,
                    provider: Some(err.provider().as_str().to_string()),
                    provider_message_id: None,
                    error: Some(err.to_string()),
                    sent_at: None,
                }
            }
        };

        if let Err(err) = self.deliveries.insert(record).await {
            error!(
                campaign_id = %campaign.id,
                to = %recipient.email,
                error = %err,
                "failed to record delivery attempt"
            );
            return false;
        }

        outcome.is_ok()
    }

    /// Withdraw a scheduled or in-flight campaign from sending
    ///
    /// # Errors
    ///
    /// Returns [`SendError::NotFound`] when the campaign does not exist and
    /// [`SendError::InvalidState`] when its status has no pause arc.
    pub async fn pause(&self, id: Uuid) -> Result<(), SendError> {
        let changed = self
            .campaigns
            .set_status(
                id,
                &[CampaignStatus::Scheduled, CampaignStatus::Sending],
                CampaignStatus::Paused,
            )
            .await?;
        if changed {
            info!(campaign_id = %id, "campaign paused");
            return Ok(());
        }

        match self.campaigns.fetch(id).await? {
            None => Err(SendError::NotFound),
            Some(campaign) => Err(SendError::InvalidState(campaign.status)),
        }
    }

    /// Return a paused campaign to trigger eligibility
    ///
    /// A campaign with a scheduled time goes back to `scheduled`; one
    /// without goes back to `draft`. Returns the status it moved to.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::NotFound`] when the campaign does not exist and
    /// [`SendError::InvalidState`] when it is not paused.
    pub async fn resume(&self, id: Uuid) -> Result<CampaignStatus, SendError> {
        let campaign = self.campaigns.fetch(id).await?.ok_or(SendError::NotFound)?;
        if campaign.status != CampaignStatus::Paused {
            return Err(SendError::InvalidState(campaign.status));
        }

        let target = if campaign.scheduled_at.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Draft
        };
        let changed = self
            .campaigns
            .set_status(id, &[CampaignStatus::Paused], target)
            .await?;
        if changed {
            info!(campaign_id = %id, status = %target, "campaign resumed");
            Ok(target)
        } else {
            // Lost a race with a concurrent status change.
            let status = self
                .campaigns
                .fetch(id)
                .await?
                .map_or(CampaignStatus::Paused, |c| c.status);
            Err(SendError::InvalidState(status))
        }
    }
}
