//! Scheduled campaign dispatch
//!
//! A background loop that periodically asks the campaign store for
//! scheduled campaigns whose send time has passed and hands each one to
//! the orchestrator. The claim inside the orchestrator makes the tick
//! safe against overlap with manual triggers and other instances.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{CampaignSender, CampaignStore, SendError};

/// Periodically dispatches due scheduled campaigns
pub struct CampaignScheduler {
    sender: Arc<CampaignSender>,
    campaigns: Arc<dyn CampaignStore>,
    poll_interval: Duration,
}

impl CampaignScheduler {
    /// Wire the scheduler to the orchestrator and campaign store
    #[must_use]
    pub fn new(
        sender: Arc<CampaignSender>,
        campaigns: Arc<dyn CampaignStore>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            sender,
            campaigns,
            poll_interval,
        }
    }

    /// Run the polling loop until the task is dropped
    pub async fn run(self) {
        info!(interval_secs = self.poll_interval.as_secs(), "campaign scheduler running");
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// Dispatch every scheduled campaign whose time has passed
    ///
    /// Failures are contained per campaign: one campaign losing its claim
    /// or resolving no recipients never blocks the rest of the batch.
    pub async fn tick(&self) {
        let due = match self.campaigns.due_scheduled(Utc::now()).await {
            Ok(due) => due,
            Err(err) => {
                warn!(error = %err, "scheduler could not query due campaigns");
                return;
            }
        };
        if due.is_empty() {
            return;
        }

        debug!(count = due.len(), "dispatching due scheduled campaigns");
        for campaign in due {
            match self.sender.send_scheduled(campaign.id).await {
                Ok(summary) => info!(
                    campaign_id = %campaign.id,
                    sent = summary.sent_count,
                    failed = summary.failed_count,
                    "scheduled campaign dispatched"
                ),
                // Losing the claim to a concurrent trigger is routine.
                Err(SendError::InvalidState(status)) => debug!(
                    campaign_id = %campaign.id,
                    status = %status,
                    "scheduled campaign no longer eligible"
                ),
                Err(err) => warn!(
                    campaign_id = %campaign.id,
                    error = %err,
                    "scheduled campaign dispatch failed"
                ),
            }
        }
    }
}
