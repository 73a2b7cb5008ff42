//! Campaign persistence
//!
//! `claim_for_sending` is the concurrency linchpin: flipping a campaign to
//! `sending` is an optimistic, guarded update so that two concurrent send
//! triggers can never both win the claim and double-send.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;

use super::{Campaign, CampaignKind, CampaignStatus};

/// Fields supplied when composing a new campaign
#[derive(Debug, Clone)]
pub struct NewCampaign {
    /// Owning user account
    pub user_id: Uuid,
    /// Display name
    pub name: String,
    /// Campaign kind
    pub kind: CampaignKind,
    /// Subject template
    pub subject: String,
    /// HTML body template
    pub html_body: Option<String>,
    /// Plain-text body template
    pub text_body: Option<String>,
    /// Sender address (callers apply configured defaults before insert)
    pub from_address: String,
    /// Sender display name
    pub from_name: Option<String>,
    /// Reply-To address
    pub reply_to: Option<String>,
    /// Referenced contact lists
    pub list_ids: Vec<Uuid>,
    /// Deferred send time; setting it arms the campaign as `scheduled`
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Kind-specific composition data
    pub settings: serde_json::Value,
}

/// Aggregate counters bumped by delivery events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementCounter {
    /// An open was reported
    Opened,
    /// A click was reported
    Clicked,
    /// A bounce was reported
    Bounced,
    /// An unsubscribe was reported
    Unsubscribed,
}

impl EngagementCounter {
    fn column(self) -> &'static str {
        match self {
            Self::Opened => "opened_count",
            Self::Clicked => "clicked_count",
            Self::Bounced => "bounced_count",
            Self::Unsubscribed => "unsubscribed_count",
        }
    }
}

/// Read/update access to campaigns
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Fetch one campaign by id
    async fn fetch(&self, id: Uuid) -> Result<Option<Campaign>, StoreError>;

    /// Insert a newly composed campaign
    async fn insert(&self, new: NewCampaign) -> Result<Campaign, StoreError>;

    /// All campaigns owned by a user, newest first
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Campaign>, StoreError>;

    /// Atomically move a trigger-eligible campaign to `sending` and persist
    /// its resolved recipient count
    ///
    /// Returns `false` when the campaign was not in `draft` or `scheduled`
    /// anymore, i.e. another trigger won the claim.
    async fn claim_for_sending(&self, id: Uuid, recipient_count: u32) -> Result<bool, StoreError>;

    /// Complete a send pass: `sent` status, `sent_at`, final delivered count
    async fn mark_sent(&self, id: Uuid, delivered_count: u32) -> Result<(), StoreError>;

    /// Guarded status flip: applies only while the status is one of `from`
    ///
    /// Returns whether a row actually changed.
    async fn set_status(
        &self,
        id: Uuid,
        from: &[CampaignStatus],
        to: CampaignStatus,
    ) -> Result<bool, StoreError>;

    /// Scheduled campaigns whose deferred send time has passed
    async fn due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Campaign>, StoreError>;

    /// Bump one aggregate engagement counter
    async fn increment_counter(
        &self,
        id: Uuid,
        counter: EngagementCounter,
    ) -> Result<(), StoreError>;
}

/// Postgres-backed campaign store
#[derive(Clone)]
pub struct PgCampaignStore {
    pool: PgPool,
}

impl PgCampaignStore {
    /// Wrap a connection pool
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignStore for PgCampaignStore {
    async fn fetch(&self, id: Uuid) -> Result<Option<Campaign>, StoreError> {
        let campaign = sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(campaign)
    }

    async fn insert(&self, new: NewCampaign) -> Result<Campaign, StoreError> {
        let status = if new.scheduled_at.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Draft
        };

        let campaign = sqlx::query_as::<_, Campaign>(
            r"
            INSERT INTO campaigns (
                id, user_id, name, kind, subject, html_body, text_body,
                from_address, from_name, reply_to, list_ids, status,
                settings, scheduled_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.name)
        .bind(new.kind)
        .bind(&new.subject)
        .bind(&new.html_body)
        .bind(&new.text_body)
        .bind(&new.from_address)
        .bind(&new.from_name)
        .bind(&new.reply_to)
        .bind(&new.list_ids)
        .bind(status)
        .bind(Json(new.settings))
        .bind(new.scheduled_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(campaign)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Campaign>, StoreError> {
        let campaigns = sqlx::query_as::<_, Campaign>(
            "SELECT * FROM campaigns WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(campaigns)
    }

    async fn claim_for_sending(&self, id: Uuid, recipient_count: u32) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE campaigns
            SET status = 'sending', recipient_count = $2
            WHERE id = $1 AND status IN ('draft', 'scheduled')
            ",
        )
        .bind(id)
        .bind(i32::try_from(recipient_count).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_sent(&self, id: Uuid, delivered_count: u32) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE campaigns
            SET status = 'sent', sent_at = now(), delivered_count = $2
            WHERE id = $1 AND status = 'sending'
            ",
        )
        .bind(id)
        .bind(i32::try_from(delivered_count).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_status(
        &self,
        id: Uuid,
        from: &[CampaignStatus],
        to: CampaignStatus,
    ) -> Result<bool, StoreError> {
        let from: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();
        let result = sqlx::query(
            "UPDATE campaigns SET status = $3 WHERE id = $1 AND status = ANY($2)",
        )
        .bind(id)
        .bind(&from)
        .bind(to)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Campaign>, StoreError> {
        let campaigns = sqlx::query_as::<_, Campaign>(
            r"
            SELECT *
            FROM campaigns
            WHERE status = 'scheduled'
              AND scheduled_at IS NOT NULL
              AND scheduled_at <= $1
            ORDER BY scheduled_at
            ",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(campaigns)
    }

    async fn increment_counter(
        &self,
        id: Uuid,
        counter: EngagementCounter,
    ) -> Result<(), StoreError> {
        // Column name comes from a fixed enum, never from input.
        let column = counter.column();
        let query = format!("UPDATE campaigns SET {column} = {column} + 1 WHERE id = $1");
        sqlx::query(&query).bind(id).execute(&self.pool).await?;
        Ok(())
    }
}
