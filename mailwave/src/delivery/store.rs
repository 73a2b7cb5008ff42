//! Delivery record persistence

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;

use super::{events::DeliveryEvent, DeliveryRecord, NewDeliveryRecord};

/// Append/query access to the email log
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Record one send attempt; returns the new record's id
    async fn insert(&self, record: NewDeliveryRecord) -> Result<Uuid, StoreError>;

    /// Look up the record a provider message id refers to
    async fn find_by_message_id(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<DeliveryRecord>, StoreError>;

    /// All records of one campaign's send pass
    async fn for_campaign(&self, campaign_id: Uuid) -> Result<Vec<DeliveryRecord>, StoreError>;

    /// Apply a delivery event's status/timestamp updates to one record
    async fn record_event(&self, id: Uuid, event: &DeliveryEvent) -> Result<(), StoreError>;
}

/// Postgres-backed delivery store
#[derive(Clone)]
pub struct PgDeliveryStore {
    pool: PgPool,
}

impl PgDeliveryStore {
    /// Wrap a connection pool
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryStore for PgDeliveryStore {
    async fn insert(&self, record: NewDeliveryRecord) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r"
            INSERT INTO delivery_records (
                id, campaign_id, contact_id, user_id, to_email, subject,
                html_body, text_body, status, provider, provider_message_id,
                error, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(id)
        .bind(record.campaign_id)
        .bind(record.contact_id)
        .bind(record.user_id)
        .bind(&record.to_email)
        .bind(&record.subject)
        .bind(&record.html_body)
        .bind(&record.text_body)
        .bind(record.status)
        .bind(&record.provider)
        .bind(&record.provider_message_id)
        .bind(&record.error)
        .bind(record.sent_at)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn find_by_message_id(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<DeliveryRecord>, StoreError> {
        let record = sqlx::query_as::<_, DeliveryRecord>(
            "SELECT * FROM delivery_records WHERE provider_message_id = $1",
        )
        .bind(provider_message_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn for_campaign(&self, campaign_id: Uuid) -> Result<Vec<DeliveryRecord>, StoreError> {
        let records = sqlx::query_as::<_, DeliveryRecord>(
            "SELECT * FROM delivery_records WHERE campaign_id = $1 ORDER BY created_at, id",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn record_event(&self, id: Uuid, event: &DeliveryEvent) -> Result<(), StoreError> {
        use super::DeliveryEventKind as Kind;

        let query = match event.kind {
            Kind::Delivered => {
                sqlx::query(
                    "UPDATE delivery_records SET status = 'delivered', delivered_at = $2 WHERE id = $1",
                )
                .bind(id)
                .bind(event.occurred_at)
            }
            Kind::Opened => {
                // First open wins; repeat opens keep the original timestamp.
                sqlx::query(
                    "UPDATE delivery_records SET opened_at = COALESCE(opened_at, $2) WHERE id = $1",
                )
                .bind(id)
                .bind(event.occurred_at)
            }
            Kind::Clicked => sqlx::query(
                "UPDATE delivery_records SET clicked_at = COALESCE(clicked_at, $2) WHERE id = $1",
            )
            .bind(id)
            .bind(event.occurred_at),
            Kind::Bounced => {
                sqlx::query(
                    "UPDATE delivery_records SET status = 'bounced', bounced_at = $2 WHERE id = $1",
                )
                .bind(id)
                .bind(event.occurred_at)
            }
            Kind::Unsubscribed => sqlx::query(
                "UPDATE delivery_records SET unsubscribed_at = $2 WHERE id = $1",
            )
            .bind(id)
            .bind(event.occurred_at),
            Kind::Spam => {
                sqlx::query("UPDATE delivery_records SET status = 'spam' WHERE id = $1").bind(id)
            }
            Kind::Dropped => sqlx::query(
                "UPDATE delivery_records SET status = 'dropped', error = $2 WHERE id = $1",
            )
            .bind(id)
            .bind(event.reason.clone().unwrap_or_default()),
        };

        query.execute(&self.pool).await?;
        Ok(())
    }
}
