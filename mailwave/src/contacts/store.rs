//! Contact persistence
//!
//! The trait is the boundary the recipient resolver and the delivery-event
//! processor see; `PgContactStore` is the Postgres implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;

use super::{Contact, ContactStatus};

/// Read/update access to contacts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Fetch one contact by id
    async fn fetch(&self, id: Uuid) -> Result<Option<Contact>, StoreError>;

    /// Active contacts belonging to a list, in stable membership order
    async fn active_in_list(&self, list_id: Uuid) -> Result<Vec<Contact>, StoreError>;

    /// Every active contact owned by a user, in stable creation order
    async fn active_for_user(&self, user_id: Uuid) -> Result<Vec<Contact>, StoreError>;

    /// Flip a contact's lifecycle status
    async fn set_status(&self, id: Uuid, status: ContactStatus) -> Result<(), StoreError>;
}

/// Postgres-backed contact store
#[derive(Clone)]
pub struct PgContactStore {
    pool: PgPool,
}

impl PgContactStore {
    /// Wrap a connection pool
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn fetch(&self, id: Uuid) -> Result<Option<Contact>, StoreError> {
        let contact = sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contact)
    }

    async fn active_in_list(&self, list_id: Uuid) -> Result<Vec<Contact>, StoreError> {
        let contacts = sqlx::query_as::<_, Contact>(
            r"
            SELECT c.*
            FROM contacts c
            JOIN contact_list_members m ON m.contact_id = c.id
            WHERE m.contact_list_id = $1
              AND c.status = 'active'
            ORDER BY m.added_at, c.id
            ",
        )
        .bind(list_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    async fn active_for_user(&self, user_id: Uuid) -> Result<Vec<Contact>, StoreError> {
        let contacts = sqlx::query_as::<_, Contact>(
            r"
            SELECT *
            FROM contacts
            WHERE user_id = $1
              AND status = 'active'
            ORDER BY created_at, id
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    async fn set_status(&self, id: Uuid, status: ContactStatus) -> Result<(), StoreError> {
        sqlx::query("UPDATE contacts SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
