//! Shared application state
//!
//! Everything handlers and background tasks need travels in [`AppState`]:
//! configuration, the connection pool, the store trait objects, and the
//! wired-up send orchestration. No process-wide globals.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::campaigns::{CampaignSender, CampaignStore, PgCampaignStore};
use crate::config::AppConfig;
use crate::contacts::{ContactStore, PgContactStore};
use crate::delivery::{DeliveryEventProcessor, DeliveryStore, PgDeliveryStore};
use crate::email::Mailer;
use crate::error::MailwaveError;

/// Shared handles for handlers and background tasks
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Database connection pool
    pub pool: PgPool,
    /// Campaign persistence
    pub campaigns: Arc<dyn CampaignStore>,
    /// Contact persistence
    pub contacts: Arc<dyn ContactStore>,
    /// Delivery record persistence
    pub deliveries: Arc<dyn DeliveryStore>,
    /// Configured transport set
    pub mailer: Arc<Mailer>,
    /// Campaign send orchestration
    pub sender: Arc<CampaignSender>,
    /// Delivery event application
    pub events: Arc<DeliveryEventProcessor>,
}

impl AppState {
    /// Connect to the database and wire up the application
    ///
    /// # Errors
    ///
    /// Returns [`MailwaveError::Database`] when the pool cannot be
    /// established.
    pub async fn connect(config: AppConfig) -> Result<Self, MailwaveError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await?;
        Ok(Self::from_pool(config, pool))
    }

    /// Wire up the application around an existing pool
    #[must_use]
    pub fn from_pool(config: AppConfig, pool: PgPool) -> Self {
        let campaigns: Arc<dyn CampaignStore> = Arc::new(PgCampaignStore::new(pool.clone()));
        let contacts: Arc<dyn ContactStore> = Arc::new(PgContactStore::new(pool.clone()));
        let deliveries: Arc<dyn DeliveryStore> = Arc::new(PgDeliveryStore::new(pool.clone()));
        let mailer = Arc::new(Mailer::from_config(&config.email));

        let sender = Arc::new(
            CampaignSender::new(
                Arc::clone(&campaigns),
                Arc::clone(&contacts),
                Arc::clone(&deliveries),
                Arc::clone(&mailer),
            )
            .with_default_identity(
                config.email.default_from_address.clone(),
                config.email.default_from_name.clone(),
            ),
        );
        let events = Arc::new(DeliveryEventProcessor::new(
            Arc::clone(&deliveries),
            Arc::clone(&contacts),
            Arc::clone(&campaigns),
        ));

        Self {
            config: Arc::new(config),
            pool,
            campaigns,
            contacts,
            deliveries,
            mailer,
            sender,
            events,
        }
    }
}
