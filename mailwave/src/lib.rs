//! mailwave: email marketing platform core
//!
//! mailwave is the send-orchestration heart of an email marketing platform:
//! campaign and contact domain models, recipient resolution, template
//! personalization, a multi-provider transport abstraction, and the campaign
//! send state machine, exposed over a thin HTTP boundary.
//!
//! # Design Principles
//!
//! 1. **Per-recipient isolation**: one bad address or transient provider
//!    error never aborts a campaign sent to thousands of recipients
//! 2. **One transport per pass**: the provider is selected once per send so a
//!    pass is attributable to a single backend
//! 3. **Typed results at the boundary**: operations return named result
//!    shapes, never ad hoc maps or raised surprises
//! 4. **Explicit state**: configuration and stores travel in [`state::AppState`],
//!    never in process-wide globals
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mailwave::{config::AppConfig, state::AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     mailwave::observability::init_tracing();
//!
//!     let config = AppConfig::load()?;
//!     let state = AppState::connect(config).await?;
//!
//!     let app = mailwave::handlers::router(state);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

// Ambient modules
pub mod config;
pub mod error;
pub mod observability;
pub mod state;

// Domain modules
pub mod campaigns;
pub mod contacts;
pub mod delivery;
pub mod email;

// HTTP boundary
pub mod handlers;

#[cfg(test)]
pub mod testing;

pub mod prelude {
    //! Convenience re-exports for common types and traits

    pub use crate::campaigns::{
        Campaign, CampaignKind, CampaignSender, CampaignStatus, RecipientResolver, SendError,
        SendSummary,
    };
    pub use crate::contacts::{Contact, ContactList, ContactStatus};
    pub use crate::delivery::{DeliveryEvent, DeliveryRecord, DeliveryStatus};
    pub use crate::email::{
        AdapterError, EmailSender, Mailer, OutboundEmail, Provider, SendReceipt,
    };
    pub use crate::error::MailwaveError;
    pub use crate::state::AppState;
}
