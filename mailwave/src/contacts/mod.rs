//! Contacts and contact lists
//!
//! A contact belongs to one user account; its email is unique per owner and
//! case-normalized on the way in. Only `active` contacts are ever eligible
//! campaign recipients — bounced and unsubscribed contacts stay on their
//! lists but are excluded at resolution time.

pub mod store;

pub use store::{ContactStore, PgContactStore};

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Contact lifecycle status
///
/// Mutated by delivery-event processing (bounce) or by the contact
/// unsubscribing; never by the send orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    /// Eligible recipient
    Active,
    /// Opted out; excluded from all sends
    Unsubscribed,
    /// Hard-bounced; excluded from all sends
    Bounced,
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Unsubscribed => "unsubscribed",
            Self::Bounced => "bounced",
        };
        f.write_str(s)
    }
}

/// One contact owned by a user account
#[derive(Debug, Clone, FromRow)]
pub struct Contact {
    /// Identity
    pub id: Uuid,
    /// Owning user account
    pub user_id: Uuid,
    /// Case-normalized email address, unique per owner
    pub email: String,
    /// First name
    pub first_name: Option<String>,
    /// Last name
    pub last_name: Option<String>,
    /// Company
    pub company: Option<String>,
    /// Arbitrary user-defined key/value attributes
    pub custom_fields: Json<HashMap<String, String>>,
    /// Lifecycle status
    pub status: ContactStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

/// A named grouping of contacts
///
/// Membership is a many-to-many join (`contact_list_members`) with its own
/// timestamp; a campaign references zero or more lists by id.
#[derive(Debug, Clone, FromRow)]
pub struct ContactList {
    /// Identity
    pub id: Uuid,
    /// Owning user account
    pub user_id: Uuid,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Normalize an email address for storage and deduplication
///
/// Addresses compare case-insensitively throughout the platform; the
/// normalized (trimmed, lowercased) form is the canonical one.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(normalize_email("  Ann@Example.COM "), "ann@example.com");
        assert_eq!(normalize_email("ann@example.com"), "ann@example.com");
    }

    #[test]
    fn status_display_matches_storage_form() {
        assert_eq!(ContactStatus::Active.to_string(), "active");
        assert_eq!(ContactStatus::Unsubscribed.to_string(), "unsubscribed");
        assert_eq!(ContactStatus::Bounced.to_string(), "bounced");
    }
}
