//! In-memory fakes and fixtures shared across unit tests
//!
//! The fakes implement the store traits over plain `Mutex`-guarded maps
//! with the same guarded-update semantics as the Postgres implementations,
//! so orchestration tests exercise real claim/transition behavior without
//! a database.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::campaigns::{
    Campaign, CampaignKind, CampaignStatus, CampaignStore, EngagementCounter, NewCampaign,
};
use crate::contacts::{normalize_email, Contact, ContactStatus, ContactStore};
use crate::delivery::{
    DeliveryEvent, DeliveryEventKind, DeliveryRecord, DeliveryStore, NewDeliveryRecord,
};
use crate::email::{AdapterError, EmailSender, OutboundEmail, Provider, SendReceipt};
use crate::error::StoreError;

/// An active contact with the given email and fresh ids
pub fn contact(email: &str) -> Contact {
    contact_with_status(email, ContactStatus::Active)
}

/// A contact with the given email and status
pub fn contact_with_status(email: &str, status: ContactStatus) -> Contact {
    let now = Utc::now();
    Contact {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        email: email.to_string(),
        first_name: None,
        last_name: None,
        company: None,
        custom_fields: Json(HashMap::new()),
        status,
        created_at: now,
        updated_at: now,
    }
}

/// A draft one-time campaign with no list references
pub fn test_campaign() -> Campaign {
    Campaign {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        name: "Test campaign".to_string(),
        kind: CampaignKind::OneTime,
        subject: "Hello".to_string(),
        html_body: Some("<p>Hello</p>".to_string()),
        text_body: Some("Hello".to_string()),
        from_address: "noreply@example.com".to_string(),
        from_name: Some("Test".to_string()),
        reply_to: None,
        list_ids: Vec::new(),
        status: CampaignStatus::Draft,
        settings: Json(serde_json::Value::Null),
        recipient_count: 0,
        delivered_count: 0,
        opened_count: 0,
        clicked_count: 0,
        bounced_count: 0,
        unsubscribed_count: 0,
        created_at: Utc::now(),
        scheduled_at: None,
        sent_at: None,
    }
}

/// In-memory [`ContactStore`]
///
/// Lists seeded with `with_list` behave like the SQL queries and hand back
/// only active members; `with_unfiltered_list` returns members verbatim to
/// exercise the resolver's own eligibility check.
#[derive(Default)]
pub struct InMemoryContactStore {
    lists: HashMap<Uuid, Vec<Contact>>,
    unfiltered: HashSet<Uuid>,
    by_user: HashMap<Uuid, Vec<Contact>>,
    flips: Mutex<HashMap<Uuid, ContactStatus>>,
}

impl InMemoryContactStore {
    /// Seed a list whose query filters to active members
    #[must_use]
    pub fn with_list(mut self, list_id: Uuid, contacts: Vec<Contact>) -> Self {
        self.lists.insert(list_id, contacts);
        self
    }

    /// Seed a list whose query returns members without filtering
    #[must_use]
    pub fn with_unfiltered_list(mut self, list_id: Uuid, contacts: Vec<Contact>) -> Self {
        self.lists.insert(list_id, contacts);
        self.unfiltered.insert(list_id);
        self
    }

    /// Seed the contacts owned by one user
    #[must_use]
    pub fn with_user_contacts(mut self, user_id: Uuid, contacts: Vec<Contact>) -> Self {
        self.by_user.insert(user_id, contacts);
        self
    }

    /// The status a contact was flipped to, if `set_status` was called
    pub fn status_of(&self, id: Uuid) -> Option<ContactStatus> {
        self.flips.lock().unwrap().get(&id).copied()
    }

    fn all(&self) -> impl Iterator<Item = &Contact> {
        self.lists.values().chain(self.by_user.values()).flatten()
    }
}

#[async_trait]
impl ContactStore for InMemoryContactStore {
    async fn fetch(&self, id: Uuid) -> Result<Option<Contact>, StoreError> {
        Ok(self.all().find(|c| c.id == id).cloned())
    }

    async fn active_in_list(&self, list_id: Uuid) -> Result<Vec<Contact>, StoreError> {
        let members = self.lists.get(&list_id).cloned().unwrap_or_default();
        if self.unfiltered.contains(&list_id) {
            return Ok(members);
        }
        Ok(members
            .into_iter()
            .filter(|c| c.status == ContactStatus::Active)
            .collect())
    }

    async fn active_for_user(&self, user_id: Uuid) -> Result<Vec<Contact>, StoreError> {
        Ok(self
            .by_user
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|c| c.status == ContactStatus::Active)
            .collect())
    }

    async fn set_status(&self, id: Uuid, status: ContactStatus) -> Result<(), StoreError> {
        self.flips.lock().unwrap().insert(id, status);
        Ok(())
    }
}

/// In-memory [`CampaignStore`] with the same guarded-update semantics as
/// the Postgres implementation
#[derive(Default)]
pub struct InMemoryCampaignStore {
    campaigns: Mutex<HashMap<Uuid, Campaign>>,
}

impl InMemoryCampaignStore {
    /// A store seeded with one campaign
    #[must_use]
    pub fn with_campaign(campaign: Campaign) -> Self {
        let store = Self::default();
        store.seed(campaign);
        store
    }

    /// Add a campaign to the store
    pub fn seed(&self, campaign: Campaign) {
        self.campaigns
            .lock()
            .unwrap()
            .insert(campaign.id, campaign);
    }

    /// Current state of one campaign
    pub fn get(&self, id: Uuid) -> Option<Campaign> {
        self.campaigns.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl CampaignStore for InMemoryCampaignStore {
    async fn fetch(&self, id: Uuid) -> Result<Option<Campaign>, StoreError> {
        Ok(self.get(id))
    }

    async fn insert(&self, new: NewCampaign) -> Result<Campaign, StoreError> {
        let mut campaign = test_campaign();
        campaign.user_id = new.user_id;
        campaign.name = new.name;
        campaign.kind = new.kind;
        campaign.subject = new.subject;
        campaign.html_body = new.html_body;
        campaign.text_body = new.text_body;
        campaign.from_address = new.from_address;
        campaign.from_name = new.from_name;
        campaign.reply_to = new.reply_to;
        campaign.list_ids = new.list_ids;
        campaign.settings = Json(new.settings);
        campaign.scheduled_at = new.scheduled_at;
        campaign.status = if new.scheduled_at.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Draft
        };
        self.seed(campaign.clone());
        Ok(campaign)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Campaign>, StoreError> {
        let mut campaigns: Vec<Campaign> = self
            .campaigns
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(campaigns)
    }

    async fn claim_for_sending(&self, id: Uuid, recipient_count: u32) -> Result<bool, StoreError> {
        let mut campaigns = self.campaigns.lock().unwrap();
        let Some(campaign) = campaigns.get_mut(&id) else {
            return Ok(false);
        };
        if !matches!(
            campaign.status,
            CampaignStatus::Draft | CampaignStatus::Scheduled
        ) {
            return Ok(false);
        }
        campaign.status = CampaignStatus::Sending;
        campaign.recipient_count = i32::try_from(recipient_count).unwrap_or(i32::MAX);
        Ok(true)
    }

    async fn mark_sent(&self, id: Uuid, delivered_count: u32) -> Result<(), StoreError> {
        let mut campaigns = self.campaigns.lock().unwrap();
        if let Some(campaign) = campaigns.get_mut(&id) {
            if campaign.status == CampaignStatus::Sending {
                campaign.status = CampaignStatus::Sent;
                campaign.sent_at = Some(Utc::now());
                campaign.delivered_count = i32::try_from(delivered_count).unwrap_or(i32::MAX);
            }
        }
        Ok(())
    }

    async fn set_status(
        &self,
        id: Uuid,
        from: &[CampaignStatus],
        to: CampaignStatus,
    ) -> Result<bool, StoreError> {
        let mut campaigns = self.campaigns.lock().unwrap();
        let Some(campaign) = campaigns.get_mut(&id) else {
            return Ok(false);
        };
        if !from.contains(&campaign.status) {
            return Ok(false);
        }
        campaign.status = to;
        Ok(true)
    }

    async fn due_scheduled(
        &self,
        now: chrono::DateTime<Utc>,
    ) -> Result<Vec<Campaign>, StoreError> {
        let mut due: Vec<Campaign> = self
            .campaigns
            .lock()
            .unwrap()
            .values()
            .filter(|c| {
                c.status == CampaignStatus::Scheduled
                    && c.scheduled_at.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect();
        due.sort_by_key(|c| c.scheduled_at);
        Ok(due)
    }

    async fn increment_counter(
        &self,
        id: Uuid,
        counter: EngagementCounter,
    ) -> Result<(), StoreError> {
        let mut campaigns = self.campaigns.lock().unwrap();
        if let Some(campaign) = campaigns.get_mut(&id) {
            match counter {
                EngagementCounter::Opened => campaign.opened_count += 1,
                EngagementCounter::Clicked => campaign.clicked_count += 1,
                EngagementCounter::Bounced => campaign.bounced_count += 1,
                EngagementCounter::Unsubscribed => campaign.unsubscribed_count += 1,
            }
        }
        Ok(())
    }
}

/// In-memory [`DeliveryStore`]
#[derive(Default)]
pub struct InMemoryDeliveryStore {
    records: Mutex<Vec<DeliveryRecord>>,
    reject_inserts: bool,
}

impl InMemoryDeliveryStore {
    /// A store whose `insert` always fails
    #[must_use]
    pub fn rejecting_inserts() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            reject_inserts: true,
        }
    }

    /// Insert a record directly, bypassing the failure switch
    pub async fn seed(&self, record: NewDeliveryRecord) -> Uuid {
        let record = materialize(record);
        let id = record.id;
        self.records.lock().unwrap().push(record);
        id
    }

    /// Snapshot of all records in insertion order
    pub fn records(&self) -> Vec<DeliveryRecord> {
        self.records.lock().unwrap().clone()
    }
}

fn materialize(new: NewDeliveryRecord) -> DeliveryRecord {
    DeliveryRecord {
        id: Uuid::new_v4(),
        campaign_id: new.campaign_id,
        contact_id: new.contact_id,
        user_id: new.user_id,
        to_email: new.to_email,
        subject: new.subject,
        html_body: new.html_body,
        text_body: new.text_body,
        status: new.status,
        provider: new.provider,
        provider_message_id: new.provider_message_id,
        error: new.error,
        created_at: Utc::now(),
        sent_at: new.sent_at,
        delivered_at: None,
        opened_at: None,
        clicked_at: None,
        bounced_at: None,
        unsubscribed_at: None,
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn insert(&self, record: NewDeliveryRecord) -> Result<Uuid, StoreError> {
        if self.reject_inserts {
            return Err(StoreError::Backend("insert rejected".to_string()));
        }
        Ok(self.seed(record).await)
    }

    async fn find_by_message_id(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<DeliveryRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.provider_message_id.as_deref() == Some(provider_message_id))
            .cloned())
    }

    async fn for_campaign(&self, campaign_id: Uuid) -> Result<Vec<DeliveryRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn record_event(&self, id: Uuid, event: &DeliveryEvent) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(());
        };
        if let Some(status) = event.kind.record_status() {
            record.status = status;
        }
        match event.kind {
            DeliveryEventKind::Delivered => record.delivered_at = Some(event.occurred_at),
            DeliveryEventKind::Opened => {
                record.opened_at.get_or_insert(event.occurred_at);
            }
            DeliveryEventKind::Clicked => {
                record.clicked_at.get_or_insert(event.occurred_at);
            }
            DeliveryEventKind::Bounced => record.bounced_at = Some(event.occurred_at),
            DeliveryEventKind::Unsubscribed => record.unsubscribed_at = Some(event.occurred_at),
            DeliveryEventKind::Dropped => record.error = event.reason.clone(),
            DeliveryEventKind::Spam => {}
        }
        Ok(())
    }
}

/// Scripted [`EmailSender`] that records what it was asked to send
#[derive(Default)]
pub struct ScriptedSender {
    fail_for: HashSet<String>,
    sent: Mutex<Vec<OutboundEmail>>,
    sequence: AtomicUsize,
}

impl ScriptedSender {
    /// Reject sends to the given address
    #[must_use]
    pub fn failing_for(mut self, email: &str) -> Self {
        self.fail_for.insert(normalize_email(email));
        self
    }

    /// Every email the transport accepted or rejected, in order
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for ScriptedSender {
    fn provider(&self) -> Provider {
        Provider::Smtp
    }

    async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, AdapterError> {
        self.sent.lock().unwrap().push(email.clone());
        if self.fail_for.contains(&normalize_email(&email.to)) {
            return Err(AdapterError::Rejected {
                provider: Provider::Smtp,
                message: "scripted rejection".to_string(),
            });
        }
        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        Ok(SendReceipt {
            provider: Provider::Smtp,
            message_id: Some(format!("scripted-{n}")),
        })
    }
}
