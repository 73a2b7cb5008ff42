//! Recipient resolution
//!
//! Expands a campaign's list references into the deduplicated set of
//! contacts a send pass will address. Only `active` contacts qualify,
//! regardless of list membership; duplicates collapse to the first
//! occurrence of a normalized email address; ordering is stable for a
//! given invocation.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::contacts::{normalize_email, Contact, ContactStatus, ContactStore};
use crate::error::StoreError;

use super::Campaign;

/// A contact resolved as eligible for one campaign send
#[derive(Debug, Clone)]
pub struct Recipient {
    /// Resolved contact
    pub contact_id: Uuid,
    /// Normalized email address
    pub email: String,
    /// First name, when known
    pub first_name: Option<String>,
    /// Last name, when known
    pub last_name: Option<String>,
    /// Company, when known
    pub company: Option<String>,
    /// User-defined custom fields
    pub custom_fields: HashMap<String, String>,
}

impl Recipient {
    fn from_contact(contact: &Contact, email: String) -> Self {
        Self {
            contact_id: contact.id,
            email,
            first_name: contact.first_name.clone().filter(|s| !s.is_empty()),
            last_name: contact.last_name.clone().filter(|s| !s.is_empty()),
            company: contact.company.clone().filter(|s| !s.is_empty()),
            custom_fields: contact.custom_fields.0.clone(),
        }
    }

    /// The attribute map fed to the template renderer
    ///
    /// Name fields fall back to the email address when absent so a
    /// `{{first_name}}` greeting never renders blank; custom fields live
    /// under the `custom.` namespace.
    #[must_use]
    pub fn attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        let first = self.first_name.clone().unwrap_or_else(|| self.email.clone());
        let full = match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone(),
        };

        attrs.insert("email".to_string(), self.email.clone());
        attrs.insert("first_name".to_string(), first);
        attrs.insert(
            "last_name".to_string(),
            self.last_name.clone().unwrap_or_default(),
        );
        attrs.insert("full_name".to_string(), full);
        attrs.insert(
            "company".to_string(),
            self.company.clone().unwrap_or_default(),
        );

        for (key, value) in &self.custom_fields {
            attrs.insert(format!("custom.{key}"), value.clone());
        }

        attrs
    }
}

/// Expands a campaign's targeting into its recipient set
pub struct RecipientResolver<'a> {
    contacts: &'a dyn ContactStore,
}

impl<'a> RecipientResolver<'a> {
    /// Resolve against a contact store
    #[must_use]
    pub fn new(contacts: &'a dyn ContactStore) -> Self {
        Self { contacts }
    }

    /// Resolve the eligible recipient set for one campaign
    ///
    /// Unions the referenced lists, or falls back to every active contact
    /// of the owning user when the campaign references no lists. An empty
    /// result is a normal outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the contact store fails.
    pub async fn resolve(&self, campaign: &Campaign) -> Result<Vec<Recipient>, StoreError> {
        let mut pool: Vec<Contact> = Vec::new();
        if campaign.list_ids.is_empty() {
            pool.extend(self.contacts.active_for_user(campaign.user_id).await?);
        } else {
            for list_id in &campaign.list_ids {
                pool.extend(self.contacts.active_in_list(*list_id).await?);
            }
        }

        let mut seen = HashSet::new();
        let mut recipients = Vec::new();
        for contact in &pool {
            // The store queries already filter, but the eligibility
            // invariant must hold no matter what a store hands back.
            if contact.status != ContactStatus::Active {
                continue;
            }
            let email = normalize_email(&contact.email);
            if seen.insert(email.clone()) {
                recipients.push(Recipient::from_contact(contact, email));
            }
        }
        Ok(recipients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{contact, contact_with_status, test_campaign, InMemoryContactStore};

    fn recipient_from(email: &str) -> Recipient {
        Recipient::from_contact(&contact(email), normalize_email(email))
    }

    #[tokio::test]
    async fn unions_referenced_lists_and_dedups_by_email() {
        let list_a = Uuid::new_v4();
        let list_b = Uuid::new_v4();
        let store = InMemoryContactStore::default()
            .with_list(list_a, vec![contact("ann@x.com"), contact("bob@x.com")])
            .with_list(list_b, vec![contact("ANN@X.COM"), contact("cat@x.com")]);

        let mut campaign = test_campaign();
        campaign.list_ids = vec![list_a, list_b];

        let resolver = RecipientResolver::new(&store);
        let recipients = resolver.resolve(&campaign).await.expect("resolves");

        let emails: Vec<_> = recipients.iter().map(|r| r.email.as_str()).collect();
        assert_eq!(emails, vec!["ann@x.com", "bob@x.com", "cat@x.com"]);
    }

    #[tokio::test]
    async fn excludes_non_active_contacts_regardless_of_membership() {
        let list = Uuid::new_v4();
        let store = InMemoryContactStore::default().with_unfiltered_list(
            list,
            vec![
                contact("a@x.com"),
                contact_with_status("b@x.com", ContactStatus::Bounced),
                contact_with_status("c@x.com", ContactStatus::Unsubscribed),
            ],
        );

        let mut campaign = test_campaign();
        campaign.list_ids = vec![list];

        let resolver = RecipientResolver::new(&store);
        let recipients = resolver.resolve(&campaign).await.expect("resolves");
        let emails: Vec<_> = recipients.iter().map(|r| r.email.as_str()).collect();
        assert_eq!(emails, vec!["a@x.com"]);
    }

    #[tokio::test]
    async fn no_lists_falls_back_to_all_active_contacts_of_owner() {
        let campaign = test_campaign();
        let store = InMemoryContactStore::default().with_user_contacts(
            campaign.user_id,
            vec![contact("ann@x.com"), contact("bob@x.com")],
        );

        let resolver = RecipientResolver::new(&store);
        let recipients = resolver.resolve(&campaign).await.expect("resolves");
        assert_eq!(recipients.len(), 2);
    }

    #[tokio::test]
    async fn empty_result_is_not_an_error() {
        let store = InMemoryContactStore::default();
        let resolver = RecipientResolver::new(&store);
        let recipients = resolver.resolve(&test_campaign()).await.expect("resolves");
        assert!(recipients.is_empty());
    }

    #[test]
    fn attributes_carry_names_and_custom_fields() {
        let mut recipient = recipient_from("ann@x.com");
        recipient.first_name = Some("Ann".to_string());
        recipient.last_name = Some("Lee".to_string());
        recipient
            .custom_fields
            .insert("plan".to_string(), "Pro".to_string());

        let attrs = recipient.attributes();
        assert_eq!(attrs["first_name"], "Ann");
        assert_eq!(attrs["full_name"], "Ann Lee");
        assert_eq!(attrs["custom.plan"], "Pro");
        assert_eq!(attrs["email"], "ann@x.com");
    }

    #[test]
    fn missing_name_fields_fall_back_to_email() {
        let attrs = recipient_from("ann@x.com").attributes();
        assert_eq!(attrs["first_name"], "ann@x.com");
        assert_eq!(attrs["full_name"], "ann@x.com");
        assert_eq!(attrs["last_name"], "");
        assert_eq!(attrs["company"], "");
    }
}
