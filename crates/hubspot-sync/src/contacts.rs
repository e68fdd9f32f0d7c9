//! Resolves GitHub usernames to HubSpot contacts.
//!
//! Contacts are created from the public GitHub profile of the user that
//! reported an issue. Some users do not expose their name or email, in which
//! case the contact only carries the fields that are public.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::client::HubSpotClient;
use crate::error::{Error, Result};
use crate::github_client::GitHubClient;
use crate::memory::{load_map, save_map, MemoryStore, CONTACTS_KEY};
use crate::models::{ContactProperties, ContactRecord};

/// Owns the contacts cache and creates missing contacts in HubSpot.
///
/// One resolver is built at startup and shared by every handler.
pub struct ContactResolver {
    hubspot: HubSpotClient,
    github: GitHubClient,
    store: Arc<dyn MemoryStore>,
    contacts: RwLock<BTreeMap<String, ContactRecord>>,
}

impl ContactResolver {
    #[must_use]
    pub fn new(hubspot: HubSpotClient, github: GitHubClient, store: Arc<dyn MemoryStore>) -> Self {
        Self {
            hubspot,
            github,
            store,
            contacts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Look up the public GitHub profile and map it to contact properties.
    pub async fn get_contact_details_from_github(&self, username: &str) -> Result<ContactProperties> {
        let profile = self.github.get_user(username).await?;
        Ok(ContactProperties::from_profile(&profile))
    }

    /// Create the contact in HubSpot and persist it in the contacts map.
    #[instrument(skip(self))]
    pub async fn create_contact(&self, username: &str) -> Result<ContactRecord> {
        let properties = self.get_contact_details_from_github(username).await?;
        let created = self.hubspot.create_contact(&properties).await?;

        let record = ContactRecord {
            properties,
            hubspot_id: Some(created.id),
        };

        let mut contacts = self.contacts.write().await;
        contacts.insert(username.to_string(), record.clone());
        save_map(self.store.as_ref(), CONTACTS_KEY, &*contacts).await?;

        info!(
            username = %username,
            hubspot_id = ?record.hubspot_id,
            "Created contact"
        );
        Ok(record)
    }

    /// Return the contact for `username`, creating it if it is not known yet.
    ///
    /// The persisted map is reloaded first so the store stays the source of
    /// truth across restarts.
    pub async fn resolve(&self, username: &str) -> Result<ContactRecord> {
        self.reload().await?;

        if let Some(record) = self.cached(username).await {
            if record.hubspot_id.is_some() {
                debug!(username = %username, "Contact found in memory");
                return Ok(record);
            }
        }

        debug!(username = %username, "Contact not found, creating");
        self.create_contact(username).await
    }

    /// HubSpot id of the contact for `username`, creating it if needed.
    pub async fn resolve_id(&self, username: &str) -> Result<String> {
        self.resolve(username)
            .await?
            .hubspot_id
            .ok_or_else(|| Error::Memory(format!("contact '{username}' has no hubspot_id")))
    }

    /// Cached record for `username`, without touching the store.
    pub async fn cached(&self, username: &str) -> Option<ContactRecord> {
        self.contacts.read().await.get(username).cloned()
    }

    async fn reload(&self) -> Result<()> {
        let persisted: BTreeMap<String, ContactRecord> =
            load_map(self.store.as_ref(), CONTACTS_KEY).await?;
        *self.contacts.write().await = persisted;
        Ok(())
    }
}
