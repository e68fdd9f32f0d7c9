//! Type definitions for HubSpot and GitHub entities.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// =========================================================================
// HubSpot CRM
// =========================================================================

/// Wrapper used by every HubSpot object create/update body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertiesPayload<T> {
    pub properties: T,
}

/// Object returned by HubSpot CRM endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct CrmObject {
    /// Server-assigned object id
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Echoed object properties
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Ticket priority as understood by HubSpot. Issue tickets are always opened
/// as low priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TicketPriority {
    #[default]
    Low,
}

/// Properties for a new ticket.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TicketProperties {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub hs_pipeline: u32,
    pub hs_pipeline_stage: u32,
    pub hs_ticket_priority: TicketPriority,
}

/// Properties patch moving a ticket to another pipeline stage.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StageUpdate {
    pub hs_pipeline_stage: u32,
}

/// Contact properties derived from a public GitHub profile.
///
/// Field names are the ones the HubSpot contacts API expects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl ContactProperties {
    /// Map a GitHub profile onto contact properties, skipping anything the
    /// profile does not expose.
    #[must_use]
    pub fn from_profile(profile: &GitHubProfile) -> Self {
        let present = |field: &Option<String>| {
            field
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let (firstname, lastname) = match present(&profile.name) {
            Some(name) => {
                let (first, last) = name
                    .split_once(' ')
                    .map_or((name.as_str(), ""), |(first, last)| (first, last.trim()));
                (
                    Some(first.to_string()),
                    Some(last.to_string()).filter(|l| !l.is_empty()),
                )
            }
            None => (None, None),
        };

        Self {
            firstname,
            lastname,
            email: present(&profile.email),
            website: present(&profile.blog),
            company: present(&profile.company),
        }
    }

    /// True when no property is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.firstname.is_none()
            && self.lastname.is_none()
            && self.email.is_none()
            && self.website.is_none()
            && self.company.is_none()
    }
}

/// Persisted contact, keyed by GitHub username in the `contacts` map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactRecord {
    #[serde(flatten)]
    pub properties: ContactProperties,
    /// HubSpot contact id, set once the contact exists remotely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hubspot_id: Option<String>,
}

/// Persisted ticket reference, keyed by issue title in the `tickets` map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketReference {
    /// HubSpot ticket id
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// GitHub username that reported the issue
    pub user: String,
}

/// Body of `associations/ticket/contact/batch/create`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AssociationBatch {
    pub inputs: Vec<AssociationInput>,
}

/// A single association between two CRM objects.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AssociationInput {
    pub from: ObjectRef,
    pub to: ObjectRef,
    #[serde(rename = "type")]
    pub association_type: String,
}

/// Reference to a CRM object by id.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ObjectRef {
    pub id: String,
}

impl AssociationBatch {
    /// Single `ticket_to_contact` association.
    #[must_use]
    pub fn ticket_to_contact(ticket_id: &str, contact_id: &str) -> Self {
        Self {
            inputs: vec![AssociationInput {
                from: ObjectRef {
                    id: ticket_id.to_string(),
                },
                to: ObjectRef {
                    id: contact_id.to_string(),
                },
                association_type: "ticket_to_contact".to_string(),
            }],
        }
    }
}

// =========================================================================
// GitHub
// =========================================================================

/// Public GitHub user profile (only the fields we consume).
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct GitHubProfile {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub blog: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

/// HubSpot ids are strings in v3, but older payloads and stored data may
/// carry plain numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
