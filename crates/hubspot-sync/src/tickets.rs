//! Ticket lifecycle: open a HubSpot ticket for a new issue, close it when the
//! issue is closed.
//!
//! Tickets are tracked by issue title in the `tickets` memory map. A ticket is
//! open while its title is in the map and closed once it has been removed;
//! there is no way back from closed to open.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::client::HubSpotClient;
use crate::config::TicketPipeline;
use crate::contacts::ContactResolver;
use crate::error::Result;
use crate::events::{IssueClosed, IssueCreated};
use crate::memory::{load_map, save_map, MemoryStore, TICKETS_KEY};
use crate::models::{TicketPriority, TicketProperties, TicketReference};

/// Result of handling an issue-created event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedTicket {
    pub title: String,
    pub ticket_id: String,
    /// HubSpot id of the reporting contact, when it could be resolved
    pub contact_id: Option<String>,
    /// Whether the ticket was linked to the contact
    pub associated: bool,
}

/// Result of handling an issue-closed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClosedTicket {
    /// The ticket was moved to the closed stage and forgotten.
    Closed { title: String, ticket_id: String },
    /// No ticket is tracked under this title.
    NotTracked { title: String },
}

/// Creates and closes HubSpot tickets for issue events.
pub struct TicketManager {
    hubspot: HubSpotClient,
    contacts: Arc<ContactResolver>,
    store: Arc<dyn MemoryStore>,
    pipeline: TicketPipeline,
    tickets_lock: Mutex<()>,
}

impl TicketManager {
    #[must_use]
    pub fn new(
        hubspot: HubSpotClient,
        contacts: Arc<ContactResolver>,
        store: Arc<dyn MemoryStore>,
        pipeline: TicketPipeline,
    ) -> Self {
        Self {
            hubspot,
            contacts,
            store,
            pipeline,
            tickets_lock: Mutex::new(()),
        }
    }

    /// Open a ticket for a newly created issue.
    ///
    /// The ticket reference is persisted before the reporting contact is
    /// resolved. Failing to resolve or associate the contact is logged and
    /// reported in the result; the ticket stays open either way.
    #[instrument(skip(self, event), fields(title = %event.title, user = %event.user))]
    pub async fn create_ticket(&self, event: &IssueCreated) -> Result<CreatedTicket> {
        debug!("Received issue created event");

        let properties = TicketProperties {
            subject: event.title.clone(),
            content: event.description.clone(),
            hs_pipeline: self.pipeline.pipeline,
            hs_pipeline_stage: self.pipeline.open_stage,
            hs_ticket_priority: TicketPriority::Low,
        };
        let ticket = self.hubspot.create_ticket(properties).await?;

        self.put_ticket_reference(
            &event.title,
            TicketReference {
                id: ticket.id.clone(),
                user: event.user.clone(),
            },
        )
        .await?;

        let contact_id = match self.contacts.resolve_id(&event.user).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!(
                    ticket_id = %ticket.id,
                    error = %e,
                    "Could not resolve contact, ticket left unassociated"
                );
                None
            }
        };

        let associated = match &contact_id {
            Some(contact_id) => match self
                .hubspot
                .associate_ticket_to_contact(&ticket.id, contact_id)
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        ticket_id = %ticket.id,
                        contact_id = %contact_id,
                        error = %e,
                        "Failed to associate ticket to contact"
                    );
                    false
                }
            },
            None => false,
        };

        info!(ticket_id = %ticket.id, associated, "Opened ticket");

        Ok(CreatedTicket {
            title: event.title.clone(),
            ticket_id: ticket.id,
            contact_id,
            associated,
        })
    }

    /// Close the ticket tracked for a closed issue.
    ///
    /// The reference is only dropped from memory once HubSpot accepted the
    /// stage change, so a failed close can be retried. The tickets lock is
    /// not held across the PATCH.
    #[instrument(skip(self, event), fields(title = %event.title))]
    pub async fn close_ticket(&self, event: &IssueClosed) -> Result<ClosedTicket> {
        let reference = {
            let _guard = self.tickets_lock.lock().await;
            let tickets: BTreeMap<String, TicketReference> =
                load_map(self.store.as_ref(), TICKETS_KEY).await?;
            tickets.get(&event.title).cloned()
        };

        let Some(reference) = reference else {
            info!("No ticket tracked for closed issue");
            return Ok(ClosedTicket::NotTracked {
                title: event.title.clone(),
            });
        };

        self.hubspot
            .update_ticket_stage(&reference.id, self.pipeline.closed_stage)
            .await?;

        {
            let _guard = self.tickets_lock.lock().await;
            let mut tickets: BTreeMap<String, TicketReference> =
                load_map(self.store.as_ref(), TICKETS_KEY).await?;

            // A newer ticket may have taken the title while the PATCH ran.
            if tickets.get(&event.title).is_some_and(|r| r.id == reference.id) {
                tickets.remove(&event.title);
                save_map(self.store.as_ref(), TICKETS_KEY, &tickets).await?;
            } else {
                warn!(
                    ticket_id = %reference.id,
                    "Ticket reference replaced while closing, keeping the newer one"
                );
            }
        }

        info!(ticket_id = %reference.id, "Closed ticket");

        Ok(ClosedTicket::Closed {
            title: event.title.clone(),
            ticket_id: reference.id,
        })
    }

    /// Reference tracked for an issue title, if the ticket is open.
    #[cfg(test)]
    pub(crate) async fn ticket_reference(&self, title: &str) -> Result<Option<TicketReference>> {
        let mut tickets: BTreeMap<String, TicketReference> =
            load_map(self.store.as_ref(), TICKETS_KEY).await?;
        Ok(tickets.remove(title))
    }

    async fn put_ticket_reference(&self, title: &str, reference: TicketReference) -> Result<()> {
        let _guard = self.tickets_lock.lock().await;

        let mut tickets: BTreeMap<String, TicketReference> =
            load_map(self.store.as_ref(), TICKETS_KEY).await?;

        if let Some(previous) = tickets.get(title) {
            warn!(
                previous_id = %previous.id,
                new_id = %reference.id,
                "Issue title already tracked, replacing ticket reference"
            );
        }
        tickets.insert(title.to_string(), reference);

        debug!("Putting ticket reference into memory");
        save_map(self.store.as_ref(), TICKETS_KEY, &tickets).await
    }
}
