//! Event handlers and the registry that routes events to them.
//!
//! Handlers are registered against an [`EventKind`] and invoked in
//! registration order for every event of that kind.

pub mod github;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::Result;
use crate::events::{EventKind, IssueEvent};
use crate::tickets::{ClosedTicket, CreatedTicket, TicketManager};

/// What a handler did with an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HandlerOutcome {
    TicketCreated(CreatedTicket),
    TicketClosed(ClosedTicket),
    /// The handler does not act on this event.
    Skipped,
}

/// Trait for event handlers.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs and dispatch results.
    fn name(&self) -> &'static str;

    /// Handle a single event.
    async fn handle(&self, event: &IssueEvent) -> Result<HandlerOutcome>;
}

/// Registration table mapping event kinds to handlers.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of `kind`.
    pub fn register(&mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> &mut Self {
        debug!(kind = ?kind, handler = handler.name(), "Registering event handler");
        self.handlers.entry(kind).or_default().push(handler);
        self
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Run every handler registered for the event's kind, one after another.
    ///
    /// A failing handler does not stop the ones registered after it.
    pub async fn dispatch(&self, event: &IssueEvent) -> Vec<(&'static str, Result<HandlerOutcome>)> {
        let Some(handlers) = self.handlers.get(&event.kind()) else {
            debug!(kind = ?event.kind(), "No handlers registered for event");
            return vec![];
        };

        let mut results = Vec::with_capacity(handlers.len());
        for handler in handlers {
            let result = handler.handle(event).await;
            if let Err(e) = &result {
                error!(
                    handler = handler.name(),
                    title = %event.title(),
                    error = %e,
                    "Event handler failed"
                );
            }
            results.push((handler.name(), result));
        }
        results
    }
}

/// Opens a ticket for every issue-created event.
pub struct CreateTicketHandler(pub Arc<TicketManager>);

#[async_trait]
impl EventHandler for CreateTicketHandler {
    fn name(&self) -> &'static str {
        "create_ticket"
    }

    async fn handle(&self, event: &IssueEvent) -> Result<HandlerOutcome> {
        match event {
            IssueEvent::IssueCreated(created) => self
                .0
                .create_ticket(created)
                .await
                .map(HandlerOutcome::TicketCreated),
            IssueEvent::IssueClosed(_) => Ok(HandlerOutcome::Skipped),
        }
    }
}

/// Closes the tracked ticket for every issue-closed event.
pub struct CloseTicketHandler(pub Arc<TicketManager>);

#[async_trait]
impl EventHandler for CloseTicketHandler {
    fn name(&self) -> &'static str {
        "close_ticket"
    }

    async fn handle(&self, event: &IssueEvent) -> Result<HandlerOutcome> {
        match event {
            IssueEvent::IssueClosed(closed) => self
                .0
                .close_ticket(closed)
                .await
                .map(HandlerOutcome::TicketClosed),
            IssueEvent::IssueCreated(_) => Ok(HandlerOutcome::Skipped),
        }
    }
}

/// Wire the ticket manager's operations into `registry`.
pub fn register_ticket_handlers(registry: &mut HandlerRegistry, manager: &Arc<TicketManager>) {
    registry
        .register(
            EventKind::IssueCreated,
            Arc::new(CreateTicketHandler(Arc::clone(manager))),
        )
        .register(
            EventKind::IssueClosed,
            Arc::new(CloseTicketHandler(Arc::clone(manager))),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::events::{IssueClosed, IssueCreated};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        name: &'static str,
        calls: AtomicUsize,
        fail: bool,
    }

    impl Counting {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl EventHandler for Counting {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn handle(&self, _event: &IssueEvent) -> Result<HandlerOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::Memory("boom".to_string()))
            } else {
                Ok(HandlerOutcome::Skipped)
            }
        }
    }

    fn closed(title: &str) -> IssueEvent {
        IssueClosed {
            title: title.to_string(),
        }
        .into()
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_kind() {
        let on_created = Counting::new("created", false);
        let on_closed = Counting::new("closed", false);

        let mut registry = HandlerRegistry::new();
        registry
            .register(EventKind::IssueCreated, on_created.clone())
            .register(EventKind::IssueClosed, on_closed.clone());

        let results = registry.dispatch(&closed("Bug A")).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "closed");
        assert_eq!(on_closed.calls.load(Ordering::SeqCst), 1);
        assert_eq!(on_created.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_the_rest() {
        let failing = Counting::new("failing", true);
        let after = Counting::new("after", false);

        let mut registry = HandlerRegistry::new();
        registry
            .register(EventKind::IssueClosed, failing.clone())
            .register(EventKind::IssueClosed, after.clone());

        let results = registry.dispatch(&closed("Bug A")).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_err());
        assert!(matches!(results[1].1, Ok(HandlerOutcome::Skipped)));
        assert_eq!(after.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_without_handlers_is_empty() {
        let registry = HandlerRegistry::new();
        let event: IssueEvent = IssueCreated {
            title: "Bug A".to_string(),
            description: None,
            user: "octocat".to_string(),
        }
        .into();

        assert!(registry.dispatch(&event).await.is_empty());
        assert_eq!(registry.handler_count(EventKind::IssueCreated), 0);
    }
}
