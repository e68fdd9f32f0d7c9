//! HTTP server for GitHub webhooks.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::client::HubSpotClient;
use crate::config::Config;
use crate::contacts::ContactResolver;
use crate::error::Result;
use crate::events::EventKind;
use crate::github_client::GitHubClient;
use crate::handlers::github::handle_github_webhook;
use crate::handlers::{register_ticket_handlers, HandlerRegistry};
use crate::memory::MemoryStore;
use crate::tickets::TicketManager;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Secret GitHub signs deliveries with. Verification is skipped when unset.
    pub webhook_secret: Option<String>,
    /// Handlers events are dispatched to.
    pub registry: Arc<HandlerRegistry>,
}

impl AppState {
    /// Build the clients, the contact resolver and the ticket manager, and
    /// register the ticket handlers.
    pub fn from_config(config: &Config, store: Arc<dyn MemoryStore>) -> Result<Self> {
        let hubspot = HubSpotClient::with_url(&config.hubspot_token, &config.hubspot_api_url)?;
        let github = GitHubClient::with_url(config.github_token.as_deref(), &config.github_api_url)?;

        let contacts = Arc::new(ContactResolver::new(hubspot.clone(), github, Arc::clone(&store)));
        let tickets = Arc::new(TicketManager::new(hubspot, contacts, store, config.pipeline));

        let mut registry = HandlerRegistry::new();
        register_ticket_handlers(&mut registry, &tickets);

        Ok(Self {
            webhook_secret: config.webhook_secret.clone(),
            registry: Arc::new(registry),
        })
    }
}

/// Build the HTTP router for the sync service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/github", post(handle_github_webhook))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Readiness check endpoint. Not ready until issue handlers are registered.
async fn readiness_check(
    State(state): State<AppState>,
) -> std::result::Result<Json<Value>, StatusCode> {
    let ready = [EventKind::IssueCreated, EventKind::IssueClosed]
        .into_iter()
        .all(|kind| state.registry.handler_count(kind) > 0);
    if !ready {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({ "status": "ready" })))
}
