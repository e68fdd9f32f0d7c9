//! GitHub webhook handler.
//!
//! Turns `issues` deliveries into issue events and dispatches them through
//! the handler registry.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::server::AppState;
use crate::webhooks::{verify_github_signature, IssuesEvent};

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Handle GitHub webhook
pub async fn handle_github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let event_type = header(&headers, "X-GitHub-Event").unwrap_or("unknown");
    let delivery_id = header(&headers, "X-GitHub-Delivery").unwrap_or("unknown");

    info!(
        event_type = %event_type,
        delivery_id = %delivery_id,
        "Received GitHub webhook"
    );

    // Verify signature if secret is configured
    if let Some(secret) = &state.webhook_secret {
        let Some(signature) = header(&headers, "X-Hub-Signature-256") else {
            warn!("Missing X-Hub-Signature-256 header");
            return Err(StatusCode::UNAUTHORIZED);
        };

        if !verify_github_signature(&body, signature, secret) {
            warn!("Invalid webhook signature");
            return Err(StatusCode::UNAUTHORIZED);
        }
        debug!("Webhook signature verified");
    }

    if event_type == "ping" {
        return Ok(Json(json!({ "status": "pong" })));
    }

    if event_type != "issues" {
        debug!(event_type = %event_type, "Ignoring non-issues event");
        return Ok(Json(json!({
            "status": "ignored",
            "reason": "not_issues_event"
        })));
    }

    let payload: IssuesEvent = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "Failed to parse GitHub webhook payload");
        StatusCode::BAD_REQUEST
    })?;

    let action = payload.action.clone();
    let repository = payload.repository.as_ref().map(|r| r.full_name.clone());
    let issue_number = payload.issue.number;
    info!(
        action = %action,
        repository = repository.as_deref().unwrap_or("unknown"),
        issue_number,
        url = payload.issue.html_url.as_deref().unwrap_or_default(),
        "Processing issues event"
    );

    let Some(event) = payload.into_issue_event() else {
        debug!(action = %action, "Ignoring unhandled issue action");
        return Ok(Json(json!({
            "status": "ignored",
            "reason": "unhandled_action",
            "action": action
        })));
    };

    let results = state.registry.dispatch(&event).await;

    let mut failed = false;
    let handlers: Vec<Value> = results
        .into_iter()
        .map(|(name, result)| match result {
            Ok(outcome) => json!({ "handler": name, "result": outcome }),
            Err(e) => {
                failed = true;
                json!({ "handler": name, "error": e.to_string() })
            }
        })
        .collect();

    Ok(Json(json!({
        "status": if failed { "error" } else { "accepted" },
        "event": event.kind(),
        "title": event.title(),
        "repository": repository,
        "issue_number": issue_number,
        "handlers": handlers
    })))
}
