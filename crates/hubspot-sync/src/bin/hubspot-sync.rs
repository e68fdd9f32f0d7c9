//! HubSpot sync service binary.
//!
//! Standalone HTTP service that turns GitHub issue webhooks into HubSpot tickets.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hubspot_sync::{
    config::Config, ensure_issue_webhooks, server, GitHubClient, InMemoryStore, JsonFileStore,
    MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("hubspot_sync=info".parse()?))
        .init();

    info!("Starting HubSpot sync service...");

    let config = Config::from_env().context("Failed to load configuration")?;

    let store: Arc<dyn MemoryStore> = if let Some(path) = &config.memory_path {
        info!(path = %path.display(), "Persisting memory to file");
        Arc::new(JsonFileStore::new(path.clone()))
    } else {
        info!("No HUBSPOT_SYNC_MEMORY_PATH configured - memory will not survive restarts");
        Arc::new(InMemoryStore::new())
    };

    // Ensure GitHub webhooks are configured
    if let (Some(token), Some(callback_url)) = (&config.github_token, &config.webhook_callback_url)
    {
        if config.github_webhook_repos.is_empty() {
            info!("No GITHUB_WEBHOOK_REPOS configured - skipping GitHub webhook setup");
        } else {
            match GitHubClient::with_url(Some(token), &config.github_api_url) {
                Ok(github) => {
                    let results = ensure_issue_webhooks(
                        &github,
                        callback_url,
                        config.webhook_secret.as_deref(),
                        &config.github_webhook_repos,
                    )
                    .await;
                    let success = results.iter().filter(|(_, ok)| *ok).count();
                    let failed = results.len() - success;
                    if failed > 0 {
                        info!(
                            success = success,
                            failed = failed,
                            "GitHub webhooks initialization completed with some failures"
                        );
                    } else {
                        info!(count = success, "GitHub webhooks initialized successfully");
                    }
                }
                Err(e) => {
                    // Non-fatal - webhooks may be managed by hand
                    info!(error = %e, "Could not initialize GitHub webhooks");
                }
            }
        }
    } else {
        if config.github_token.is_none() {
            info!("No GITHUB_TOKEN configured - skipping GitHub webhook setup");
        }
        if config.webhook_callback_url.is_none() {
            info!("No WEBHOOK_CALLBACK_URL configured - skipping GitHub webhook setup");
        }
    }

    let state = server::AppState::from_config(&config, store)
        .context("Failed to build application state")?;

    let app = server::build_router(state);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port = config.port, "HubSpot sync service listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
