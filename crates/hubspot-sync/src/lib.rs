//! GitHub issues to HubSpot tickets bridge.
//!
//! This crate provides:
//! - REST client for the HubSpot CRM v3 API (tickets, contacts, associations)
//! - GitHub client for public user profiles and webhook setup
//! - Contact resolution from GitHub usernames
//! - Ticket lifecycle driven by issue-created / issue-closed events
//! - A key-value memory store for contacts and ticket references
//! - An explicit handler registry and an HTTP server for GitHub webhooks

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Every API method can fail

pub mod client;
pub mod config;
pub mod contacts;
pub mod error;
pub mod events;
pub mod github_client;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod server;
pub mod tickets;
pub mod webhooks;

pub use client::HubSpotClient;
pub use config::Config;
pub use contacts::ContactResolver;
pub use error::{Error, Result};
pub use events::{EventKind, IssueClosed, IssueCreated, IssueEvent};
pub use github_client::{ensure_issue_webhooks, GitHubClient};
pub use handlers::{register_ticket_handlers, EventHandler, HandlerOutcome, HandlerRegistry};
pub use memory::{InMemoryStore, JsonFileStore, MemoryStore};
pub use tickets::TicketManager;
pub use webhooks::verify_github_signature;
