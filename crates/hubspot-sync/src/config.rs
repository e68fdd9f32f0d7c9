//! Configuration for the HubSpot sync service.

use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default HubSpot CRM v3 base URL.
pub const DEFAULT_HUBSPOT_API_URL: &str = "https://api.hubapi.com/crm/v3/";

/// Default GitHub REST base URL.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HubSpot API token, sent as the `hapikey` query parameter.
    pub hubspot_token: String,
    /// HubSpot CRM base URL (with trailing slash).
    pub hubspot_api_url: String,
    /// GitHub REST base URL.
    pub github_api_url: String,
    /// Optional GitHub token for profile lookups and webhook setup.
    pub github_token: Option<String>,
    /// GitHub webhook secret for signature verification.
    pub webhook_secret: Option<String>,
    /// HTTP server port.
    pub port: u16,
    /// Path of the JSON memory file. In-memory storage when unset.
    pub memory_path: Option<PathBuf>,
    /// Ticket pipeline settings.
    pub pipeline: TicketPipeline,
    /// Public base URL GitHub should deliver webhooks to.
    pub webhook_callback_url: Option<String>,
    /// Repositories to configure the `issues` webhook on (`owner/repo`).
    pub github_webhook_repos: Vec<String>,
}

/// HubSpot pipeline ids used for tickets.
///
/// These are the internal ids shown under `Settings > Tickets` in HubSpot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketPipeline {
    /// Support pipeline id.
    pub pipeline: u32,
    /// Stage new tickets are placed in.
    pub open_stage: u32,
    /// Stage closed tickets are moved to.
    pub closed_stage: u32,
}

impl Default for TicketPipeline {
    fn default() -> Self {
        Self {
            pipeline: 0,
            open_stage: 1,
            closed_stage: 4,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let hubspot_token = get("HUBSPOT_TOKEN").ok_or(Error::MissingConfig("HUBSPOT_TOKEN"))?;

        let defaults = TicketPipeline::default();
        let pipeline = TicketPipeline {
            pipeline: parse_or(get("HUBSPOT_PIPELINE_ID"), "HUBSPOT_PIPELINE_ID", defaults.pipeline)?,
            open_stage: parse_or(get("HUBSPOT_OPEN_STAGE"), "HUBSPOT_OPEN_STAGE", defaults.open_stage)?,
            closed_stage: parse_or(
                get("HUBSPOT_CLOSED_STAGE"),
                "HUBSPOT_CLOSED_STAGE",
                defaults.closed_stage,
            )?,
        };

        let mut hubspot_api_url =
            get("HUBSPOT_API_URL").unwrap_or_else(|| DEFAULT_HUBSPOT_API_URL.to_string());
        if !hubspot_api_url.ends_with('/') {
            hubspot_api_url.push('/');
        }

        Ok(Self {
            hubspot_token,
            hubspot_api_url,
            github_api_url: get("GITHUB_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            github_token: get("GITHUB_TOKEN"),
            webhook_secret: get("GITHUB_WEBHOOK_SECRET"),
            port: parse_or(get("HUBSPOT_SYNC_PORT"), "HUBSPOT_SYNC_PORT", 8082)?,
            memory_path: get("HUBSPOT_SYNC_MEMORY_PATH").map(PathBuf::from),
            pipeline,
            webhook_callback_url: get("WEBHOOK_CALLBACK_URL"),
            github_webhook_repos: get("GITHUB_WEBHOOK_REPOS")
                .map(|s| {
                    s.split(',')
                        .map(|r| r.trim().to_string())
                        .filter(|r| !r.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::InvalidConfig { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_token_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::MissingConfig("HUBSPOT_TOKEN")));

        let err = Config::from_lookup(lookup(&[("HUBSPOT_TOKEN", "  ")])).unwrap_err();
        assert!(matches!(err, Error::MissingConfig("HUBSPOT_TOKEN")));
    }

    #[test]
    fn test_default_config() {
        let config = Config::from_lookup(lookup(&[("HUBSPOT_TOKEN", "secret")])).unwrap();
        assert_eq!(config.hubspot_token, "secret");
        assert_eq!(config.hubspot_api_url, DEFAULT_HUBSPOT_API_URL);
        assert_eq!(config.github_api_url, DEFAULT_GITHUB_API_URL);
        assert_eq!(config.port, 8082);
        assert_eq!(config.pipeline, TicketPipeline::default());
        assert_eq!(config.pipeline.closed_stage, 4);
        assert!(config.webhook_secret.is_none());
        assert!(config.memory_path.is_none());
        assert!(config.github_webhook_repos.is_empty());
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("HUBSPOT_TOKEN", "secret"),
            ("HUBSPOT_API_URL", "http://localhost:9000/crm/v3"),
            ("GITHUB_API_URL", "http://localhost:9001/"),
            ("HUBSPOT_SYNC_PORT", "9100"),
            ("HUBSPOT_CLOSED_STAGE", "7"),
            ("HUBSPOT_SYNC_MEMORY_PATH", "/tmp/memory.json"),
            ("GITHUB_WEBHOOK_REPOS", "acme/app, acme/api ,"),
        ]))
        .unwrap();

        assert_eq!(config.hubspot_api_url, "http://localhost:9000/crm/v3/");
        assert_eq!(config.github_api_url, "http://localhost:9001");
        assert_eq!(config.port, 9100);
        assert_eq!(config.pipeline.closed_stage, 7);
        assert_eq!(config.pipeline.open_stage, 1);
        assert_eq!(config.memory_path, Some(PathBuf::from("/tmp/memory.json")));
        assert_eq!(config.github_webhook_repos, vec!["acme/app", "acme/api"]);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("HUBSPOT_TOKEN", "secret"),
            ("HUBSPOT_SYNC_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfig { key: "HUBSPOT_SYNC_PORT", .. }
        ));
    }
}
