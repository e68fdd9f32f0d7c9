//! GitHub API client for user profiles and webhook management.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::DEFAULT_GITHUB_API_URL;
use crate::error::{Error, Result};
use crate::models::GitHubProfile;

/// Webhook events the service consumes.
const ISSUE_EVENTS: &[&str] = &["issues"];

/// GitHub REST client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

/// GitHub webhook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// GitHub webhook response.
#[derive(Debug, Clone, Deserialize)]
pub struct Webhook {
    pub id: u64,
    pub active: bool,
    pub events: Vec<String>,
    pub config: WebhookConfig,
}

/// Request to create a webhook.
#[derive(Debug, Serialize)]
struct CreateWebhookRequest<'a> {
    name: &'static str,
    active: bool,
    events: &'a [&'a str],
    config: WebhookConfig,
}

impl GitHubClient {
    /// Create a client against the public GitHub API.
    pub fn new(token: Option<&str>) -> Result<Self> {
        Self::with_url(token, DEFAULT_GITHUB_API_URL)
    }

    /// Create a client against a custom base URL.
    pub fn with_url(token: Option<&str>, api_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("hubspot-sync/1.0"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.authorize(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                service: "GitHub",
                status,
                body,
            });
        }

        Ok(response.json().await?)
    }

    /// Fetch the public profile of a user.
    #[instrument(skip(self))]
    pub async fn get_user(&self, username: &str) -> Result<GitHubProfile> {
        let url = format!("{}/users/{username}", self.api_url);
        let profile: GitHubProfile = self.send(self.client.get(&url)).await?;
        debug!(
            has_name = profile.name.is_some(),
            has_email = profile.email.is_some(),
            "Fetched GitHub profile"
        );
        Ok(profile)
    }

    /// List webhooks for a repository.
    pub async fn list_webhooks(&self, owner: &str, repo: &str) -> Result<Vec<Webhook>> {
        let url = format!("{}/repos/{owner}/{repo}/hooks", self.api_url);
        self.send(self.client.get(&url)).await
    }

    /// Create an `issues` webhook for a repository.
    pub async fn create_webhook(
        &self,
        owner: &str,
        repo: &str,
        webhook_url: &str,
        secret: Option<&str>,
    ) -> Result<Webhook> {
        let url = format!("{}/repos/{owner}/{repo}/hooks", self.api_url);

        let request = CreateWebhookRequest {
            name: "web",
            active: true,
            events: ISSUE_EVENTS,
            config: WebhookConfig {
                url: webhook_url.to_string(),
                content_type: "json".to_string(),
                secret: secret.map(String::from),
            },
        };

        self.send(self.client.post(&url).json(&request)).await
    }

    /// Ensure an active `issues` webhook pointing at `webhook_url` exists.
    pub async fn ensure_webhook(
        &self,
        owner: &str,
        repo: &str,
        webhook_url: &str,
        secret: Option<&str>,
    ) -> Result<Webhook> {
        let existing = self.list_webhooks(owner, repo).await?;

        if let Some(hook) = existing.into_iter().find(|h| {
            h.config.url == webhook_url
                && h.active
                && ISSUE_EVENTS.iter().all(|e| h.events.iter().any(|have| have == e))
        }) {
            info!(
                owner = %owner,
                repo = %repo,
                hook_id = hook.id,
                "GitHub issues webhook already configured"
            );
            return Ok(hook);
        }

        info!(owner = %owner, repo = %repo, "Creating GitHub issues webhook");
        self.create_webhook(owner, repo, webhook_url, secret).await
    }
}

/// Ensure every configured repository delivers `issues` events to us.
///
/// Individual repository failures are logged and reported as `false`.
pub async fn ensure_issue_webhooks(
    client: &GitHubClient,
    callback_url: &str,
    secret: Option<&str>,
    repos: &[String],
) -> Vec<(String, bool)> {
    let webhook_url = format!("{}/webhooks/github", callback_url.trim_end_matches('/'));
    let mut results = Vec::with_capacity(repos.len());

    for repo in repos {
        let Some((owner, name)) = repo.split_once('/').filter(|(o, n)| {
            !o.is_empty() && !n.is_empty() && !n.contains('/')
        }) else {
            warn!(repo = %repo, "Invalid repository format (expected owner/repo)");
            results.push((repo.clone(), false));
            continue;
        };

        match client.ensure_webhook(owner, name, &webhook_url, secret).await {
            Ok(hook) => {
                info!(repo = %repo, hook_id = hook.id, "GitHub webhook configured");
                results.push((repo.clone(), true));
            }
            Err(e) => {
                warn!(repo = %repo, error = %e, "Failed to configure GitHub webhook");
                results.push((repo.clone(), false));
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_user_sends_token_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat"))
            .and(header("authorization", "Bearer gh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "login": "octocat",
                "name": "The Octocat",
                "email": null,
                "blog": "https://github.blog",
                "company": "@github"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitHubClient::with_url(Some("gh-token"), &server.uri()).unwrap();
        let profile = client.get_user("octocat").await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("The Octocat"));
        assert!(profile.email.is_none());
        assert_eq!(profile.blog.as_deref(), Some("https://github.blog"));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/nobody"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let client = GitHubClient::with_url(None, &server.uri()).unwrap();
        let err = client.get_user("nobody").await.unwrap_err();
        assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    }

    #[tokio::test]
    async fn test_ensure_issue_webhooks_creates_missing_hook() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/app/hooks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 1,
                "active": true,
                "events": ["push"],
                "config": {"url": "https://elsewhere.example/hook", "content_type": "json"}
            }])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/app/hooks"))
            .and(body_partial_json(json!({
                "events": ["issues"],
                "config": {"url": "https://sync.example/webhooks/github", "secret": "s3cret"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 2,
                "active": true,
                "events": ["issues"],
                "config": {"url": "https://sync.example/webhooks/github", "content_type": "json"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitHubClient::with_url(Some("gh-token"), &server.uri()).unwrap();
        let results = ensure_issue_webhooks(
            &client,
            "https://sync.example/",
            Some("s3cret"),
            &["acme/app".to_string(), "not-a-repo".to_string()],
        )
        .await;

        assert_eq!(
            results,
            vec![("acme/app".to_string(), true), ("not-a-repo".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn test_ensure_webhook_reuses_existing_hook() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/app/hooks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 7,
                "active": true,
                "events": ["issues", "push"],
                "config": {"url": "https://sync.example/webhooks/github", "content_type": "json"}
            }])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let client = GitHubClient::with_url(None, &server.uri()).unwrap();
        let hook = client
            .ensure_webhook("acme", "app", "https://sync.example/webhooks/github", None)
            .await
            .unwrap();
        assert_eq!(hook.id, 7);
    }
}
