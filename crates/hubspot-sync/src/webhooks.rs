//! GitHub webhook payload parsing and signature verification.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::events::{IssueClosed, IssueCreated, IssueEvent};

type HmacSha256 = Hmac<Sha256>;

/// Verify a GitHub `X-Hub-Signature-256` header using HMAC-SHA256.
///
/// # Arguments
/// * `body` - Raw webhook body bytes
/// * `signature` - Header value, `sha256=<hex digest>`
/// * `secret` - Webhook secret
///
/// # Returns
/// `true` if signature is valid, `false` otherwise
#[must_use]
pub fn verify_github_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let Some(hex_digest) = signature.strip_prefix("sha256=") else {
        return false;
    };

    let Ok(signature_bytes) = hex::decode(hex_digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    computed.as_slice().ct_eq(&signature_bytes).into()
}

/// GitHub `issues` event payload (simplified)
#[derive(Debug, Clone, Deserialize)]
pub struct IssuesEvent {
    /// Action type (opened, closed, reopened, edited, ...)
    pub action: String,
    /// Issue details
    pub issue: Issue,
    /// Repository info
    #[serde(default)]
    pub repository: Option<Repository>,
}

/// GitHub issue
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    /// Issue number
    #[serde(default)]
    pub number: u64,
    /// Issue title
    pub title: String,
    /// Issue body
    #[serde(default)]
    pub body: Option<String>,
    /// Author
    pub user: GitHubUser,
    /// HTML URL
    #[serde(default)]
    pub html_url: Option<String>,
}

/// GitHub user
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    /// User login
    pub login: String,
}

/// GitHub repository
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Full name (org/repo)
    pub full_name: String,
}

impl IssuesEvent {
    /// Convert into the event the handlers understand.
    ///
    /// Only `opened` and `closed` map to an event; everything else is `None`.
    #[must_use]
    pub fn into_issue_event(self) -> Option<IssueEvent> {
        match self.action.as_str() {
            "opened" => Some(
                IssueCreated {
                    title: self.issue.title,
                    description: self.issue.body,
                    user: self.issue.user.login,
                }
                .into(),
            ),
            "closed" => Some(
                IssueClosed {
                    title: self.issue.title,
                }
                .into(),
            ),
            _ => None,
        }
    }
}
