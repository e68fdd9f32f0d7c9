//! Error types for the HubSpot sync service.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while syncing issues to HubSpot.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote API answered with a failure status (>= 400)
    #[error("{service} API returned error status {status}: {body}")]
    Api {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Memory store I/O failed
    #[error("Memory store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Memory store contents are not what we expect
    #[error("Memory store error: {0}")]
    Memory(String),

    /// Required configuration is missing
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// Configuration value could not be parsed
    #[error("Invalid value for {key}: {value}")]
    InvalidConfig { key: &'static str, value: String },
}

impl Error {
    /// Status code of a remote API failure, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = Error::Api {
            service: "HubSpot",
            status: StatusCode::UNAUTHORIZED,
            body: "bad token".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HubSpot API returned error status 401 Unauthorized: bad token"
        );
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_non_api_error_has_no_status() {
        let err = Error::MissingConfig("HUBSPOT_TOKEN");
        assert!(err.status().is_none());
        assert_eq!(
            err.to_string(),
            "Missing required configuration: HUBSPOT_TOKEN"
        );
    }
}
