//! Issue lifecycle events consumed by the handlers.

use serde::{Deserialize, Serialize};

/// Tag used to register handlers for a kind of event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    IssueCreated,
    IssueClosed,
}

/// A GitHub issue was opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCreated {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Login of the user who opened the issue
    pub user: String,
}

/// A GitHub issue was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueClosed {
    pub title: String,
}

/// Event dispatched to registered handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueEvent {
    IssueCreated(IssueCreated),
    IssueClosed(IssueClosed),
}

impl IssueEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::IssueCreated(_) => EventKind::IssueCreated,
            Self::IssueClosed(_) => EventKind::IssueClosed,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::IssueCreated(e) => &e.title,
            Self::IssueClosed(e) => &e.title,
        }
    }
}

impl From<IssueCreated> for IssueEvent {
    fn from(event: IssueCreated) -> Self {
        Self::IssueCreated(event)
    }
}

impl From<IssueClosed> for IssueEvent {
    fn from(event: IssueClosed) -> Self {
        Self::IssueClosed(event)
    }
}
