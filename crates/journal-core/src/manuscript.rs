//! Manuscript records and the editorial status machine
//!
//! Nominal transitions:
//! ```text
//! Submitted → Assigned → Accepted
//!                     ↘ Rejected
//! ```
//! The workflow engine only enforces this graph when the decision policy
//! asks it to; by default the latest decision simply overwrites the status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// Unique identifier for a manuscript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManuscriptId(pub i64);

impl ManuscriptId {
    /// Parse a manuscript ID from a path segment or form field
    pub fn parse(s: &str) -> Option<Self> {
        s.trim().parse::<i64>().ok().map(Self)
    }
}

impl std::fmt::Display for ManuscriptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Editorial status of a manuscript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManuscriptStatus {
    /// Newly submitted, waiting for an editor
    Submitted,
    /// An editor has assigned a reviewer
    Assigned,
    /// Accepted for publication
    Accepted,
    /// Rejected
    Rejected,
}

impl ManuscriptStatus {
    /// Check if a transition is part of the nominal forward graph
    pub fn can_transition_to(&self, target: &ManuscriptStatus) -> bool {
        use ManuscriptStatus::*;
        matches!(
            (self, target),
            (Submitted, Assigned) | (Assigned, Accepted) | (Assigned, Rejected)
        )
    }

    /// Get nominal next states from current state
    pub fn valid_transitions(&self) -> Vec<ManuscriptStatus> {
        match self {
            ManuscriptStatus::Submitted => vec![ManuscriptStatus::Assigned],
            ManuscriptStatus::Assigned => {
                vec![ManuscriptStatus::Accepted, ManuscriptStatus::Rejected]
            }
            ManuscriptStatus::Accepted | ManuscriptStatus::Rejected => vec![],
        }
    }

    /// Accepted and rejected are final dispositions
    pub fn is_terminal(&self) -> bool {
        matches!(self, ManuscriptStatus::Accepted | ManuscriptStatus::Rejected)
    }

    /// Whether the public catalog lists manuscripts in this status
    pub fn is_published(&self) -> bool {
        matches!(self, ManuscriptStatus::Accepted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ManuscriptStatus::Submitted => "submitted",
            ManuscriptStatus::Assigned => "assigned",
            ManuscriptStatus::Accepted => "accepted",
            ManuscriptStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "submitted" => Some(ManuscriptStatus::Submitted),
            "assigned" => Some(ManuscriptStatus::Assigned),
            "accepted" => Some(ManuscriptStatus::Accepted),
            "rejected" => Some(ManuscriptStatus::Rejected),
            _ => None,
        }
    }
}

impl Default for ManuscriptStatus {
    fn default() -> Self {
        ManuscriptStatus::Submitted
    }
}

impl std::fmt::Display for ManuscriptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A submitted paper under editorial review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manuscript {
    pub id: ManuscriptId,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Blob locator of the uploaded document
    pub file_path: String,
    pub author_id: UserId,
    pub editor_id: Option<UserId>,
    /// Reviewer named by the editor at assignment time
    pub reviewer_id: Option<UserId>,
    pub status: ManuscriptStatus,
    pub submission_date: DateTime<Utc>,
}

/// A manuscript row that has not been persisted yet
#[derive(Debug, Clone)]
pub struct NewManuscript {
    pub title: String,
    pub abstract_text: String,
    pub file_path: String,
    pub author_id: UserId,
    pub submission_date: DateTime<Utc>,
}

/// Selection of manuscripts to list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManuscriptFilter {
    All,
    ByAuthor(UserId),
    ByStatus(ManuscriptStatus),
}

impl ManuscriptFilter {
    pub fn matches(&self, manuscript: &Manuscript) -> bool {
        match self {
            ManuscriptFilter::All => true,
            ManuscriptFilter::ByAuthor(author) => manuscript.author_id == *author,
            ManuscriptFilter::ByStatus(status) => manuscript.status == *status,
        }
    }
}
