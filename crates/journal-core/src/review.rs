//! Review records and reviewer decisions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manuscript::{ManuscriptId, ManuscriptStatus};
use crate::user::UserId;

/// Unique identifier for a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub i64);

impl std::fmt::Display for ReviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reviewer's verdict, reused as the manuscript's next status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accepted,
    Rejected,
}

impl Decision {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "accepted" => Some(Decision::Accepted),
            "rejected" => Some(Decision::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Accepted => "accepted",
            Decision::Rejected => "rejected",
        }
    }
}

impl From<Decision> for ManuscriptStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Accepted => ManuscriptStatus::Accepted,
            Decision::Rejected => ManuscriptStatus::Rejected,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reviewer's feedback and decision on one manuscript. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub manuscript_id: ManuscriptId,
    pub reviewer_id: UserId,
    pub feedback: String,
    pub decision: Decision,
    pub review_date: DateTime<Utc>,
}

/// A review row that has not been persisted yet
#[derive(Debug, Clone)]
pub struct NewReview {
    pub manuscript_id: ManuscriptId,
    pub reviewer_id: UserId,
    pub feedback: String,
    pub decision: Decision,
    pub review_date: DateTime<Utc>,
}
