//! Roles, request identity and the capability table
//!
//! Every operation the journal exposes is listed in [`Operation`], and each
//! operation names the roles allowed to perform it. Handlers never compare
//! role strings themselves; they call [`authorize`].

use serde::{Deserialize, Serialize};

use crate::error::{JournalError, Result};
use crate::user::UserId;

/// The four fixed roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Anonymous reader of the public catalog
    Reader,
    /// Submits manuscripts
    Author,
    /// Records review decisions
    Reviewer,
    /// Assigns reviewers and exports reports
    Editor,
}

impl Role {
    /// Roles a user may register with
    pub const REGISTRABLE: [Role; 3] = [Role::Author, Role::Reviewer, Role::Editor];

    /// Get the wire name of the role
    pub fn name(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Author => "author",
            Role::Reviewer => "reviewer",
            Role::Editor => "editor",
        }
    }

    /// Parse a role from its wire name
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "reader" => Some(Role::Reader),
            "author" => Some(Role::Author),
            "reviewer" => Some(Role::Reviewer),
            "editor" => Some(Role::Editor),
            _ => None,
        }
    }

    /// Whether a user account can hold this role
    pub fn is_registrable(&self) -> bool {
        Self::REGISTRABLE.contains(self)
    }

    /// Landing dashboard after login
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Reader => "/reader-dashboard",
            Role::Author => "/author-dashboard",
            Role::Reviewer => "/reviewer-dashboard",
            Role::Editor => "/editor-dashboard",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Identity a request runs as
///
/// Derived once per request from the session and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<UserId>,
    pub role: Role,
}

impl Actor {
    /// An unauthenticated caller
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Reader,
        }
    }

    /// A logged-in user
    pub fn user(user_id: UserId, role: Role) -> Self {
        Self {
            user_id: Some(user_id),
            role,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The user id, or Forbidden for anonymous callers
    pub fn require_user(&self, operation: Operation) -> Result<UserId> {
        self.user_id.ok_or_else(|| forbidden(self.role, operation))
    }
}

/// Operations gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    SubmitManuscript,
    AssignReviewer,
    RecordDecision,
    ViewAuthorDashboard,
    ViewReviewerDashboard,
    ViewEditorDashboard,
    ViewReaderDashboard,
    ViewReviews,
    DownloadManuscript,
    ExportReport,
}

impl Operation {
    /// Roles allowed to perform this operation
    pub fn allowed_roles(&self) -> &'static [Role] {
        use Role::*;
        match self {
            Operation::SubmitManuscript => &[Author],
            Operation::AssignReviewer => &[Editor],
            Operation::RecordDecision => &[Reviewer],
            Operation::ViewAuthorDashboard => &[Author, Reviewer, Editor],
            Operation::ViewReviewerDashboard => &[Reviewer],
            Operation::ViewEditorDashboard => &[Editor],
            Operation::ViewReaderDashboard => &[Reader, Author, Reviewer, Editor],
            Operation::ViewReviews => &[Author, Reviewer, Editor],
            Operation::DownloadManuscript => &[Reader, Author, Reviewer, Editor],
            Operation::ExportReport => &[Editor],
        }
    }

    /// Whether anonymous callers may perform this operation
    pub fn is_public(&self) -> bool {
        self.allowed_roles().contains(&Role::Reader)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::SubmitManuscript => "submit a manuscript",
            Operation::AssignReviewer => "assign a reviewer",
            Operation::RecordDecision => "record a review decision",
            Operation::ViewAuthorDashboard => "view the author dashboard",
            Operation::ViewReviewerDashboard => "view the reviewer dashboard",
            Operation::ViewEditorDashboard => "view the editor dashboard",
            Operation::ViewReaderDashboard => "view the reader dashboard",
            Operation::ViewReviews => "view reviews",
            Operation::DownloadManuscript => "download a manuscript",
            Operation::ExportReport => "export the manuscript report",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Check the capability table for `actor` performing `operation`
pub fn authorize(actor: &Actor, operation: Operation) -> Result<()> {
    // A non-reader role without a user id is not a real session.
    if !operation.is_public() && !actor.is_authenticated() {
        return Err(forbidden(actor.role, operation));
    }
    if operation.allowed_roles().contains(&actor.role) {
        Ok(())
    } else {
        Err(forbidden(actor.role, operation))
    }
}

fn forbidden(role: Role, operation: Operation) -> JournalError {
    JournalError::Forbidden {
        role: role.to_string(),
        operation: operation.to_string(),
    }
}
