//! Editorial workflow engine
//!
//! ```text
//! Submit (author)            → submitted
//! AssignReviewer (editor)    → assigned
//! RecordDecision (reviewer)  → accepted | rejected
//! ```
//!
//! Every command is authorized against the capability table before any
//! input is looked at, and validated before anything is written.

mod command;

pub use command::{Command, ManuscriptUpload, Outcome};

use serde::{Deserialize, Serialize};

use crate::error::{JournalError, Result};
use crate::manuscript::ManuscriptStatus;
use crate::review::Decision;

/// How the engine treats decisions on manuscripts that already have one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPolicy {
    /// Any decision from any status; the latest one wins
    #[default]
    Permissive,
    /// Refuse decisions on accepted or rejected manuscripts
    RejectTerminal,
}

impl DecisionPolicy {
    /// Check whether `decision` may be recorded on a manuscript in `current`
    pub fn check(&self, current: ManuscriptStatus, decision: Decision) -> Result<()> {
        match self {
            DecisionPolicy::Permissive => Ok(()),
            DecisionPolicy::RejectTerminal if current.is_terminal() => {
                Err(JournalError::InvalidTransition {
                    from: current.to_string(),
                    to: decision.to_string(),
                })
            }
            DecisionPolicy::RejectTerminal => Ok(()),
        }
    }
}
