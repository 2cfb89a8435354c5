//! Command handlers for workflow transitions

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::access::{authorize, Actor, Operation, Role};
use crate::blob::BlobStore;
use crate::error::{JournalError, Result};
use crate::journal::Journal;
use crate::manuscript::{Manuscript, ManuscriptId, NewManuscript};
use crate::review::{Decision, NewReview, Review};
use crate::user::UserId;

/// A manuscript document as received from the client
#[derive(Debug, Clone)]
pub struct ManuscriptUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Commands that move a manuscript through the workflow
///
/// Text fields arrive raw; blank values are rejected during execution.
#[derive(Debug, Clone)]
pub enum Command {
    /// Author submits a new manuscript
    SubmitManuscript {
        title: String,
        abstract_text: String,
        file: Option<ManuscriptUpload>,
    },

    /// Editor takes a manuscript and names its reviewer
    AssignReviewer {
        manuscript_id: ManuscriptId,
        reviewer_id: Option<UserId>,
    },

    /// Reviewer records feedback and a decision
    RecordDecision {
        manuscript_id: ManuscriptId,
        feedback: String,
        decision: String,
    },
}

/// Result of a successful command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Submitted { manuscript: Manuscript },
    Assigned { manuscript: Manuscript },
    Decided { manuscript: Manuscript, review: Review },
}

impl Outcome {
    /// The manuscript as it stands after the command
    pub fn manuscript(&self) -> &Manuscript {
        match self {
            Outcome::Submitted { manuscript }
            | Outcome::Assigned { manuscript }
            | Outcome::Decided { manuscript, .. } => manuscript,
        }
    }
}

impl Command {
    /// The capability this command requires
    pub fn operation(&self) -> Operation {
        match self {
            Command::SubmitManuscript { .. } => Operation::SubmitManuscript,
            Command::AssignReviewer { .. } => Operation::AssignReviewer,
            Command::RecordDecision { .. } => Operation::RecordDecision,
        }
    }

    /// Execute the command as `actor`
    ///
    /// Authorization happens first; a Forbidden outcome performs no write.
    pub fn execute(self, actor: &Actor, journal: &mut Journal) -> Result<Outcome> {
        let operation = self.operation();
        authorize(actor, operation)?;
        let actor_id = actor.require_user(operation)?;

        match self {
            Command::SubmitManuscript {
                title,
                abstract_text,
                file,
            } => {
                let title = required("title", title)?;
                let abstract_text = required("abstract", abstract_text)?;
                let file = file
                    .filter(|f| !f.bytes.is_empty())
                    .ok_or_else(|| JournalError::missing_field("manuscript file"))?;

                // The upload completes before the record exists.
                let locator = journal.blobs.put(&file.file_name, &file.bytes)?;

                let inserted = journal.repository.insert_manuscript(NewManuscript {
                    title,
                    abstract_text,
                    file_path: locator.clone(),
                    author_id: actor_id,
                    submission_date: Utc::now(),
                });

                match inserted {
                    Ok(manuscript) => {
                        info!(
                            manuscript_id = %manuscript.id,
                            author_id = %actor_id,
                            "Manuscript submitted"
                        );
                        Ok(Outcome::Submitted { manuscript })
                    }
                    Err(err) => Err(rollback_upload(&*journal.blobs, &locator, err)),
                }
            }

            Command::AssignReviewer {
                manuscript_id,
                reviewer_id,
            } => {
                let reviewer_id =
                    reviewer_id.ok_or_else(|| JournalError::missing_field("reviewerId"))?;

                if journal.repository.manuscript(manuscript_id)?.is_none() {
                    return Err(JournalError::NotFound(format!("Manuscript {}", manuscript_id)));
                }

                let reviewer = journal
                    .repository
                    .user(reviewer_id)?
                    .filter(|u| u.role == Role::Reviewer)
                    .ok_or_else(|| {
                        JournalError::Validation(format!("user {} is not a reviewer", reviewer_id))
                    })?;

                let manuscript = journal
                    .repository
                    .assign(manuscript_id, actor_id, reviewer.id)?;

                info!(
                    manuscript_id = %manuscript_id,
                    editor_id = %actor_id,
                    reviewer_id = %reviewer.id,
                    "Reviewer assigned"
                );
                Ok(Outcome::Assigned { manuscript })
            }

            Command::RecordDecision {
                manuscript_id,
                feedback,
                decision,
            } => {
                let feedback = required("feedback", feedback)?;
                let decision_text = required("decision", decision)?;
                let decision = Decision::parse(&decision_text).ok_or_else(|| {
                    JournalError::Validation(format!(
                        "decision must be accepted or rejected (got {})",
                        decision_text
                    ))
                })?;

                let current = journal
                    .repository
                    .manuscript(manuscript_id)?
                    .ok_or_else(|| JournalError::NotFound(format!("Manuscript {}", manuscript_id)))?;
                journal.policy.check(current.status, decision)?;

                let (review, manuscript) = journal.repository.record_review(NewReview {
                    manuscript_id,
                    reviewer_id: actor_id,
                    feedback,
                    decision,
                    review_date: Utc::now(),
                })?;

                info!(
                    manuscript_id = %manuscript_id,
                    reviewer_id = %actor_id,
                    from = %current.status,
                    to = %manuscript.status,
                    "Review decision recorded"
                );
                Ok(Outcome::Decided { manuscript, review })
            }
        }
    }
}

/// Trim a required text field, rejecting blanks
fn required(field: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(JournalError::missing_field(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Undo a stored upload after its record failed to persist
fn rollback_upload(blobs: &dyn BlobStore, locator: &str, cause: JournalError) -> JournalError {
    match blobs.remove(locator) {
        Ok(()) => {
            warn!(locator, error = %cause, "Submission failed, upload removed");
            cause
        }
        Err(cleanup) => {
            warn!(locator, error = %cause, cleanup_error = %cleanup, "Submission failed, upload orphaned");
            JournalError::UploadOrphan {
                locator: locator.to_string(),
                reason: format!("{}; cleanup failed: {}", cause, cleanup),
            }
        }
    }
}
