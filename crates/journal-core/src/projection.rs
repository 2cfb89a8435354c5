//! Read-only dashboard views
//!
//! Each view is a function of repository state and the caller. None of them
//! writes; callers holding a shared lock on the [`Journal`] get a consistent
//! snapshot.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::access::{authorize, Actor, Operation, Role};
use crate::error::{JournalError, Result};
use crate::journal::Journal;
use crate::manuscript::{Manuscript, ManuscriptFilter, ManuscriptId, ManuscriptStatus};
use crate::review::{Decision, Review};
use crate::user::UserSummary;

/// Manuscripts written by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorDashboard {
    pub manuscripts: Vec<Manuscript>,
}

/// A manuscript together with the reviews recorded so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewedManuscript {
    #[serde(flatten)]
    pub manuscript: Manuscript,
    pub reviews: Vec<Review>,
}

/// Manuscripts awaiting review
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewerDashboard {
    pub manuscripts: Vec<ReviewedManuscript>,
}

/// Every manuscript, plus the reviewers an editor can assign
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorDashboard {
    pub manuscripts: Vec<Manuscript>,
    pub reviewers: Vec<UserSummary>,
}

/// Published manuscripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReaderDashboard {
    pub manuscripts: Vec<Manuscript>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewHistory {
    pub manuscript_id: ManuscriptId,
    pub title: String,
    pub reviews: Vec<Review>,
}

/// What a reviewer needs to fill in a review
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewForm {
    pub manuscript: Manuscript,
    pub decisions: Vec<Decision>,
}

/// Fields expected by the submission endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionForm {
    pub fields: Vec<&'static str>,
}

impl Journal {
    /// Manuscripts whose author is the caller
    pub fn author_dashboard(&self, actor: &Actor) -> Result<AuthorDashboard> {
        authorize(actor, Operation::ViewAuthorDashboard)?;
        let author_id = actor.require_user(Operation::ViewAuthorDashboard)?;

        let manuscripts = self
            .repository
            .manuscripts(ManuscriptFilter::ByAuthor(author_id))?;
        debug!(author_id = %author_id, count = manuscripts.len(), "Author dashboard");
        Ok(AuthorDashboard { manuscripts })
    }

    /// Submitted manuscripts with their reviews
    ///
    /// Reviews are loaded in one batch and grouped by manuscript.
    pub fn reviewer_dashboard(&self, actor: &Actor) -> Result<ReviewerDashboard> {
        authorize(actor, Operation::ViewReviewerDashboard)?;

        let manuscripts = self
            .repository
            .manuscripts(ManuscriptFilter::ByStatus(ManuscriptStatus::Submitted))?;
        let ids: Vec<ManuscriptId> = manuscripts.iter().map(|m| m.id).collect();

        let mut grouped: BTreeMap<ManuscriptId, Vec<Review>> = BTreeMap::new();
        for review in self.repository.reviews_for(&ids)? {
            grouped.entry(review.manuscript_id).or_default().push(review);
        }

        let manuscripts: Vec<ReviewedManuscript> = manuscripts
            .into_iter()
            .map(|manuscript| ReviewedManuscript {
                reviews: grouped.remove(&manuscript.id).unwrap_or_default(),
                manuscript,
            })
            .collect();

        debug!(count = manuscripts.len(), "Reviewer dashboard");
        Ok(ReviewerDashboard { manuscripts })
    }

    /// All manuscripts and all reviewers
    pub fn editor_dashboard(&self, actor: &Actor) -> Result<EditorDashboard> {
        authorize(actor, Operation::ViewEditorDashboard)?;

        let manuscripts = self.repository.manuscripts(ManuscriptFilter::All)?;
        let reviewers = self
            .repository
            .users_by_role(Role::Reviewer)?
            .iter()
            .map(UserSummary::from)
            .collect::<Vec<_>>();

        debug!(
            manuscripts = manuscripts.len(),
            reviewers = reviewers.len(),
            "Editor dashboard"
        );
        Ok(EditorDashboard {
            manuscripts,
            reviewers,
        })
    }

    /// Accepted manuscripts; open to everyone
    pub fn reader_dashboard(&self, actor: &Actor) -> Result<ReaderDashboard> {
        authorize(actor, Operation::ViewReaderDashboard)?;

        let manuscripts = self
            .repository
            .manuscripts(ManuscriptFilter::ByStatus(ManuscriptStatus::Accepted))?;
        debug!(count = manuscripts.len(), "Reader dashboard");
        Ok(ReaderDashboard { manuscripts })
    }

    /// Every review recorded for one manuscript
    pub fn review_history(&self, actor: &Actor, id: ManuscriptId) -> Result<ReviewHistory> {
        authorize(actor, Operation::ViewReviews)?;

        let manuscript = self.require_manuscript(id)?;
        let reviews = self.repository.reviews_for(&[id])?;
        debug!(manuscript_id = %id, count = reviews.len(), "Review history");
        Ok(ReviewHistory {
            manuscript_id: id,
            title: manuscript.title,
            reviews,
        })
    }

    pub fn review_form(&self, actor: &Actor, id: ManuscriptId) -> Result<ReviewForm> {
        authorize(actor, Operation::RecordDecision)?;
        Ok(ReviewForm {
            manuscript: self.require_manuscript(id)?,
            decisions: vec![Decision::Accepted, Decision::Rejected],
        })
    }

    pub fn submission_form(&self, actor: &Actor) -> Result<SubmissionForm> {
        authorize(actor, Operation::SubmitManuscript)?;
        Ok(SubmissionForm {
            fields: vec!["title", "abstract", "manuscript"],
        })
    }

    fn require_manuscript(&self, id: ManuscriptId) -> Result<Manuscript> {
        self.repository
            .manuscript(id)?
            .ok_or_else(|| JournalError::NotFound(format!("Manuscript {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::testing::{apply, register, seeded, step, submit};
    use crate::workflow::Command;

    fn decide(id: ManuscriptId, decision: &str) -> Command {
        Command::RecordDecision {
            manuscript_id: id,
            feedback: "Solid work.".to_string(),
            decision: decision.to_string(),
        }
    }

    #[test]
    fn test_editorial_scenario() {
        let (mut journal, cast) = seeded();

        let id = journal
            .execute(&cast.author, submit("Paper A"))
            .unwrap()
            .manuscript()
            .id;
        let reader = journal.reader_dashboard(&Actor::anonymous()).unwrap();
        assert!(reader.manuscripts.is_empty());

        let assigned = journal
            .execute(
                &cast.editor,
                Command::AssignReviewer {
                    manuscript_id: id,
                    reviewer_id: cast.reviewer.user_id,
                },
            )
            .unwrap();
        assert_eq!(assigned.manuscript().status, ManuscriptStatus::Assigned);
        assert_eq!(assigned.manuscript().editor_id, cast.editor.user_id);
        assert!(journal
            .reader_dashboard(&Actor::anonymous())
            .unwrap()
            .manuscripts
            .is_empty());

        journal.execute(&cast.reviewer, decide(id, "accepted")).unwrap();

        let reader = journal.reader_dashboard(&Actor::anonymous()).unwrap();
        assert_eq!(reader.manuscripts.len(), 1);
        assert_eq!(reader.manuscripts[0].title, "Paper A");
        assert_eq!(reader.manuscripts[0].status, ManuscriptStatus::Accepted);

        let history = journal.review_history(&cast.author, id).unwrap();
        assert_eq!(history.reviews.len(), 1);
        assert_eq!(history.reviews[0].reviewer_id, cast.reviewer.user_id.unwrap());
    }

    #[test]
    fn test_author_dashboard_is_scoped_to_caller() {
        let (mut journal, cast) = seeded();
        let bob = register(&mut journal, "bob", "author");
        journal.execute(&cast.author, submit("Alice 1")).unwrap();
        journal.execute(&bob, submit("Bob 1")).unwrap();
        journal.execute(&cast.author, submit("Alice 2")).unwrap();

        let titles: Vec<String> = journal
            .author_dashboard(&cast.author)
            .unwrap()
            .manuscripts
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["Alice 1", "Alice 2"]);

        // Open to other roles, empty for them.
        assert!(journal
            .author_dashboard(&cast.editor)
            .unwrap()
            .manuscripts
            .is_empty());
        assert!(matches!(
            journal.author_dashboard(&Actor::anonymous()),
            Err(JournalError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_reviewer_dashboard_lists_pending_only() {
        let (mut journal, cast) = seeded();
        let a = journal.execute(&cast.author, submit("A")).unwrap().manuscript().id;
        let b = journal.execute(&cast.author, submit("B")).unwrap().manuscript().id;
        let c = journal.execute(&cast.author, submit("C")).unwrap().manuscript().id;

        journal.execute(&cast.reviewer, decide(a, "rejected")).unwrap();
        journal.execute(&cast.reviewer, decide(c, "accepted")).unwrap();

        let view = journal.reviewer_dashboard(&cast.reviewer).unwrap();
        assert_eq!(view.manuscripts.len(), 1);
        assert_eq!(view.manuscripts[0].manuscript.id, b);
        assert!(view.manuscripts[0].reviews.is_empty());

        // Reviews outlive the status change.
        assert_eq!(journal.review_history(&cast.reviewer, a).unwrap().reviews.len(), 1);

        assert!(matches!(
            journal.reviewer_dashboard(&cast.editor),
            Err(JournalError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_editor_dashboard_lists_everything() {
        let (mut journal, cast) = seeded();
        register(&mut journal, "rev2", "reviewer");
        let a = journal.execute(&cast.author, submit("A")).unwrap().manuscript().id;
        journal.execute(&cast.author, submit("B")).unwrap();
        journal.execute(&cast.reviewer, decide(a, "rejected")).unwrap();

        let view = journal.editor_dashboard(&cast.editor).unwrap();
        assert_eq!(view.manuscripts.len(), 2);
        let names: Vec<&str> = view.reviewers.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["rev1", "rev2"]);

        assert!(matches!(
            journal.editor_dashboard(&cast.author),
            Err(JournalError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_forms_and_history_errors() {
        let (mut journal, cast) = seeded();
        let id = journal.execute(&cast.author, submit("A")).unwrap().manuscript().id;

        assert_eq!(journal.review_form(&cast.reviewer, id).unwrap().manuscript.id, id);
        assert!(matches!(
            journal.review_form(&cast.reviewer, ManuscriptId(77)),
            Err(JournalError::NotFound(_))
        ));
        assert!(matches!(
            journal.review_form(&cast.author, id),
            Err(JournalError::Forbidden { .. })
        ));

        assert_eq!(
            journal.submission_form(&cast.author).unwrap().fields,
            vec!["title", "abstract", "manuscript"]
        );
        assert!(journal.submission_form(&cast.reviewer).is_err());

        assert!(matches!(
            journal.review_history(&Actor::anonymous(), id),
            Err(JournalError::Forbidden { .. })
        ));
        assert!(matches!(
            journal.review_history(&cast.editor, ManuscriptId(77)),
            Err(JournalError::NotFound(_))
        ));
    }

    #[test]
    fn test_reviewed_manuscript_serializes_flat() {
        let (mut journal, cast) = seeded();
        journal.execute(&cast.author, submit("A")).unwrap();
        let view = journal.reviewer_dashboard(&cast.reviewer).unwrap();

        let json = serde_json::to_value(&view).unwrap();
        let first = &json["manuscripts"][0];
        assert_eq!(first["title"], "A");
        assert_eq!(first["status"], "submitted");
        assert!(first["reviews"].as_array().unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn reader_dashboard_only_shows_accepted(steps in prop::collection::vec(step(), 0..40)) {
            let (mut journal, cast) = seeded();
            for step in &steps {
                apply(&mut journal, &cast, step);
            }

            let view = journal.reader_dashboard(&Actor::anonymous()).unwrap();
            prop_assert!(view
                .manuscripts
                .iter()
                .all(|m| m.status == ManuscriptStatus::Accepted));

            let accepted = journal
                .repository()
                .manuscripts(ManuscriptFilter::All)
                .unwrap()
                .into_iter()
                .filter(|m| m.status == ManuscriptStatus::Accepted)
                .count();
            prop_assert_eq!(view.manuscripts.len(), accepted);
        }
    }
}
