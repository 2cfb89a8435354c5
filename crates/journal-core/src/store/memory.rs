//! In-memory repository

use std::collections::{BTreeMap, HashMap};

use super::Repository;
use crate::access::Role;
use crate::error::{JournalError, Result};
use crate::manuscript::{
    Manuscript, ManuscriptFilter, ManuscriptId, ManuscriptStatus, NewManuscript,
};
use crate::review::{NewReview, Review, ReviewId};
use crate::user::{NewUser, User, UserId};

/// Repository that keeps everything in ordered maps
///
/// Ids start at 1 and increase, matching SQLite row ids.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    users: BTreeMap<UserId, User>,
    usernames: HashMap<String, UserId>,
    manuscripts: BTreeMap<ManuscriptId, Manuscript>,
    reviews: BTreeMap<ReviewId, Review>,
    next_user: i64,
    next_manuscript: i64,
    next_review: i64,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

impl Repository for InMemoryRepository {
    fn insert_user(&mut self, user: NewUser) -> Result<User> {
        if self.usernames.contains_key(&user.username) {
            return Err(JournalError::DuplicateUsername(user.username));
        }

        let id = UserId(Self::next_id(&mut self.next_user));
        let user = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            email: user.email,
        };
        self.usernames.insert(user.username.clone(), id);
        self.users.insert(id, user.clone());
        Ok(user)
    }

    fn user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.get(&id).cloned())
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .usernames
            .get(username)
            .and_then(|id| self.users.get(id))
            .cloned())
    }

    fn users_by_role(&self, role: Role) -> Result<Vec<User>> {
        Ok(self
            .users
            .values()
            .filter(|u| u.role == role)
            .cloned()
            .collect())
    }

    fn insert_manuscript(&mut self, manuscript: NewManuscript) -> Result<Manuscript> {
        let id = ManuscriptId(Self::next_id(&mut self.next_manuscript));
        let manuscript = Manuscript {
            id,
            title: manuscript.title,
            abstract_text: manuscript.abstract_text,
            file_path: manuscript.file_path,
            author_id: manuscript.author_id,
            editor_id: None,
            reviewer_id: None,
            status: ManuscriptStatus::Submitted,
            submission_date: manuscript.submission_date,
        };
        self.manuscripts.insert(id, manuscript.clone());
        Ok(manuscript)
    }

    fn manuscript(&self, id: ManuscriptId) -> Result<Option<Manuscript>> {
        Ok(self.manuscripts.get(&id).cloned())
    }

    fn manuscripts(&self, filter: ManuscriptFilter) -> Result<Vec<Manuscript>> {
        Ok(self
            .manuscripts
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    fn assign(
        &mut self,
        id: ManuscriptId,
        editor_id: UserId,
        reviewer_id: UserId,
    ) -> Result<Manuscript> {
        let manuscript = self
            .manuscripts
            .get_mut(&id)
            .ok_or_else(|| JournalError::NotFound(format!("Manuscript {}", id)))?;
        manuscript.editor_id = Some(editor_id);
        manuscript.reviewer_id = Some(reviewer_id);
        manuscript.status = ManuscriptStatus::Assigned;
        Ok(manuscript.clone())
    }

    fn record_review(&mut self, review: NewReview) -> Result<(Review, Manuscript)> {
        let manuscript = self
            .manuscripts
            .get_mut(&review.manuscript_id)
            .ok_or_else(|| JournalError::NotFound(format!("Manuscript {}", review.manuscript_id)))?;

        let id = ReviewId(Self::next_id(&mut self.next_review));
        let review = Review {
            id,
            manuscript_id: review.manuscript_id,
            reviewer_id: review.reviewer_id,
            feedback: review.feedback,
            decision: review.decision,
            review_date: review.review_date,
        };
        manuscript.status = review.decision.into();
        let manuscript = manuscript.clone();
        self.reviews.insert(id, review.clone());
        Ok((review, manuscript))
    }

    fn reviews_for(&self, manuscript_ids: &[ManuscriptId]) -> Result<Vec<Review>> {
        Ok(self
            .reviews
            .values()
            .filter(|r| manuscript_ids.contains(&r.manuscript_id))
            .cloned()
            .collect())
    }
}
