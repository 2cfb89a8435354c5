//! Persistence layer for journal state
//!
//! The [`Repository`] trait abstracts storage of users, manuscripts and
//! reviews. Two backends are provided: an in-memory store used by tests and
//! ephemeral servers, and a SQLite store behind the `sqlite` feature.
//!
//! Reads take `&self`, writes take `&mut self`. Callers that share a store
//! across tasks wrap the owning journal in a read/write lock, which is what
//! makes each command an atomic read-modify-write and each projection a
//! consistent snapshot.

mod memory;
#[cfg(feature = "sqlite")]
mod schema;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::InMemoryRepository;
#[cfg(feature = "sqlite")]
pub use schema::{Schema, SCHEMA_VERSION};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;

use crate::access::Role;
use crate::error::Result;
use crate::manuscript::{Manuscript, ManuscriptFilter, ManuscriptId, NewManuscript};
use crate::review::{NewReview, Review};
use crate::user::{NewUser, User, UserId};

/// Storage backend for the journal
pub trait Repository: Send + Sync {
    // ==================== Users ====================

    /// Persist a new user. Fails with `DuplicateUsername` if the name is taken.
    fn insert_user(&mut self, user: NewUser) -> Result<User>;

    /// Get a user by ID
    fn user(&self, id: UserId) -> Result<Option<User>>;

    /// Get a user by username
    fn user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get all users holding a role, ordered by id
    fn users_by_role(&self, role: Role) -> Result<Vec<User>>;

    // ==================== Manuscripts ====================

    /// Persist a new manuscript with status `submitted` and no editor
    fn insert_manuscript(&mut self, manuscript: NewManuscript) -> Result<Manuscript>;

    /// Get a manuscript by ID
    fn manuscript(&self, id: ManuscriptId) -> Result<Option<Manuscript>>;

    /// List manuscripts matching a filter, ordered by id
    fn manuscripts(&self, filter: ManuscriptFilter) -> Result<Vec<Manuscript>>;

    /// Set the editor and reviewer and move the manuscript to `assigned`.
    /// Fails with `NotFound` if the manuscript does not exist.
    fn assign(
        &mut self,
        id: ManuscriptId,
        editor_id: UserId,
        reviewer_id: UserId,
    ) -> Result<Manuscript>;

    // ==================== Reviews ====================

    /// Append a review and set the manuscript status to its decision, as one
    /// atomic unit. Fails with `NotFound` if the manuscript does not exist.
    fn record_review(&mut self, review: NewReview) -> Result<(Review, Manuscript)>;

    /// All reviews for the given manuscripts, ordered by review id
    fn reviews_for(&self, manuscript_ids: &[ManuscriptId]) -> Result<Vec<Review>>;
}
