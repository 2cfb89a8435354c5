//! Journal Core - Editorial workflow for an academic journal
//!
//! This crate provides the core functionality for manuscript handling:
//!
//! - **Access**: Four fixed roles and the capability table checked before every operation
//! - **Credentials**: Registration validation and bcrypt password hashes
//! - **Manuscript**: Manuscript records and their status (submitted→assigned→accepted|rejected)
//! - **Review**: Immutable reviewer feedback and decisions
//! - **Store**: Repository trait with in-memory and SQLite backends
//! - **Blob**: Storage for uploaded manuscript files
//! - **Workflow**: Commands that move manuscripts between states
//! - **Projection**: Role-scoped dashboards over current state
//! - **Export**: Tabular manuscript report rendered as CSV
//! - **Config**: TOML configuration for storage, workflow policy and sessions
//!
//! # Control flow
//!
//! ```text
//! Actor → Command → authorize → validate → Repository → Projection
//! ```

pub mod access;
pub mod blob;
pub mod config;
pub mod credentials;
pub mod error;
pub mod export;
pub mod journal;
pub mod manuscript;
pub mod projection;
pub mod review;
pub mod store;
pub mod user;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use access::{authorize, Actor, Operation, Role};
pub use blob::{BlobStore, FsBlobStore};
pub use config::{ConfigError, JournalConfig};
pub use credentials::{hash_password, verify_password, Registration};
pub use error::{JournalError, Result, StorageError};
pub use export::{render_csv, ExportColumn, Report, MANUSCRIPT_COLUMNS};
pub use journal::{Download, Journal};
pub use manuscript::{Manuscript, ManuscriptFilter, ManuscriptId, ManuscriptStatus};
pub use projection::{
    AuthorDashboard, EditorDashboard, ReaderDashboard, ReviewForm, ReviewHistory,
    ReviewedManuscript, ReviewerDashboard, SubmissionForm,
};
pub use review::{Decision, Review, ReviewId};
pub use store::{InMemoryRepository, Repository};
pub use user::{User, UserId, UserSummary};
pub use workflow::{Command, DecisionPolicy, ManuscriptUpload, Outcome};

#[cfg(feature = "sqlite")]
pub use store::{Schema, SqliteRepository, SCHEMA_VERSION};

/// Returns the version of journal-core
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
