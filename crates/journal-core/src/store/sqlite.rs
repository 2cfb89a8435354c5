//! SQLite-backed repository

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::schema::{Schema, SCHEMA_VERSION};
use super::Repository;
use crate::access::Role;
use crate::error::{JournalError, Result, StorageError};
use crate::manuscript::{
    Manuscript, ManuscriptFilter, ManuscriptId, ManuscriptStatus, NewManuscript,
};
use crate::review::{Decision, NewReview, Review, ReviewId};
use crate::user::{NewUser, User, UserId};

const MANUSCRIPT_COLUMNS: &str =
    "id, title, abstract, file_path, author_id, editor_id, reviewer_id, status, submission_date";
const REVIEW_COLUMNS: &str = "id, manuscript_id, reviewer_id, feedback, decision, review_date";
const USER_COLUMNS: &str = "id, username, password, role, email";

/// Repository persisting journal state to a SQLite database
///
/// The connection is not `Sync`, so it sits behind a mutex. Writers take
/// `&mut self` and reach the connection without locking.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (or create) the database at the given path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Initialize the database schema
    fn initialize(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // schema_version does not exist yet on a fresh file
        let current_version = Self::schema_version(conn).unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(Schema::create_tables())?;
            Self::set_schema_version(conn, SCHEMA_VERSION)?;
        } else if current_version < SCHEMA_VERSION {
            for version in current_version..SCHEMA_VERSION {
                if let Some(migration) = Schema::migration(version, version + 1) {
                    conn.execute_batch(migration)?;
                }
            }
            Self::set_schema_version(conn, SCHEMA_VERSION)?;
        } else if current_version > SCHEMA_VERSION {
            return Err(StorageError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                actual: current_version,
            }
            .into());
        }

        Ok(())
    }

    fn schema_version(conn: &Connection) -> Option<u32> {
        conn.query_row(
            "SELECT version FROM schema_version ORDER BY rowid DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .ok()
    }

    fn set_schema_version(conn: &Connection, version: u32) -> Result<()> {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()).into())
    }

    fn conn_mut(&mut self) -> Result<&mut Connection> {
        self.conn
            .get_mut()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()).into())
    }

    fn load_manuscript(conn: &Connection, id: ManuscriptId) -> Result<Option<Manuscript>> {
        let sql = format!("SELECT {} FROM manuscripts WHERE id = ?1", MANUSCRIPT_COLUMNS);
        Ok(conn
            .query_row(&sql, [id.0], Self::row_to_manuscript)
            .optional()?)
    }

    // ==================== Row Mapping ====================

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let role: String = row.get(3)?;
        Ok(User {
            id: UserId(row.get(0)?),
            username: row.get(1)?,
            password_hash: row.get(2)?,
            role: Role::parse(&role).ok_or_else(|| conversion_error(3, "role", &role))?,
            email: row.get(4)?,
        })
    }

    fn row_to_manuscript(row: &rusqlite::Row) -> rusqlite::Result<Manuscript> {
        let status: String = row.get(7)?;
        let submission_date: String = row.get(8)?;
        Ok(Manuscript {
            id: ManuscriptId(row.get(0)?),
            title: row.get(1)?,
            abstract_text: row.get(2)?,
            file_path: row.get(3)?,
            author_id: UserId(row.get(4)?),
            editor_id: row.get::<_, Option<i64>>(5)?.map(UserId),
            reviewer_id: row.get::<_, Option<i64>>(6)?.map(UserId),
            status: ManuscriptStatus::parse(&status)
                .ok_or_else(|| conversion_error(7, "status", &status))?,
            submission_date: parse_timestamp(8, &submission_date)?,
        })
    }

    fn row_to_review(row: &rusqlite::Row) -> rusqlite::Result<Review> {
        let decision: String = row.get(4)?;
        let review_date: String = row.get(5)?;
        Ok(Review {
            id: ReviewId(row.get(0)?),
            manuscript_id: ManuscriptId(row.get(1)?),
            reviewer_id: UserId(row.get(2)?),
            feedback: row.get(3)?,
            decision: Decision::parse(&decision)
                .ok_or_else(|| conversion_error(4, "decision", &decision))?,
            review_date: parse_timestamp(5, &review_date)?,
        })
    }
}

fn conversion_error(index: usize, column: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        Type::Text,
        format!("invalid {} value: {}", column, value).into(),
    )
}

fn parse_timestamp(index: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Repository for SqliteRepository {
    // ==================== User Operations ====================

    fn insert_user(&mut self, user: NewUser) -> Result<User> {
        let conn = self.conn_mut()?;
        let inserted = conn.execute(
            "INSERT INTO users (username, password, role, email) VALUES (?1, ?2, ?3, ?4)",
            params![user.username, user.password_hash, user.role.name(), user.email],
        );

        match inserted {
            Ok(_) => Ok(User {
                id: UserId(conn.last_insert_rowid()),
                username: user.username,
                password_hash: user.password_hash,
                role: user.role,
                email: user.email,
            }),
            Err(e) if is_unique_violation(&e) => Err(JournalError::DuplicateUsername(user.username)),
            Err(e) => Err(e.into()),
        }
    }

    fn user(&self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        Ok(self
            .conn()?
            .query_row(&sql, [id.0], Self::row_to_user)
            .optional()?)
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
        Ok(self
            .conn()?
            .query_row(&sql, [username], Self::row_to_user)
            .optional()?)
    }

    fn users_by_role(&self, role: Role) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM users WHERE role = ?1 ORDER BY id", USER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let users = stmt
            .query_map([role.name()], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    // ==================== Manuscript Operations ====================

    fn insert_manuscript(&mut self, manuscript: NewManuscript) -> Result<Manuscript> {
        let conn = self.conn_mut()?;
        conn.execute(
            r#"
            INSERT INTO manuscripts (title, abstract, file_path, author_id, status, submission_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                manuscript.title,
                manuscript.abstract_text,
                manuscript.file_path,
                manuscript.author_id.0,
                ManuscriptStatus::Submitted.as_str(),
                manuscript.submission_date.to_rfc3339(),
            ],
        )?;

        Ok(Manuscript {
            id: ManuscriptId(conn.last_insert_rowid()),
            title: manuscript.title,
            abstract_text: manuscript.abstract_text,
            file_path: manuscript.file_path,
            author_id: manuscript.author_id,
            editor_id: None,
            reviewer_id: None,
            status: ManuscriptStatus::Submitted,
            submission_date: manuscript.submission_date,
        })
    }

    fn manuscript(&self, id: ManuscriptId) -> Result<Option<Manuscript>> {
        let conn = self.conn()?;
        Self::load_manuscript(&conn, id)
    }

    fn manuscripts(&self, filter: ManuscriptFilter) -> Result<Vec<Manuscript>> {
        let conn = self.conn()?;

        let (clause, arg): (&str, Option<rusqlite::types::Value>) = match filter {
            ManuscriptFilter::All => ("", None),
            ManuscriptFilter::ByAuthor(author) => {
                ("WHERE author_id = ?1", Some(author.0.into()))
            }
            ManuscriptFilter::ByStatus(status) => {
                ("WHERE status = ?1", Some(status.as_str().to_string().into()))
            }
        };
        let sql = format!(
            "SELECT {} FROM manuscripts {} ORDER BY id",
            MANUSCRIPT_COLUMNS, clause
        );
        let mut stmt = conn.prepare(&sql)?;

        let manuscripts = stmt
            .query_map(rusqlite::params_from_iter(arg), Self::row_to_manuscript)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(manuscripts)
    }

    fn assign(
        &mut self,
        id: ManuscriptId,
        editor_id: UserId,
        reviewer_id: UserId,
    ) -> Result<Manuscript> {
        let conn = self.conn_mut()?;
        let updated = conn.execute(
            "UPDATE manuscripts SET status = ?1, editor_id = ?2, reviewer_id = ?3 WHERE id = ?4",
            params![
                ManuscriptStatus::Assigned.as_str(),
                editor_id.0,
                reviewer_id.0,
                id.0
            ],
        )?;
        if updated == 0 {
            return Err(JournalError::NotFound(format!("Manuscript {}", id)));
        }

        Self::load_manuscript(conn, id)?
            .ok_or_else(|| JournalError::NotFound(format!("Manuscript {}", id)))
    }

    // ==================== Review Operations ====================

    fn record_review(&mut self, review: NewReview) -> Result<(Review, Manuscript)> {
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;

        let status: ManuscriptStatus = review.decision.into();
        let updated = tx.execute(
            "UPDATE manuscripts SET status = ?1 WHERE id = ?2",
            params![status.as_str(), review.manuscript_id.0],
        )?;
        if updated == 0 {
            // Dropping the transaction rolls it back.
            return Err(JournalError::NotFound(format!(
                "Manuscript {}",
                review.manuscript_id
            )));
        }

        tx.execute(
            r#"
            INSERT INTO reviews (manuscript_id, reviewer_id, feedback, decision, review_date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                review.manuscript_id.0,
                review.reviewer_id.0,
                review.feedback,
                review.decision.as_str(),
                review.review_date.to_rfc3339(),
            ],
        )?;
        let review_id = ReviewId(tx.last_insert_rowid());
        let manuscript = Self::load_manuscript(&tx, review.manuscript_id)?.ok_or_else(|| {
            JournalError::NotFound(format!("Manuscript {}", review.manuscript_id))
        })?;
        tx.commit()?;

        Ok((
            Review {
                id: review_id,
                manuscript_id: review.manuscript_id,
                reviewer_id: review.reviewer_id,
                feedback: review.feedback,
                decision: review.decision,
                review_date: review.review_date,
            },
            manuscript,
        ))
    }

    fn reviews_for(&self, manuscript_ids: &[ManuscriptId]) -> Result<Vec<Review>> {
        if manuscript_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let placeholders = vec!["?"; manuscript_ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM reviews WHERE manuscript_id IN ({}) ORDER BY id",
            REVIEW_COLUMNS, placeholders
        );
        let mut stmt = conn.prepare(&sql)?;

        let reviews = stmt
            .query_map(
                rusqlite::params_from_iter(manuscript_ids.iter().map(|id| id.0)),
                Self::row_to_review,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_user(repo: &mut SqliteRepository, name: &str, role: Role) -> User {
        repo.insert_user(NewUser {
            username: name.to_string(),
            password_hash: "$2b$10$unused".to_string(),
            role,
            email: format!("{}@example.org", name),
        })
        .unwrap()
    }

    fn seed_manuscript(repo: &mut SqliteRepository, author: UserId, title: &str) -> Manuscript {
        repo.insert_manuscript(NewManuscript {
            title: title.to_string(),
            abstract_text: "An abstract".to_string(),
            file_path: format!("uploads/{}.pdf", title),
            author_id: author,
            submission_date: Utc::now(),
        })
        .unwrap()
    }

    #[test]
    fn test_repository_creation() {
        let repo = SqliteRepository::in_memory().unwrap();
        assert!(repo.manuscripts(ManuscriptFilter::All).unwrap().is_empty());
    }

    #[test]
    fn test_user_crud() {
        let mut repo = SqliteRepository::in_memory().unwrap();
        let alice = seed_user(&mut repo, "alice", Role::Author);
        seed_user(&mut repo, "rev1", Role::Reviewer);

        let loaded = repo.user_by_username("alice").unwrap().unwrap();
        assert_eq!(loaded, alice);
        assert_eq!(repo.user(alice.id).unwrap().unwrap().role, Role::Author);
        assert!(repo.user_by_username("nobody").unwrap().is_none());

        let reviewers = repo.users_by_role(Role::Reviewer).unwrap();
        assert_eq!(reviewers.len(), 1);
        assert_eq!(reviewers[0].username, "rev1");
    }

    #[test]
    fn test_duplicate_username() {
        let mut repo = SqliteRepository::in_memory().unwrap();
        seed_user(&mut repo, "alice", Role::Author);

        let err = repo
            .insert_user(NewUser {
                username: "alice".to_string(),
                password_hash: "x".to_string(),
                role: Role::Editor,
                email: "other@example.org".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, JournalError::DuplicateUsername(_)));
    }

    #[test]
    fn test_manuscript_lifecycle() {
        let mut repo = SqliteRepository::in_memory().unwrap();
        let alice = seed_user(&mut repo, "alice", Role::Author);
        let ed = seed_user(&mut repo, "ed1", Role::Editor);
        let rev = seed_user(&mut repo, "rev1", Role::Reviewer);

        let m = seed_manuscript(&mut repo, alice.id, "paper-a");
        assert_eq!(m.status, ManuscriptStatus::Submitted);
        assert_eq!(repo.manuscript(m.id).unwrap().unwrap(), m);

        let assigned = repo.assign(m.id, ed.id, rev.id).unwrap();
        assert_eq!(assigned.status, ManuscriptStatus::Assigned);
        assert_eq!(assigned.editor_id, Some(ed.id));
        assert_eq!(assigned.reviewer_id, Some(rev.id));

        let (review, decided) = repo
            .record_review(NewReview {
                manuscript_id: m.id,
                reviewer_id: rev.id,
                feedback: "Clear and novel".to_string(),
                decision: Decision::Accepted,
                review_date: Utc::now(),
            })
            .unwrap();
        assert_eq!(decided.status, ManuscriptStatus::Accepted);
        assert_eq!(repo.reviews_for(&[m.id]).unwrap(), vec![review]);

        let accepted = repo
            .manuscripts(ManuscriptFilter::ByStatus(ManuscriptStatus::Accepted))
            .unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(
            repo.manuscripts(ManuscriptFilter::ByAuthor(alice.id)).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_review_on_missing_manuscript_rolls_back() {
        let mut repo = SqliteRepository::in_memory().unwrap();
        let rev = seed_user(&mut repo, "rev1", Role::Reviewer);

        let err = repo
            .record_review(NewReview {
                manuscript_id: ManuscriptId(42),
                reviewer_id: rev.id,
                feedback: "n/a".to_string(),
                decision: Decision::Rejected,
                review_date: Utc::now(),
            })
            .unwrap_err();
        assert!(matches!(err, JournalError::NotFound(_)));
        assert!(repo.reviews_for(&[ManuscriptId(42)]).unwrap().is_empty());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");

        {
            let mut repo = SqliteRepository::new(&path).unwrap();
            let alice = seed_user(&mut repo, "alice", Role::Author);
            seed_manuscript(&mut repo, alice.id, "persisted");
        }

        let repo = SqliteRepository::new(&path).unwrap();
        let all = repo.manuscripts(ManuscriptFilter::All).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "persisted");
    }

    #[test]
    fn test_migrates_version_1_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");

        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                r#"
CREATE TABLE schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    role TEXT NOT NULL,
    email TEXT NOT NULL
);
CREATE TABLE manuscripts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    abstract TEXT NOT NULL,
    file_path TEXT NOT NULL,
    author_id INTEGER NOT NULL,
    editor_id INTEGER,
    status TEXT NOT NULL DEFAULT 'submitted',
    submission_date TEXT NOT NULL
);
CREATE TABLE reviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    manuscript_id INTEGER NOT NULL,
    reviewer_id INTEGER NOT NULL,
    feedback TEXT NOT NULL,
    decision TEXT NOT NULL,
    review_date TEXT NOT NULL
);
INSERT INTO schema_version (version) VALUES (1);
INSERT INTO users (username, password, role, email)
    VALUES ('alice', 'x', 'author', 'alice@example.org');
INSERT INTO manuscripts (title, abstract, file_path, author_id, status, submission_date)
    VALUES ('legacy', 'An abstract', 'uploads/legacy.pdf', 1, 'submitted',
            '2024-01-01T00:00:00+00:00');
"#,
            )
            .unwrap();
        }

        let mut repo = SqliteRepository::new(&path).unwrap();
        {
            let conn = repo.conn().unwrap();
            assert_eq!(SqliteRepository::schema_version(&conn), Some(SCHEMA_VERSION));
            let columns = conn
                .prepare("SELECT name FROM pragma_table_info('manuscripts')")
                .unwrap()
                .query_map([], |row| row.get::<_, String>(0))
                .unwrap()
                .collect::<std::result::Result<Vec<_>, _>>()
                .unwrap();
            assert!(columns.iter().any(|c| c == "reviewer_id"));
        }

        let legacy = repo.manuscript(ManuscriptId(1)).unwrap().unwrap();
        assert_eq!(legacy.title, "legacy");
        assert_eq!(legacy.reviewer_id, None);

        let ed = seed_user(&mut repo, "ed1", Role::Editor);
        let rev = seed_user(&mut repo, "rev1", Role::Reviewer);
        let assigned = repo.assign(legacy.id, ed.id, rev.id).unwrap();
        assert_eq!(assigned.reviewer_id, Some(rev.id));
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");
        drop(SqliteRepository::new(&path).unwrap());

        {
            let conn = Connection::open(&path).unwrap();
            SqliteRepository::set_schema_version(&conn, SCHEMA_VERSION + 1).unwrap();
        }

        let err = SqliteRepository::new(&path).err().unwrap();
        assert!(matches!(
            err,
            JournalError::Storage(StorageError::SchemaVersionMismatch { .. })
        ));
    }
}
