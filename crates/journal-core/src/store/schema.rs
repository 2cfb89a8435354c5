//! SQLite schema for journal storage

/// Schema version for migrations
pub const SCHEMA_VERSION: u32 = 2;

/// SQLite schema definition
pub struct Schema;

impl Schema {
    /// Get the complete schema SQL
    pub fn create_tables() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Registered users
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    role TEXT NOT NULL,
    email TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);

-- Manuscripts (current editorial state)
CREATE TABLE IF NOT EXISTS manuscripts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    abstract TEXT NOT NULL,
    file_path TEXT NOT NULL,
    author_id INTEGER NOT NULL,
    editor_id INTEGER,
    reviewer_id INTEGER,
    status TEXT NOT NULL DEFAULT 'submitted',
    submission_date TEXT NOT NULL,
    FOREIGN KEY (author_id) REFERENCES users(id),
    FOREIGN KEY (editor_id) REFERENCES users(id),
    FOREIGN KEY (reviewer_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_manuscripts_author ON manuscripts(author_id);
CREATE INDEX IF NOT EXISTS idx_manuscripts_status ON manuscripts(status);

-- Reviews (append-only)
CREATE TABLE IF NOT EXISTS reviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    manuscript_id INTEGER NOT NULL,
    reviewer_id INTEGER NOT NULL,
    feedback TEXT NOT NULL,
    decision TEXT NOT NULL,
    review_date TEXT NOT NULL,
    FOREIGN KEY (manuscript_id) REFERENCES manuscripts(id),
    FOREIGN KEY (reviewer_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_reviews_manuscript ON reviews(manuscript_id);
"#
    }

    /// Get migration SQL from one version to the next
    pub fn migration(from: u32, to: u32) -> Option<&'static str> {
        match (from, to) {
            // Version 1 did not record which reviewer an editor picked.
            (1, 2) => Some("ALTER TABLE manuscripts ADD COLUMN reviewer_id INTEGER REFERENCES users(id);"),
            _ => None,
        }
    }
}
