//! Error types for journal-core

use thiserror::Error;

/// Result type alias for journal operations
pub type Result<T> = std::result::Result<T, JournalError>;

/// Main error type for journal operations
#[derive(Error, Debug)]
pub enum JournalError {
    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication failed. Unknown user and wrong password look the same.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The actor's role may not perform the operation
    #[error("Forbidden: {role} may not {operation}")]
    Forbidden { role: String, operation: String },

    /// Missing manuscript, review or file
    #[error("Not found: {0}")]
    NotFound(String),

    /// Username already registered
    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    /// Refused by the configured decision policy
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Persistence-related errors
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    /// The uploaded file was stored but its record was not, and cleanup failed
    #[error("Uploaded file {locator} is orphaned: {reason}")]
    UploadOrphan { locator: String, reason: String },
}

impl JournalError {
    /// Short machine-readable name for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            JournalError::Validation(_) => "validation_error",
            JournalError::InvalidCredentials => "invalid_credentials",
            JournalError::Forbidden { .. } => "forbidden",
            JournalError::NotFound(_) => "not_found",
            JournalError::DuplicateUsername(_) => "duplicate_username",
            JournalError::InvalidTransition { .. } => "invalid_transition",
            JournalError::Storage(_) => "storage_failure",
            JournalError::UploadOrphan { .. } => "upload_orphan",
        }
    }

    pub(crate) fn missing_field(field: &str) -> Self {
        JournalError::Validation(format!("{} is required", field))
    }
}

/// Persistence-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A lock guarding the store was poisoned by a panicking writer
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    SchemaVersionMismatch { expected: u32, actual: u32 },
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for StorageError {
    fn from(err: csv::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for JournalError {
    fn from(err: rusqlite::Error) -> Self {
        JournalError::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<std::io::Error> for JournalError {
    fn from(err: std::io::Error) -> Self {
        JournalError::Storage(StorageError::Io(err.to_string()))
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::Storage(StorageError::Serialization(err.to_string()))
    }
}
