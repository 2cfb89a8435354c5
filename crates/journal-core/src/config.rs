//! Configuration for the journal
//!
//! Loaded from a TOML file with the following structure, every key optional:
//!
//! ```toml
//! [server]
//! addr = "127.0.0.1:3000"
//!
//! [storage]
//! database_path = "academic_journal.db"
//! upload_dir = "uploads"
//!
//! [workflow]
//! decision_policy = "permissive"
//!
//! [session]
//! cookie_name = "journal_session"
//! idle_timeout_secs = 3600
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::workflow::DecisionPolicy;

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("TOML parse error: {0}")]
    Parse(String),
}

/// System-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub workflow: WorkflowConfig,
    pub session: SessionConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Where records and uploads live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file. `None` keeps everything in memory.
    pub database_path: Option<PathBuf>,
    /// Directory for uploaded manuscripts
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            upload_dir: PathBuf::from("uploads"),
        }
    }
}

/// Workflow engine settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub decision_policy: DecisionPolicy,
}

/// Session cookie settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Sessions unused for this long are dropped
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "journal_session".to_string(),
            idle_timeout_secs: 3600,
        }
    }
}

impl JournalConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// User config location: `<config dir>/journal/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("journal").join("config.toml"))
    }

    /// Load from `$JOURNAL_CONFIG`, then the user config file, then defaults,
    /// and apply environment overrides on top.
    pub fn load_standard() -> Result<Self, ConfigError> {
        let explicit = std::env::var_os("JOURNAL_CONFIG").map(PathBuf::from);
        let mut config = match explicit {
            Some(path) => Self::load(&path)?,
            None => match Self::user_config_path().filter(|p| p.exists()) {
                Some(path) => Self::load(&path)?,
                None => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `JOURNAL_ADDR`, `JOURNAL_DB` and `JOURNAL_UPLOADS` overrides
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("JOURNAL_ADDR") {
            self.server.addr = addr;
        }
        if let Some(db) = lookup("JOURNAL_DB") {
            self.storage.database_path = Some(PathBuf::from(db));
        }
        if let Some(dir) = lookup("JOURNAL_UPLOADS") {
            self.storage.upload_dir = PathBuf::from(dir);
        }
    }
}
