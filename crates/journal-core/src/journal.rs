//! The journal: repositories, blob storage and workflow policy in one place
//!
//! A [`Journal`] owns everything a request needs. Commands take it by `&mut`,
//! projections by `&`, so whoever shares it decides the locking.

use tracing::{info, warn};

use crate::access::{authorize, Actor, Operation, Role};
use crate::blob::{BlobStore, FsBlobStore};
use crate::config::JournalConfig;
use crate::credentials::{hash_password, verify_dummy, verify_password, Registration};
use crate::error::{JournalError, Result};
use crate::manuscript::ManuscriptId;
use crate::store::{InMemoryRepository, Repository};
use crate::user::{NewUser, User, UserId};
use crate::workflow::{Command, DecisionPolicy, Outcome};

/// A stored manuscript file ready to hand to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Editorial state plus the collaborators that persist it
pub struct Journal {
    pub(crate) repository: Box<dyn Repository>,
    pub(crate) blobs: Box<dyn BlobStore>,
    pub(crate) policy: DecisionPolicy,
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Journal {
    /// Create a journal over the given stores with the permissive policy
    pub fn new(
        repository: impl Repository + 'static,
        blobs: impl BlobStore + 'static,
    ) -> Self {
        Self {
            repository: Box::new(repository),
            blobs: Box::new(blobs),
            policy: DecisionPolicy::default(),
        }
    }

    /// Build the stores named by a configuration
    ///
    /// Without a database path everything stays in memory.
    pub fn from_config(config: &JournalConfig) -> Result<Self> {
        let blobs = FsBlobStore::new(&config.storage.upload_dir)?;

        let repository: Box<dyn Repository> = match &config.storage.database_path {
            #[cfg(feature = "sqlite")]
            Some(path) => {
                info!(path = %path.display(), "Opening SQLite store");
                Box::new(crate::store::SqliteRepository::new(path)?)
            }
            #[cfg(not(feature = "sqlite"))]
            Some(path) => {
                return Err(JournalError::Validation(format!(
                    "database_path {} needs the sqlite feature",
                    path.display()
                )))
            }
            None => {
                info!("Using in-memory store");
                Box::new(InMemoryRepository::new())
            }
        };

        Ok(Self {
            repository,
            blobs: Box::new(blobs),
            policy: config.workflow.decision_policy,
        })
    }

    pub fn with_policy(mut self, policy: DecisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DecisionPolicy {
        self.policy
    }

    /// Read access to the underlying repository
    pub fn repository(&self) -> &dyn Repository {
        self.repository.as_ref()
    }

    // ==================== Credentials ====================

    /// Persist a user whose password is already hashed
    pub fn register(&mut self, user: NewUser) -> Result<UserId> {
        self.insert_user(user).map(|u| u.id)
    }

    /// Validate a registration form, hash its password and persist the user
    pub fn register_user(&mut self, registration: Registration) -> Result<User> {
        let valid = registration.validate()?;
        let password_hash = hash_password(&valid.password)?;
        self.insert_user(NewUser {
            username: valid.username,
            password_hash,
            role: valid.role,
            email: valid.email,
        })
    }

    fn insert_user(&mut self, user: NewUser) -> Result<User> {
        for (field, value) in [
            ("username", user.username.as_str()),
            ("password", user.password_hash.as_str()),
            ("email", user.email.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(JournalError::missing_field(field));
            }
        }
        if !user.role.is_registrable() {
            return Err(JournalError::Validation(format!(
                "role {} cannot be registered",
                user.role
            )));
        }

        let user = self.repository.insert_user(user)?;
        info!(user_id = %user.id, username = %user.username, role = %user.role, "User registered");
        Ok(user)
    }

    /// Check a username and password
    ///
    /// Unknown users, wrong passwords and lookup failures all come back as
    /// `InvalidCredentials`.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let found = match self.repository.user_by_username(username.trim()) {
            Ok(found) => found,
            Err(err) => {
                warn!(error = %err, "User lookup failed during login");
                None
            }
        };

        match found {
            Some(user) if verify_password(password, &user.password_hash) => {
                info!(user_id = %user.id, role = %user.role, "Login succeeded");
                Ok(user)
            }
            Some(_) => {
                warn!(username = %username.trim(), "Login rejected");
                Err(JournalError::InvalidCredentials)
            }
            None => {
                verify_dummy(password);
                warn!(username = %username.trim(), "Login rejected");
                Err(JournalError::InvalidCredentials)
            }
        }
    }

    /// Look up a user by id
    pub fn user(&self, id: UserId) -> Result<Option<User>> {
        self.repository.user(id)
    }

    /// The actor a logged-in user acts as
    pub fn actor_for(user: &User) -> Actor {
        Actor::user(user.id, user.role)
    }

    // ==================== Workflow ====================

    /// Run a workflow command as `actor`
    pub fn execute(&mut self, actor: &Actor, command: Command) -> Result<Outcome> {
        command.execute(actor, self)
    }

    /// Fetch the stored file for a manuscript
    pub fn download(&self, actor: &Actor, id: ManuscriptId) -> Result<Download> {
        authorize(actor, Operation::DownloadManuscript)?;

        let manuscript = self
            .repository
            .manuscript(id)?
            .ok_or_else(|| JournalError::NotFound(format!("Manuscript {}", id)))?;
        let bytes = self.blobs.get(&manuscript.file_path)?;

        let file_name = std::path::Path::new(&manuscript.file_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("manuscript-{}", id));

        Ok(Download { file_name, bytes })
    }

    /// Users holding a role, ordered by id
    pub fn users_by_role(&self, role: Role) -> Result<Vec<User>> {
        self.repository.users_by_role(role)
    }
}
