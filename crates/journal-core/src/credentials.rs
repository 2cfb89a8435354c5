//! Credential hashing and registration input
//!
//! Stored hashes are bcrypt strings (`$2b$10$...`), salt included.

use std::sync::OnceLock;

use serde::Deserialize;

use crate::access::Role;
use crate::error::{JournalError, Result};

/// bcrypt work factor for new hashes
pub const HASH_COST: u32 = 10;

/// Verified against when the username is unknown, so both failure paths do
/// the same work.
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, HASH_COST)
        .map_err(|e| JournalError::Validation(format!("cannot hash password: {}", e)))
}

/// Check a password against a stored hash in constant time
///
/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}

/// Burn the same work as a real verification for an unknown user
pub(crate) fn verify_dummy(password: &str) {
    if let Some(hash) = DUMMY_HASH.get_or_init(|| bcrypt::hash("unknown-user", HASH_COST).ok()) {
        let _ = verify_password(password, hash);
    }
}

/// Registration form as submitted by a prospective user
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub email: String,
}

/// A registration that passed validation
#[derive(Debug, Clone)]
pub(crate) struct ValidRegistration {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub email: String,
}

impl Registration {
    pub(crate) fn validate(self) -> Result<ValidRegistration> {
        let username = self.username.trim().to_string();
        let email = self.email.trim().to_string();

        for (field, value) in [
            ("username", username.as_str()),
            ("password", self.password.as_str()),
            ("role", self.role.as_str()),
            ("email", email.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(JournalError::missing_field(field));
            }
        }

        let role = Role::parse(&self.role)
            .filter(Role::is_registrable)
            .ok_or_else(|| {
                JournalError::Validation(format!(
                    "role must be one of author, reviewer, editor (got {})",
                    self.role
                ))
            })?;

        if !email.contains('@') {
            return Err(JournalError::Validation(format!(
                "email is malformed: {}",
                email
            )));
        }

        Ok(ValidRegistration {
            username,
            password: self.password,
            role,
            email,
        })
    }
}
