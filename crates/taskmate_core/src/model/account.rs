//! Account domain model.
//!
//! # Invariants
//! - `id` is generated once and never reused for another account.
//! - `username` is non-blank and compared case-sensitively.
//! - `credential` is an opaque verifier string, never a plaintext secret.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a registered account.
pub type AccountId = Uuid;

/// Field-level validation failures for account records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValidationError {
    EmptyUsername,
    EmptyCredential,
}

impl Display for AccountValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::EmptyCredential => write!(f, "credential must not be empty"),
        }
    }
}

impl Error for AccountValidationError {}

/// Registered user identity.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    /// Opaque verifier produced by a `CredentialVerifier`.
    #[serde(skip_serializing)]
    pub credential: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("credential", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl Account {
    /// Creates a new account record with a generated id.
    pub fn new(username: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            credential: credential.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), AccountValidationError> {
        if self.username.trim().is_empty() {
            return Err(AccountValidationError::EmptyUsername);
        }
        if self.credential.is_empty() {
            return Err(AccountValidationError::EmptyCredential);
        }
        Ok(())
    }
}
