//! Credential verifier collaborator.
//!
//! # Responsibility
//! - Turn a user-supplied secret into an opaque stored verifier.
//! - Check a secret against a stored verifier without ever comparing plaintext.
//!
//! # Invariants
//! - Every `hash` call uses a fresh random salt, so equal secrets produce
//!   different verifiers.
//! - `verify` never errors: malformed stored values simply do not match.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors raised while producing a credential verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Cost parameters rejected by the hashing backend.
    InvalidParams(String),
    /// Hash computation failed.
    Hash(String),
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParams(details) => write!(f, "invalid credential parameters: {details}"),
            Self::Hash(details) => write!(f, "credential hashing failed: {details}"),
        }
    }
}

impl Error for CredentialError {}

/// Port for credential hashing and verification.
pub trait CredentialVerifier: Send + Sync {
    /// Derives an opaque verifier from `secret`.
    fn hash(&self, secret: &str) -> Result<String, CredentialError>;

    /// Returns whether `secret` matches the stored verifier.
    fn verify(&self, secret: &str, stored: &str) -> bool;
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CredentialParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for CredentialParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Argon2id-backed verifier producing PHC strings.
#[derive(Debug, Clone)]
pub struct Argon2CredentialVerifier {
    params: Params,
}

impl Argon2CredentialVerifier {
    /// Creates a verifier with explicit cost parameters.
    pub fn new(params: CredentialParams) -> Result<Self, CredentialError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|err| CredentialError::InvalidParams(err.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialVerifier for Argon2CredentialVerifier {
    fn hash(&self, secret: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|err| CredentialError::Hash(err.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, secret: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        self.argon2()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}
