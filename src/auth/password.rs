use std::fmt;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashingError(String);

/// Salted Argon2id hash of a user's password. The plaintext is never kept.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Password {
    hash: String,
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

impl Password {
    /// Wraps a hash loaded from storage.
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Hashes `plain` with a fresh salt and replaces the stored hash.
    pub fn set(&mut self, plain: &str) -> Result<(), HashingError> {
        self.hash = hash_password(plain)?;
        Ok(())
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// A malformed or missing stored hash verifies as `false`.
    pub fn verify(&self, candidate: &str) -> bool {
        if self.hash.is_empty() {
            return false;
        }
        match verify_password(candidate, &self.hash) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "stored password hash is malformed");
                false
            }
        }
    }
}

pub fn hash_password(plain: &str) -> Result<String, HashingError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            HashingError(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
