//! Password hashing and verification.
use argon2::{
    password_hash::{
        self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::error::{Result, TodoError};

/// Argon2id hasher with a tunable work factor.
///
/// Digests are PHC strings that embed the salt and parameters, so a digest
/// produced under one work factor still verifies after the factor changes.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialHasher {
    /// Create a hasher with explicit cost parameters
    ///
    /// # Arguments
    /// * `memory_kib` - Memory cost in KiB (at least 8 × `parallelism`)
    /// * `iterations` - Number of passes
    /// * `parallelism` - Degree of parallelism
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| TodoError::Configuration(format!("Invalid hashing parameters: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, plain: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| TodoError::Hashing(e.to_string()))?
            .to_string();
        Ok(digest)
    }

    /// Verify a password against a stored digest
    ///
    /// # Returns
    /// * `Ok(true)` - The password matches
    /// * `Ok(false)` - The password does not match
    /// * `Err(TodoError::Hashing)` - The digest is malformed
    pub fn verify(&self, plain: &str, digest: &str) -> Result<bool> {
        let parsed = PasswordHash::new(digest)
            .map_err(|e| TodoError::Hashing(format!("Malformed password digest: {e}")))?;

        match self.argon2().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(TodoError::Hashing(e.to_string())),
        }
    }
}
