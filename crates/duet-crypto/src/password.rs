use argon2::password_hash::{self, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand_core::OsRng;
use thiserror::Error;

/// Argon2id memory cost in KiB.
pub const MEMORY_COST_KIB: u32 = 19_456;
/// Argon2id passes.
pub const TIME_COST: u32 = 2;
pub const PARALLELISM: u32 = 1;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("malformed password digest: {0}")]
    MalformedDigest(String),
}

/// Hashes and verifies passwords. The cost is fixed so every stored digest
/// carries the same parameters.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new() -> Result<Self, HashError> {
        let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
            .map_err(|e| HashError::Hashing(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash with a fresh random salt. The PHC string embeds salt and parameters.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| HashError::Hashing(e.to_string()))?;
        Ok(digest.to_string())
    }

    /// `Ok(false)` on mismatch. Errors only when `digest` cannot be parsed.
    pub fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, HashError> {
        let parsed =
            PasswordHash::new(digest).map_err(|e| HashError::MalformedDigest(e.to_string()))?;

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashError::MalformedDigest(e.to_string())),
        }
    }
}
