//! Password hashing.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("stored password hash is unreadable: {0}")]
    CorruptHash(String),
}

/// One-way password hashing.
///
/// Implementations are CPU-heavy; async callers should run them on a blocking thread.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, PasswordError>;

    /// `Ok(false)` means a readable hash that does not match.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError>;
}

/// bcrypt with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub const DEFAULT_COST: u32 = 10;

    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptPasswordHasher {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        bcrypt::hash(password, self.cost).map_err(|e| PasswordError::Hash(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        bcrypt::verify(password, hash).map_err(|e| PasswordError::CorruptHash(e.to_string()))
    }
}
