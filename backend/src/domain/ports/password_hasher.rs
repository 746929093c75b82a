//! Port for one-way password hashing.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised while hashing or verifying passwords.
    pub enum PasswordHashError {
        /// Hashing failed or the stored hash is malformed.
        Hash { message: String } => "password hashing failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password.
    async fn hash(&self, password: &str) -> Result<String, PasswordHashError>;

    /// Check `password` against a stored `hash`.
    async fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordHashError>;
}
