//! Bcrypt [`PasswordHasher`] running on the blocking thread pool.

use async_trait::async_trait;
use bcrypt::{DEFAULT_COST, hash, verify};

use crate::domain::ports::{PasswordHashError, PasswordHasher};

/// Bcrypt hasher with a fixed cost factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl BcryptPasswordHasher {
    /// Hasher with an explicit cost; bcrypt accepts 4 to 31.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, password: &str) -> Result<String, PasswordHashError> {
        let password = zeroize::Zeroizing::new(password.to_owned());
        let cost = self.cost;
        tokio::task::spawn_blocking(move || {
            hash(password.as_bytes(), cost).map_err(|err| PasswordHashError::hash(err.to_string()))
        })
        .await
        .map_err(|err| PasswordHashError::hash(format!("task join error: {err}")))?
    }

    async fn verify(&self, password: &str, stored: &str) -> Result<bool, PasswordHashError> {
        let password = zeroize::Zeroizing::new(password.to_owned());
        let stored = stored.to_owned();
        tokio::task::spawn_blocking(move || {
            verify(password.as_bytes(), &stored)
                .map_err(|err| PasswordHashError::hash(err.to_string()))
        })
        .await
        .map_err(|err| PasswordHashError::hash(format!("task join error: {err}")))?
    }
}
