//! Port for the expiring key-value cache.
//!
//! Holds marketplace access tokens and revoked token identifiers. Adapters
//! must honour the TTL: an expired key reads as absent.

use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by key-value store adapters.
    pub enum KeyValueStoreError {
        /// The store could not be reached.
        Connection { message: String } => "key-value store connection failed: {message}",
        /// A command was rejected or its reply could not be decoded.
        Command { message: String } => "key-value store command failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a live value.
    async fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), KeyValueStoreError>;

    /// Remove `key`. Returns whether a live value was removed.
    async fn delete(&self, key: &str) -> Result<bool, KeyValueStoreError>;
}
