//! Redis-backed [`KeyValueStore`] using a `bb8-redis` connection pool.
//!
//! Values are plain strings stored with a millisecond expiry (`SET .. PX`),
//! so Redis itself enforces the TTL and expired keys read as absent.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{self, Pool};
use bb8_redis::redis::{self, RedisError};
use tracing::debug;

use crate::domain::ports::{KeyValueStore, KeyValueStoreError};

/// Pooled Redis client.
#[derive(Clone)]
pub struct RedisKeyValueStore {
    pool: Pool<RedisConnectionManager>,
}

impl RedisKeyValueStore {
    /// Connect a pool of at most `max_size` connections to `url`.
    ///
    /// # Errors
    ///
    /// Returns `KeyValueStoreError::Connection` when the URL is invalid or
    /// the initial connections cannot be opened.
    pub async fn connect(
        url: &str,
        max_size: u32,
        connection_timeout: Duration,
    ) -> Result<Self, KeyValueStoreError> {
        let manager = RedisConnectionManager::new(url).map_err(connection_error)?;
        let pool = Pool::builder()
            .max_size(max_size)
            .connection_timeout(connection_timeout)
            .build(manager)
            .await
            .map_err(connection_error)?;
        Ok(Self { pool })
    }

    async fn connection(
        &self,
    ) -> Result<bb8::PooledConnection<'_, RedisConnectionManager>, KeyValueStoreError> {
        self.pool
            .get()
            .await
            .map_err(|err| KeyValueStoreError::connection(err.to_string()))
    }
}

fn connection_error(error: RedisError) -> KeyValueStoreError {
    KeyValueStoreError::connection(error.to_string())
}

fn command_error(error: RedisError) -> KeyValueStoreError {
    if error.is_connection_dropped() || error.is_io_error() || error.is_timeout() {
        KeyValueStoreError::connection(error.to_string())
    } else {
        KeyValueStoreError::command(error.to_string())
    }
}

/// Expiry in whole milliseconds, never less than one.
fn expiry_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError> {
        let mut conn = self.connection().await?;
        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut *conn)
            .await
            .map_err(command_error)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), KeyValueStoreError> {
        let millis = expiry_millis(ttl);
        let mut conn = self.connection().await?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async::<()>(&mut *conn)
            .await
            .map_err(command_error)?;
        debug!(key, ttl_ms = millis, "stored expiring key");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, KeyValueStoreError> {
        let mut conn = self.connection().await?;
        let removed = redis::cmd("DEL")
            .arg(key)
            .query_async::<i64>(&mut *conn)
            .await
            .map_err(command_error)?;
        Ok(removed > 0)
    }
}
