//! Clock-driven in-memory [`KeyValueStore`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tokio::sync::Mutex;

use crate::domain::ports::{KeyValueStore, KeyValueStoreError};

/// Expiring string map. Entries past their deadline read as absent and are
/// purged on access.
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryKeyValueStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError> {
        let now = self.clock.utc();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > now => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), KeyValueStoreError> {
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|err| KeyValueStoreError::command(format!("invalid ttl: {err}")))?;
        let expires_at = self.clock.utc() + ttl;
        self.entries
            .lock()
            .await
            .insert(key.to_owned(), (value.to_owned(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, KeyValueStoreError> {
        let now = self.clock.utc();
        let removed = self.entries.lock().await.remove(key);
        Ok(removed.is_some_and(|(_, expires_at)| expires_at > now))
    }
}
