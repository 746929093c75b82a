//! Signed Shopee client with bounded token-refresh retry.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    CredentialRefresher, KeyValueStore, MarketplaceRequest, MarketplaceTransport,
};

use super::signing::ShopeeSigner;

/// Cache key holding the current Shopee access token.
pub const ACCESS_TOKEN_KEY: &str = "SHOPEE_ACCESS_TOKEN_KEY";
/// TTL applied when a refresh does not report one.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Failures surfaced by [`SignedClient`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketplaceError {
    #[error("no marketplace access token is cached")]
    Unauthenticated,
    #[error("marketplace rejected credentials after {attempts} attempts")]
    AuthExhausted { attempts: u32 },
    #[error("marketplace responded with status {status}")]
    Upstream { status: u16, body: String },
    #[error("marketplace request failed: {message}")]
    Transport { message: String },
    #[error("access token refresh failed: {message}")]
    RefreshFailed { message: String },
    #[error("marketplace payload could not be decoded: {message}")]
    Decode { message: String },
    #[error("token cache failed: {message}")]
    Cache { message: String },
    #[error("request signing failed: {message}")]
    Signing { message: String },
}

/// Issues signed shop-level calls.
///
/// On HTTP 401 the cached token is refreshed through the injected
/// [`CredentialRefresher`] and the call is retried, up to `retry_limit`
/// attempts in total. Refreshes are single-flight: concurrent callers that
/// observe a 401 queue on one lock, and a caller that finds the cached
/// token already replaced retries with it instead of refreshing again.
pub struct SignedClient {
    signer: ShopeeSigner,
    transport: Arc<dyn MarketplaceTransport>,
    cache: Arc<dyn KeyValueStore>,
    refresher: Arc<dyn CredentialRefresher>,
    clock: Arc<dyn Clock>,
    retry_limit: u32,
    refresh_lock: Mutex<()>,
}

impl SignedClient {
    pub fn new(
        signer: ShopeeSigner,
        transport: Arc<dyn MarketplaceTransport>,
        cache: Arc<dyn KeyValueStore>,
        refresher: Arc<dyn CredentialRefresher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            signer,
            transport,
            cache,
            refresher,
            clock,
            retry_limit: DEFAULT_RETRY_LIMIT,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Cap the number of attempts per call. Values below one are raised to
    /// one.
    #[must_use]
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit.max(1);
        self
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Signed GET against `path`, returning the decoded JSON payload.
    pub async fn get(&self, path: &str) -> Result<Value, MarketplaceError> {
        let mut attempts = 0_u32;
        loop {
            attempts += 1;
            let timestamp = self.clock.utc().timestamp();
            let token = self.cached_token().await?;
            let request = self.signed_request(path, timestamp, &token)?;

            let response = self.transport.send(request).await.map_err(|err| {
                warn!(error = %err, path, "marketplace transport failed");
                MarketplaceError::Transport {
                    message: err.to_string(),
                }
            })?;

            match response.status {
                200 => {
                    debug!(path, attempts, "marketplace call succeeded");
                    return serde_json::from_str(&response.body).map_err(|err| {
                        MarketplaceError::Decode {
                            message: err.to_string(),
                        }
                    });
                }
                401 if attempts >= self.retry_limit => {
                    warn!(path, attempts, "marketplace authentication exhausted");
                    return Err(MarketplaceError::AuthExhausted { attempts });
                }
                401 => {
                    info!(path, attempts, "marketplace rejected token; refreshing");
                    self.refresh_token(&token).await?;
                }
                status => {
                    warn!(path, status, "marketplace returned an error status");
                    return Err(MarketplaceError::Upstream {
                        status,
                        body: response.body,
                    });
                }
            }
        }
    }

    fn signed_request(
        &self,
        path: &str,
        timestamp: i64,
        token: &str,
    ) -> Result<MarketplaceRequest, MarketplaceError> {
        let sign = self
            .signer
            .sign(path, timestamp, token)
            .map_err(|err| MarketplaceError::Signing {
                message: err.to_string(),
            })?;
        Ok(MarketplaceRequest::get(path)
            .with_query("partner_id", self.signer.partner_id())
            .with_query("timestamp", timestamp.to_string())
            .with_query("access_token", token)
            .with_query("shop_id", self.signer.shop_id())
            .with_query("sign", sign))
    }

    async fn cached_token(&self) -> Result<String, MarketplaceError> {
        self.cache
            .get(ACCESS_TOKEN_KEY)
            .await
            .map_err(|err| MarketplaceError::Cache {
                message: err.to_string(),
            })?
            .ok_or(MarketplaceError::Unauthenticated)
    }

    async fn refresh_token(&self, rejected: &str) -> Result<(), MarketplaceError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self
            .cache
            .get(ACCESS_TOKEN_KEY)
            .await
            .map_err(|err| MarketplaceError::Cache {
                message: err.to_string(),
            })?;
        if current.as_deref().is_some_and(|token| token != rejected) {
            debug!("access token already refreshed by another caller");
            return Ok(());
        }

        let refreshed = self.refresher.refresh().await.map_err(|err| {
            warn!(error = %err, "marketplace token refresh failed");
            MarketplaceError::RefreshFailed {
                message: err.to_string(),
            }
        })?;
        let ttl = if refreshed.expires_in.is_zero() {
            DEFAULT_TOKEN_TTL
        } else {
            refreshed.expires_in
        };
        self.cache
            .set_with_ttl(ACCESS_TOKEN_KEY, &refreshed.access_token, ttl)
            .await
            .map_err(|err| MarketplaceError::Cache {
                message: err.to_string(),
            })
    }
}
