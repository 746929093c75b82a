//! Shopee access-token refresh over the public auth endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::domain::marketplace::{REFRESH_TOKEN_KEY, REFRESH_TOKEN_PATH, ShopeeSigner};
use crate::domain::ports::{
    CredentialRefresher, KeyValueStore, MarketplaceRequest, MarketplaceTransport, RefreshError,
    RefreshedCredential,
};

/// Lifetime of a rotated Shopee refresh token.
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Deserialize)]
struct RefreshReply {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expire_in: u64,
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

/// Exchanges the current refresh token for a new access token.
///
/// The refresh token is read from the key-value store first and falls back
/// to the configured value; a rotated refresh token is written back.
pub struct ShopeeTokenRefresher {
    signer: ShopeeSigner,
    transport: Arc<dyn MarketplaceTransport>,
    cache: Arc<dyn KeyValueStore>,
    configured_token: Option<Zeroizing<String>>,
    clock: Arc<dyn Clock>,
}

impl ShopeeTokenRefresher {
    pub fn new(
        signer: ShopeeSigner,
        transport: Arc<dyn MarketplaceTransport>,
        cache: Arc<dyn KeyValueStore>,
        configured_token: Option<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            signer,
            transport,
            cache,
            configured_token: configured_token
                .filter(|token| !token.is_empty())
                .map(Zeroizing::new),
            clock,
        }
    }

    async fn current_refresh_token(&self) -> Result<Zeroizing<String>, RefreshError> {
        let cached = self.cache.get(REFRESH_TOKEN_KEY).await.map_err(|err| {
            RefreshError::unavailable(format!("refresh token cache: {err}"))
        })?;
        cached
            .map(Zeroizing::new)
            .or_else(|| self.configured_token.clone())
            .ok_or(RefreshError::MissingCredential)
    }

    fn request_body(&self, refresh_token: &str) -> Value {
        json!({
            "refresh_token": refresh_token,
            "partner_id": numeric_or_text(self.signer.partner_id()),
            "shop_id": numeric_or_text(self.signer.shop_id()),
        })
    }
}

/// Shopee expects numeric identifiers; keep non-numeric ones as text.
fn numeric_or_text(raw: &str) -> Value {
    raw.parse::<u64>().map_or_else(|_| json!(raw), |id| json!(id))
}

#[async_trait]
impl CredentialRefresher for ShopeeTokenRefresher {
    async fn refresh(&self) -> Result<RefreshedCredential, RefreshError> {
        let refresh_token = self.current_refresh_token().await?;
        let timestamp = self.clock.utc().timestamp();
        let sign = self
            .signer
            .sign_public(REFRESH_TOKEN_PATH, timestamp)
            .map_err(|err| RefreshError::rejected(err.to_string()))?;

        let request = MarketplaceRequest::post(REFRESH_TOKEN_PATH, self.request_body(&refresh_token))
            .with_query("partner_id", self.signer.partner_id())
            .with_query("timestamp", timestamp.to_string())
            .with_query("sign", sign);
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|err| RefreshError::unavailable(err.to_string()))?;

        if response.status != 200 {
            warn!(status = response.status, "shopee token refresh rejected");
            return Err(RefreshError::rejected(format!("status {}", response.status)));
        }
        let reply: RefreshReply = serde_json::from_str(&response.body)
            .map_err(|err| RefreshError::rejected(format!("undecodable reply: {err}")))?;
        if !reply.error.is_empty() || reply.access_token.is_empty() {
            warn!(error = %reply.error, "shopee token refresh returned an error");
            return Err(RefreshError::rejected(if reply.message.is_empty() {
                reply.error
            } else {
                reply.message
            }));
        }

        if let Some(rotated) = reply.refresh_token.as_deref().filter(|token| !token.is_empty()) {
            if let Err(err) = self
                .cache
                .set_with_ttl(REFRESH_TOKEN_KEY, rotated, REFRESH_TOKEN_TTL)
                .await
            {
                warn!(error = %err, "failed to cache rotated refresh token");
            }
        }
        info!(expires_in = reply.expire_in, "shopee access token refreshed");
        Ok(RefreshedCredential {
            access_token: reply.access_token,
            refresh_token: reply.refresh_token,
            expires_in: Duration::from_secs(reply.expire_in),
        })
    }
}
