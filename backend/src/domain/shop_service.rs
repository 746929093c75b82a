//! Shop profile lookup over the signed Shopee client.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, warn};

use super::Error;
use super::marketplace::{MarketplaceError, SHOP_INFO_PATH, SignedClient};
use super::ports::ShopQuery;

/// [`ShopQuery`] backed by a [`SignedClient`].
#[derive(Clone)]
pub struct ShopService {
    client: Arc<SignedClient>,
}

impl ShopService {
    pub fn new(client: Arc<SignedClient>) -> Self {
        Self { client }
    }
}

fn shop_failure(err: MarketplaceError) -> Error {
    match err {
        MarketplaceError::Unauthenticated => {
            warn!("no marketplace access token cached");
            Error::unauthorized("Marketplace access token is not available")
        }
        MarketplaceError::AuthExhausted { attempts } => {
            warn!(attempts, "marketplace authentication exhausted");
            Error::unauthorized(
                "Failed to authenticate with third-party service after multiple attempts",
            )
        }
        MarketplaceError::Upstream { status, .. } => {
            error!(status, "marketplace returned an error status");
            Error::internal(format!(
                "Failed to fetch shop info. Status code: {status}"
            ))
        }
        MarketplaceError::Cache { message } => {
            error!(%message, "marketplace token cache unavailable");
            Error::service_unavailable("token cache unavailable")
        }
        other => {
            error!(error = %other, "shop information request failed");
            Error::internal(format!("An error occurred: {other}"))
        }
    }
}

#[async_trait]
impl ShopQuery for ShopService {
    async fn shop_info(&self) -> Result<Value, Error> {
        let payload = self
            .client
            .get(SHOP_INFO_PATH)
            .await
            .map_err(shop_failure)?;
        info!("shop information retrieved");
        Ok(payload)
    }
}
