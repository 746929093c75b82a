//! Driving port for marketplace shop information.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Error;

/// Domain use-case port for reading the connected shop's profile.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShopQuery: Send + Sync {
    /// Marketplace payload describing the shop.
    async fn shop_info(&self) -> Result<Value, Error>;
}

/// Stand-in used when no marketplace credentials are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureShopQuery;

#[async_trait]
impl ShopQuery for FixtureShopQuery {
    async fn shop_info(&self) -> Result<Value, Error> {
        Err(Error::service_unavailable(
            "marketplace integration is not configured",
        ))
    }
}
