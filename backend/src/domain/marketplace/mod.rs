//! Marketplace integrations: request signing and the signed Shopee client.

mod client;
mod signing;

pub use client::{
    ACCESS_TOKEN_KEY, DEFAULT_RETRY_LIMIT, DEFAULT_TOKEN_TTL, MarketplaceError, SignedClient,
};
pub use signing::{ShopeeSigner, SigningError, TikTokSigner};

/// Shopee endpoint returning the connected shop's profile.
pub const SHOP_INFO_PATH: &str = "/shop/get";
/// Shopee endpoint exchanging a refresh token for an access token.
pub const REFRESH_TOKEN_PATH: &str = "/auth/access_token/get";
/// Cache key holding the rotating Shopee refresh token.
pub const REFRESH_TOKEN_KEY: &str = "SHOPEE_REFRESH_TOKEN_KEY";
