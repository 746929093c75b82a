//! Marketplace HTTP adapters.
//!
//! [`HttpMarketplaceTransport`] moves signed requests over reqwest;
//! [`ShopeeTokenRefresher`] exchanges the Shopee refresh token for a new
//! access token.

mod http_transport;
mod token_refresher;

pub use http_transport::HttpMarketplaceTransport;
pub use token_refresher::{REFRESH_TOKEN_TTL, ShopeeTokenRefresher};
