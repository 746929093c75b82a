//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (repository, key-value store, password hasher, token issuer,
//! marketplace transport, credential refresher) describe what the domain
//! needs from adapters. Driving ports (product catalogue, auth, shop) are
//! what inbound adapters call.

mod macros;
pub(crate) use macros::define_port_error;

mod auth_command;
mod credential_refresher;
mod key_value_store;
mod marketplace_transport;
mod password_hasher;
mod product_catalogue;
mod repository;
mod shop_query;
mod token_issuer;

#[cfg(test)]
pub use auth_command::MockAuthCommand;
pub use auth_command::{AuthCommand, AuthTokens, LoginCredentials, UserProfile};
#[cfg(test)]
pub use credential_refresher::MockCredentialRefresher;
pub use credential_refresher::{CredentialRefresher, RefreshError, RefreshedCredential};
#[cfg(test)]
pub use key_value_store::MockKeyValueStore;
pub use key_value_store::{KeyValueStore, KeyValueStoreError};
#[cfg(test)]
pub use marketplace_transport::MockMarketplaceTransport;
pub use marketplace_transport::{
    HttpMethod, MarketplaceRequest, MarketplaceResponse, MarketplaceTransport, TransportError,
};
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHashError, PasswordHasher};
#[cfg(test)]
pub use product_catalogue::MockProductCatalogue;
pub use product_catalogue::{ProductCatalogue, ProductListQuery};
pub use repository::{Repository, RepositoryError};
#[cfg(test)]
pub use shop_query::MockShopQuery;
pub use shop_query::{FixtureShopQuery, ShopQuery};
#[cfg(test)]
pub use token_issuer::MockTokenIssuer;
pub use token_issuer::{IssuedToken, TokenClaims, TokenError, TokenIssuer, TokenKind};
