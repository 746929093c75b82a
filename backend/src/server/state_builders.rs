//! Builders for the HTTP state ports.
//!
//! Each port gets its production adapter when the matching backing service
//! is configured and an in-process stand-in otherwise.

use std::sync::Arc;

use mockable::Clock;
use storefront::domain::marketplace::SignedClient;
use storefront::domain::ports::{
    AuthCommand, FixtureShopQuery, KeyValueStore, ProductCatalogue, ShopQuery,
};
use storefront::domain::{AuthService, Product, ProductService, ShopService, User};
use storefront::inbound::http::state::HttpState;
use storefront::outbound::marketplace::{HttpMarketplaceTransport, ShopeeTokenRefresher};
use storefront::outbound::memory::{InMemoryKeyValueStore, InMemoryRepository};
use storefront::outbound::persistence::DieselRepository;
use storefront::outbound::security::BcryptPasswordHasher;
use storefront::settings::ShopeeSettings;

use super::ServerConfig;

fn build_key_value_store(config: &ServerConfig, clock: &Arc<dyn Clock>) -> Arc<dyn KeyValueStore> {
    match &config.key_value {
        Some(redis) => Arc::new(redis.clone()),
        None => Arc::new(InMemoryKeyValueStore::new(Arc::clone(clock))),
    }
}

fn build_auth<R>(
    users: Arc<R>,
    config: &ServerConfig,
    revocations: Arc<dyn KeyValueStore>,
    clock: &Arc<dyn Clock>,
) -> Arc<dyn AuthCommand>
where
    R: storefront::domain::ports::Repository<User> + 'static,
{
    Arc::new(AuthService::new(
        users,
        Arc::new(BcryptPasswordHasher::default()),
        Arc::clone(&config.tokens),
        revocations,
        Arc::clone(clock),
    ))
}

fn build_shop_query(
    settings: Option<&ShopeeSettings>,
    cache: Arc<dyn KeyValueStore>,
    clock: &Arc<dyn Clock>,
) -> std::io::Result<Arc<dyn ShopQuery>> {
    let Some((settings, signer)) = settings.and_then(|s| s.signer().map(|signer| (s, signer)))
    else {
        return Ok(Arc::new(FixtureShopQuery));
    };
    let transport = Arc::new(
        HttpMarketplaceTransport::new(settings.base_url(), settings.timeout())
            .map_err(std::io::Error::other)?,
    );
    let refresher = Arc::new(ShopeeTokenRefresher::new(
        signer.clone(),
        transport.clone(),
        Arc::clone(&cache),
        settings.refresh_token().map(str::to_owned),
        Arc::clone(clock),
    ));
    let client = SignedClient::new(signer, transport, cache, refresher, Arc::clone(clock))
        .with_retry_limit(settings.retry_limit());
    Ok(Arc::new(ShopService::new(Arc::new(client))))
}

/// Assemble the driving ports for the configured adapters.
///
/// # Errors
///
/// Returns an error when the marketplace transport cannot be built.
pub(crate) fn build_http_state(
    config: &ServerConfig,
    clock: Arc<dyn Clock>,
) -> std::io::Result<HttpState> {
    let key_value = build_key_value_store(config, &clock);
    let (products, auth): (Arc<dyn ProductCatalogue>, Arc<dyn AuthCommand>) =
        match &config.db_pool {
            Some(pool) => {
                let products = Arc::new(DieselRepository::<Product>::new(
                    pool.clone(),
                    Arc::clone(&clock),
                ));
                let users = Arc::new(DieselRepository::<User>::new(pool.clone(), Arc::clone(&clock)));
                (
                    Arc::new(ProductService::new(products, Arc::clone(&clock))),
                    build_auth(users, config, Arc::clone(&key_value), &clock),
                )
            }
            None => {
                let products = Arc::new(InMemoryRepository::<Product>::new(Arc::clone(&clock)));
                let users = Arc::new(InMemoryRepository::<User>::new(Arc::clone(&clock)));
                (
                    Arc::new(ProductService::new(products, Arc::clone(&clock))),
                    build_auth(users, config, Arc::clone(&key_value), &clock),
                )
            }
        };
    let shop = build_shop_query(config.shopee.as_ref(), key_value, &clock)?;
    Ok(HttpState::new(products, auth, shop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use mockable::DefaultClock;
    use rstest::rstest;
    use storefront::domain::ErrorCode;
    use storefront::outbound::security::JwtTokenIssuer;

    fn config() -> ServerConfig {
        let tokens = JwtTokenIssuer::new("test-secret", TimeDelta::minutes(15), TimeDelta::days(1))
            .expect("issuer builds");
        ServerConfig::new(([127, 0, 0, 1], 0).into(), Arc::new(tokens))
    }

    #[rstest]
    #[tokio::test]
    async fn unconfigured_shop_reports_unavailable() {
        let state = build_http_state(&config(), Arc::new(DefaultClock)).expect("state builds");
        let err = state.shop.shop_info().await.expect_err("no marketplace");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }

    #[rstest]
    #[tokio::test]
    async fn in_memory_catalogue_starts_empty() {
        let state = build_http_state(&config(), Arc::new(DefaultClock)).expect("state builds");
        let page = state
            .products
            .list(Default::default())
            .await
            .expect("listing works");
        assert!(page.items.is_empty());
        assert_eq!(page.info.total, 0);
    }

    #[rstest]
    #[tokio::test]
    async fn shopee_settings_enable_the_signed_client() {
        let settings = ShopeeSettings {
            base_url: None,
            partner_id: Some("1001".into()),
            partner_key: Some("key".into()),
            shop_id: Some("2002".into()),
            refresh_token: None,
            retry_limit: None,
            timeout_seconds: None,
        };
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let cache: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new(Arc::clone(&clock)));
        let shop = build_shop_query(Some(&settings), cache, &clock).expect("shop builds");

        // No access token is cached yet, so the client never calls out.
        let err = shop.shop_info().await.expect_err("no access token");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }
}
