//! HTTP server configuration object and the startup steps that fill it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use storefront::domain::ports::TokenIssuer;
use storefront::outbound::cache::RedisKeyValueStore;
use storefront::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use storefront::outbound::security::JwtTokenIssuer;
use storefront::settings::{Settings, ShopeeSettings};
use tracing::{info, warn};
use uuid::Uuid;

const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) tokens: Arc<dyn TokenIssuer>,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) key_value: Option<RedisKeyValueStore>,
    pub(crate) shopee: Option<ShopeeSettings>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(bind_addr: SocketAddr, tokens: Arc<dyn TokenIssuer>) -> Self {
        Self {
            bind_addr,
            tokens,
            db_pool: None,
            key_value: None,
            shopee: None,
        }
    }

    /// Attach a database pool; products and users are then stored in
    /// PostgreSQL instead of process memory.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Attach Redis for token revocations and marketplace token caching.
    #[must_use]
    pub fn with_key_value_store(mut self, store: RedisKeyValueStore) -> Self {
        self.key_value = Some(store);
        self
    }

    /// Enable the Shopee shop endpoint. Ignored unless the settings carry a
    /// complete set of partner credentials.
    #[must_use]
    pub fn with_shopee(mut self, settings: ShopeeSettings) -> Self {
        if settings.signer().is_some() {
            self.shopee = Some(settings);
        } else {
            warn!("shopee credentials incomplete; shop endpoint disabled");
        }
        self
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Run migrations and connect every configured backing service.
    ///
    /// # Errors
    ///
    /// Returns an I/O error describing the first step that failed.
    pub async fn from_settings(settings: &Settings) -> std::io::Result<Self> {
        let app = &settings.app;
        let bind_addr = app.bind_addr().map_err(std::io::Error::other)?;
        let tokens = JwtTokenIssuer::new(
            &jwt_secret(settings)?,
            app.access_token_ttl().map_err(std::io::Error::other)?,
            app.refresh_token_ttl().map_err(std::io::Error::other)?,
        )
        .map_err(std::io::Error::other)?;
        let mut config = Self::new(bind_addr, Arc::new(tokens));

        match app.database_url() {
            Some(url) => {
                if app.run_migrations {
                    let applied = run_pending_migrations(url)
                        .await
                        .map_err(std::io::Error::other)?;
                    info!(count = applied.len(), migrations = ?applied, "migrations applied");
                }
                let pool = DbPool::new(PoolConfig::new(url).with_max_size(app.pool_size()))
                    .await
                    .map_err(std::io::Error::other)?;
                info!("using postgres repositories");
                config = config.with_db_pool(pool);
            }
            None => {
                if app.run_migrations {
                    warn!("APP_RUN_MIGRATIONS set without APP_DATABASE_URL; skipping");
                }
                warn!("APP_DATABASE_URL not set; using in-memory repositories");
            }
        }

        match app.redis_url() {
            Some(url) => {
                let store = RedisKeyValueStore::connect(url, app.pool_size(), REDIS_CONNECT_TIMEOUT)
                    .await
                    .map_err(std::io::Error::other)?;
                info!("using redis key-value store");
                config = config.with_key_value_store(store);
            }
            None => warn!("APP_REDIS_URL not set; using in-memory key-value store"),
        }

        if settings.tiktok.signer().is_some() {
            info!(base_url = settings.tiktok.base_url(), "tiktok shop signing configured");
        }
        Ok(config.with_shopee(settings.shopee.clone()))
    }
}

fn jwt_secret(settings: &Settings) -> std::io::Result<String> {
    if let Some(secret) = settings.app.jwt_secret() {
        return Ok(secret.to_owned());
    }
    if cfg!(debug_assertions) {
        warn!("APP_JWT_SECRET not set; using an ephemeral signing secret (dev only)");
        Ok(format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()))
    } else {
        Err(std::io::Error::other("APP_JWT_SECRET must be set"))
    }
}
