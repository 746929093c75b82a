//! Runtime configuration loaded via OrthoConfig.
//!
//! Three groups are read independently: `APP_*` for the server itself,
//! `SHOPEE_*` for the Shopee partner API and `TIKTOK_*` for TikTok Shop.
//! Every optional value has an accessor that supplies the default.

use std::ffi::OsString;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use chrono::TimeDelta;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::marketplace::{DEFAULT_RETRY_LIMIT, ShopeeSigner, TikTokSigner};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 15;
pub const DEFAULT_REFRESH_TOKEN_MINUTES: i64 = 7 * 24 * 60;
pub const DEFAULT_SHOPEE_BASE_URL: &str = "https://partner.shopeemobile.com/api/v2";
pub const DEFAULT_TIKTOK_BASE_URL: &str = "https://open-api.tiktokglobalshop.com";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Raised when a settings group cannot be loaded or is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("failed to load {group} settings: {message}")]
    Load { group: &'static str, message: String },
    #[error("invalid setting {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Server, storage and token settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "APP")]
pub struct AppSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// PostgreSQL URL; the in-memory repository is used when unset.
    pub database_url: Option<String>,
    /// Redis URL; the in-memory key-value store is used when unset.
    pub redis_url: Option<String>,
    pub pool_size: Option<u32>,
    pub jwt_secret: Option<String>,
    pub access_token_minutes: Option<i64>,
    pub refresh_token_minutes: Option<i64>,
    /// Apply embedded migrations before serving.
    #[ortho_config(default = false)]
    pub run_migrations: bool,
}

impl AppSettings {
    /// Socket address to bind, `0.0.0.0:8080` by default.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when `host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let ip = match self.host.as_deref() {
            Some(host) => host.parse::<IpAddr>().map_err(|err| SettingsError::Invalid {
                key: "APP_HOST",
                message: err.to_string(),
            })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        Ok(SocketAddr::new(ip, self.port.unwrap_or(DEFAULT_PORT)))
    }

    pub fn database_url(&self) -> Option<&str> {
        non_empty(self.database_url.as_deref())
    }

    pub fn redis_url(&self) -> Option<&str> {
        non_empty(self.redis_url.as_deref())
    }

    pub fn jwt_secret(&self) -> Option<&str> {
        non_empty(self.jwt_secret.as_deref())
    }

    pub fn pool_size(&self) -> u32 {
        self.pool_size.filter(|size| *size > 0).unwrap_or(DEFAULT_POOL_SIZE)
    }

    /// Access token lifetime, 15 minutes by default.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] for non-positive values.
    pub fn access_token_ttl(&self) -> Result<TimeDelta, SettingsError> {
        minutes(
            "APP_ACCESS_TOKEN_MINUTES",
            self.access_token_minutes.unwrap_or(DEFAULT_ACCESS_TOKEN_MINUTES),
        )
    }

    /// Refresh token lifetime, seven days by default.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] for non-positive values.
    pub fn refresh_token_ttl(&self) -> Result<TimeDelta, SettingsError> {
        minutes(
            "APP_REFRESH_TOKEN_MINUTES",
            self.refresh_token_minutes.unwrap_or(DEFAULT_REFRESH_TOKEN_MINUTES),
        )
    }
}

fn minutes(key: &'static str, value: i64) -> Result<TimeDelta, SettingsError> {
    if value <= 0 {
        return Err(SettingsError::Invalid {
            key,
            message: format!("expected a positive number of minutes, got {value}"),
        });
    }
    TimeDelta::try_minutes(value).ok_or_else(|| SettingsError::Invalid {
        key,
        message: format!("{value} minutes is out of range"),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Shopee partner API settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SHOPEE")]
pub struct ShopeeSettings {
    pub base_url: Option<String>,
    pub partner_id: Option<String>,
    pub partner_key: Option<String>,
    pub shop_id: Option<String>,
    /// Initial refresh token, used until a rotated one is cached.
    pub refresh_token: Option<String>,
    pub retry_limit: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

impl ShopeeSettings {
    pub fn base_url(&self) -> &str {
        non_empty(self.base_url.as_deref()).unwrap_or(DEFAULT_SHOPEE_BASE_URL)
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit.unwrap_or(DEFAULT_RETRY_LIMIT)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn refresh_token(&self) -> Option<&str> {
        non_empty(self.refresh_token.as_deref())
    }

    /// Request signer, present only when partner id, key and shop id are
    /// all configured.
    pub fn signer(&self) -> Option<ShopeeSigner> {
        let partner_id = non_empty(self.partner_id.as_deref())?;
        let partner_key = non_empty(self.partner_key.as_deref())?;
        let shop_id = non_empty(self.shop_id.as_deref())?;
        Some(ShopeeSigner::new(partner_id, partner_key, shop_id))
    }
}

/// TikTok Shop open API settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "TIKTOK")]
pub struct TikTokSettings {
    pub base_url: Option<String>,
    pub app_key: Option<String>,
    pub app_secret: Option<String>,
}

impl TikTokSettings {
    pub fn base_url(&self) -> &str {
        non_empty(self.base_url.as_deref()).unwrap_or(DEFAULT_TIKTOK_BASE_URL)
    }

    pub fn signer(&self) -> Option<TikTokSigner> {
        let app_key = non_empty(self.app_key.as_deref())?;
        let app_secret = non_empty(self.app_secret.as_deref())?;
        Some(TikTokSigner::new(app_key, app_secret))
    }
}

/// Every settings group.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub shopee: ShopeeSettings,
    pub tiktok: TikTokSettings,
}

impl Settings {
    /// Load all groups from the environment and configuration files.
    ///
    /// Command-line flags are not consulted; the groups share one process
    /// and would reject each other's flags.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Load`] naming the group that failed.
    pub fn load() -> Result<Self, SettingsError> {
        let args = || [OsString::from(env!("CARGO_PKG_NAME"))];
        Ok(Self {
            app: AppSettings::load_from_iter(args()).map_err(|err| load_error("APP", &err))?,
            shopee: ShopeeSettings::load_from_iter(args())
                .map_err(|err| load_error("SHOPEE", &err))?,
            tiktok: TikTokSettings::load_from_iter(args())
                .map_err(|err| load_error("TIKTOK", &err))?,
        })
    }
}

fn load_error(group: &'static str, err: &impl std::fmt::Display) -> SettingsError {
    SettingsError::Load {
        group,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    //! Environment parsing and default handling.

    use super::*;
    use env_lock::lock_env;
    use rstest::rstest;

    const APP_KEYS: [&str; 9] = [
        "APP_HOST",
        "APP_PORT",
        "APP_DATABASE_URL",
        "APP_REDIS_URL",
        "APP_POOL_SIZE",
        "APP_JWT_SECRET",
        "APP_ACCESS_TOKEN_MINUTES",
        "APP_REFRESH_TOKEN_MINUTES",
        "APP_RUN_MIGRATIONS",
    ];

    const SHOPEE_KEYS: [&str; 7] = [
        "SHOPEE_BASE_URL",
        "SHOPEE_PARTNER_ID",
        "SHOPEE_PARTNER_KEY",
        "SHOPEE_SHOP_ID",
        "SHOPEE_REFRESH_TOKEN",
        "SHOPEE_RETRY_LIMIT",
        "SHOPEE_TIMEOUT_SECONDS",
    ];

    fn cleared(keys: &[&'static str]) -> Vec<(&'static str, Option<String>)> {
        keys.iter().map(|key| (*key, None)).collect()
    }

    fn load_app() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("storefront")]).expect("config should load")
    }

    fn load_shopee() -> ShopeeSettings {
        ShopeeSettings::load_from_iter([OsString::from("storefront")]).expect("config should load")
    }

    #[rstest]
    fn app_defaults_apply_when_unset() {
        let _guard = lock_env(cleared(&APP_KEYS));

        let settings = load_app();

        assert_eq!(
            settings.bind_addr().expect("default address"),
            SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
        );
        assert!(settings.database_url().is_none());
        assert!(settings.redis_url().is_none());
        assert!(settings.jwt_secret().is_none());
        assert!(!settings.run_migrations);
        assert_eq!(settings.pool_size(), DEFAULT_POOL_SIZE);
        assert_eq!(
            settings.access_token_ttl().expect("ttl"),
            TimeDelta::minutes(15)
        );
        assert_eq!(settings.refresh_token_ttl().expect("ttl"), TimeDelta::days(7));
    }

    #[rstest]
    fn app_environment_overrides_are_respected() {
        let mut env = cleared(&APP_KEYS);
        env.extend([
            ("APP_HOST", Some("127.0.0.1".to_owned())),
            ("APP_PORT", Some("9090".to_owned())),
            ("APP_DATABASE_URL", Some("postgres://localhost/shop".to_owned())),
            ("APP_JWT_SECRET", Some("s3cret".to_owned())),
            ("APP_ACCESS_TOKEN_MINUTES", Some("5".to_owned())),
            ("APP_RUN_MIGRATIONS", Some("true".to_owned())),
        ]);
        let _guard = lock_env(env);

        let settings = load_app();

        assert_eq!(
            settings.bind_addr().expect("address"),
            SocketAddr::from(([127, 0, 0, 1], 9090))
        );
        assert_eq!(settings.database_url(), Some("postgres://localhost/shop"));
        assert_eq!(settings.jwt_secret(), Some("s3cret"));
        assert_eq!(settings.access_token_ttl().expect("ttl"), TimeDelta::minutes(5));
        assert!(settings.run_migrations);
    }

    #[rstest]
    #[case(0)]
    #[case(-3)]
    fn non_positive_token_lifetimes_are_rejected(#[case] value: i64) {
        let result = minutes("APP_ACCESS_TOKEN_MINUTES", value);
        assert!(matches!(
            result,
            Err(SettingsError::Invalid { key: "APP_ACCESS_TOKEN_MINUTES", .. })
        ));
    }

    #[rstest]
    fn hostnames_are_not_addresses() {
        let mut env = cleared(&APP_KEYS);
        env.push(("APP_HOST", Some("localhost".to_owned())));
        let _guard = lock_env(env);

        assert!(matches!(
            load_app().bind_addr(),
            Err(SettingsError::Invalid { key: "APP_HOST", .. })
        ));
    }

    #[rstest]
    fn shopee_defaults_and_partial_credentials() {
        let mut env = cleared(&SHOPEE_KEYS);
        env.push(("SHOPEE_PARTNER_ID", Some("1001".to_owned())));
        let _guard = lock_env(env);

        let settings = load_shopee();

        assert_eq!(settings.base_url(), DEFAULT_SHOPEE_BASE_URL);
        assert_eq!(settings.retry_limit(), 3);
        assert_eq!(settings.timeout(), Duration::from_secs(10));
        assert!(settings.signer().is_none());
    }

    #[rstest]
    fn shopee_signer_requires_every_credential() {
        let mut env = cleared(&SHOPEE_KEYS);
        env.extend([
            ("SHOPEE_PARTNER_ID", Some("1001".to_owned())),
            ("SHOPEE_PARTNER_KEY", Some("key".to_owned())),
            ("SHOPEE_SHOP_ID", Some("2002".to_owned())),
            ("SHOPEE_RETRY_LIMIT", Some("5".to_owned())),
        ]);
        let _guard = lock_env(env);

        let settings = load_shopee();
        let signer = settings.signer().expect("signer configured");

        assert_eq!(signer.partner_id(), "1001");
        assert_eq!(signer.shop_id(), "2002");
        assert_eq!(settings.retry_limit(), 5);
    }

    #[rstest]
    fn tiktok_signer_needs_key_and_secret() {
        let settings = TikTokSettings {
            base_url: None,
            app_key: Some("key".to_owned()),
            app_secret: Some("  ".to_owned()),
        };
        assert!(settings.signer().is_none());
        assert_eq!(settings.base_url(), DEFAULT_TIKTOK_BASE_URL);
    }
}
