//! Request signing strategies for the supported marketplaces.
//!
//! Both schemes produce a hex-encoded HMAC-SHA256 keyed with the partner
//! secret, but they build different base strings and are kept separate.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Raised when a signature or signed URL cannot be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("signing key rejected: {0}")]
    Key(String),
    #[error("invalid marketplace URL: {0}")]
    Url(String),
}

fn hmac_hex(secret: &str, message: &str) -> Result<String, SigningError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| SigningError::Key(err.to_string()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Shopee partner API signer.
///
/// Shop-level calls sign `partner_id + path + timestamp + access_token +
/// shop_id + partner_key`; public calls sign `partner_id + path +
/// timestamp`.
#[derive(Clone)]
pub struct ShopeeSigner {
    partner_id: String,
    partner_key: Zeroizing<String>,
    shop_id: String,
}

impl ShopeeSigner {
    pub fn new(
        partner_id: impl Into<String>,
        partner_key: impl Into<String>,
        shop_id: impl Into<String>,
    ) -> Self {
        Self {
            partner_id: partner_id.into(),
            partner_key: Zeroizing::new(partner_key.into()),
            shop_id: shop_id.into(),
        }
    }

    pub fn partner_id(&self) -> &str {
        &self.partner_id
    }

    pub fn shop_id(&self) -> &str {
        &self.shop_id
    }

    /// Signature for a shop-level call made with `access_token`.
    pub fn sign(
        &self,
        path: &str,
        timestamp: i64,
        access_token: &str,
    ) -> Result<String, SigningError> {
        let base = Zeroizing::new(format!(
            "{}{path}{timestamp}{access_token}{}{}",
            self.partner_id,
            self.shop_id,
            self.partner_key.as_str()
        ));
        hmac_hex(&self.partner_key, &base)
    }

    /// Signature for a public call that carries no access token.
    pub fn sign_public(&self, path: &str, timestamp: i64) -> Result<String, SigningError> {
        hmac_hex(
            &self.partner_key,
            &format!("{}{path}{timestamp}", self.partner_id),
        )
    }
}

impl std::fmt::Debug for ShopeeSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopeeSigner")
            .field("partner_id", &self.partner_id)
            .field("shop_id", &self.shop_id)
            .finish_non_exhaustive()
    }
}

/// TikTok Shop open API signer.
///
/// The base string is the path followed by every query parameter except
/// `sign` and `access_token`, sorted by key and concatenated as
/// `{key}{value}`, then wrapped on both sides by the app secret.
pub struct TikTokSigner {
    app_key: String,
    app_secret: Zeroizing<String>,
}

impl TikTokSigner {
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: Zeroizing::new(app_secret.into()),
        }
    }

    pub fn sign(
        &self,
        path: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<String, SigningError> {
        let mut base = String::from(path);
        for (key, value) in params {
            if key == "sign" || key == "access_token" {
                continue;
            }
            base.push_str(key);
            base.push_str(value);
        }
        let secret = self.app_secret.as_str();
        hmac_hex(secret, &format!("{secret}{base}{secret}"))
    }

    /// Full request URL with `app_key`, `timestamp` and `sign` appended.
    pub fn signed_url(
        &self,
        base_url: &str,
        path: &str,
        mut params: BTreeMap<String, String>,
        timestamp: i64,
    ) -> Result<Url, SigningError> {
        params.insert("timestamp".to_owned(), timestamp.to_string());
        params.insert("app_key".to_owned(), self.app_key.clone());
        let sign = self.sign(path, &params)?;

        let mut url = Url::parse(base_url)
            .and_then(|base| base.join(path))
            .map_err(|err| SigningError::Url(err.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.extend_pairs(params.iter());
            query.append_pair("sign", &sign);
        }
        Ok(url)
    }
}

impl std::fmt::Debug for TikTokSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TikTokSigner")
            .field("app_key", &self.app_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Known-answer vectors for both signing schemes.

    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn shopee() -> ShopeeSigner {
        ShopeeSigner::new("2001887", "partner-secret", "14701711")
    }

    #[fixture]
    fn tiktok() -> TikTokSigner {
        TikTokSigner::new("12345", "777")
    }

    #[rstest]
    fn shopee_signs_fixed_order_base_string(shopee: ShopeeSigner) {
        let sign = shopee
            .sign("/api/v2/shop/get", 1_700_000_000, "access-abc")
            .expect("signature");
        assert_eq!(
            sign,
            "6a0324126d7cc050c8b8c87b632a5e7261295576cba0fc36099e9ca2576bf103"
        );
    }

    #[rstest]
    fn shopee_signature_depends_on_token(shopee: ShopeeSigner) {
        let first = shopee.sign("/shop/get", 1, "a").expect("signature");
        let second = shopee.sign("/shop/get", 1, "b").expect("signature");
        assert_ne!(first, second);
    }

    #[rstest]
    fn shopee_public_signature_omits_token_and_shop(shopee: ShopeeSigner) {
        let sign = shopee
            .sign_public("/api/v2/auth/access_token/get", 1_700_000_000)
            .expect("signature");
        assert_eq!(
            sign,
            "759d7e5019c78446890477d6cbf0b302fa915211ea81c329380a53fb5903f484"
        );
    }

    #[rstest]
    fn debug_output_hides_secrets(shopee: ShopeeSigner, tiktok: TikTokSigner) {
        assert!(!format!("{shopee:?}").contains("partner-secret"));
        assert!(!format!("{tiktok:?}").contains("777"));
    }

    #[rstest]
    fn tiktok_excludes_sign_and_access_token(tiktok: TikTokSigner) {
        let params = BTreeMap::from([
            ("app_key".to_owned(), "12345".to_owned()),
            ("timestamp".to_owned(), "1700000000".to_owned()),
            ("shop_id".to_owned(), "7000".to_owned()),
            ("access_token".to_owned(), "zzz".to_owned()),
            ("sign".to_owned(), "old".to_owned()),
        ]);
        let sign = tiktok
            .sign("/api/products/search", &params)
            .expect("signature");
        assert_eq!(
            sign,
            "2d07df8e8668e5c0f630bdc95beb1a88288a19570251dd233e719e4c0af2e5e8"
        );
    }

    #[rstest]
    fn tiktok_signed_url_appends_sign_last(tiktok: TikTokSigner) {
        let params = BTreeMap::from([
            ("shop_id".to_owned(), "7000".to_owned()),
            ("access_token".to_owned(), "zzz".to_owned()),
        ]);
        let url = tiktok
            .signed_url(
                "https://open-api.tiktokglobalshop.com",
                "/api/products/search",
                params,
                1_700_000_000,
            )
            .expect("signed url");
        assert_eq!(
            url.as_str(),
            "https://open-api.tiktokglobalshop.com/api/products/search?access_token=zzz\
             &app_key=12345&shop_id=7000&timestamp=1700000000\
             &sign=2d07df8e8668e5c0f630bdc95beb1a88288a19570251dd233e719e4c0af2e5e8"
        );
    }
}
