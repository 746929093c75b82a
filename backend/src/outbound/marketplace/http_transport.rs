//! Reqwest-backed [`MarketplaceTransport`].
//!
//! Owns transport details only: URL assembly, timeout and JSON bodies.
//! Non-2xx replies are returned as responses so the signed client can react
//! to 401; only failures to obtain a reply become [`TransportError`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::domain::ports::{
    HttpMethod, MarketplaceRequest, MarketplaceResponse, MarketplaceTransport, TransportError,
};

const USER_AGENT: &str = concat!("storefront/", env!("CARGO_PKG_VERSION"));

/// Sends marketplace requests relative to one base URL.
pub struct HttpMarketplaceTransport {
    client: Client,
    base_url: String,
}

impl HttpMarketplaceTransport {
    /// Build a transport with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when `base_url` is not an absolute URL or the
    /// reqwest client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        Url::parse(base_url).map_err(|err| TransportError::failed(format!("base url: {err}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| TransportError::failed(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn endpoint(&self, request: &MarketplaceRequest) -> Result<Url, TransportError> {
        endpoint(&self.base_url, &request.path, &request.query)
    }
}

/// Append `path` to `base` verbatim and add `query` pairs.
fn endpoint(base: &str, path: &str, query: &[(String, String)]) -> Result<Url, TransportError> {
    let separator = if path.starts_with('/') { "" } else { "/" };
    let mut url = Url::parse(&format!("{base}{separator}{path}"))
        .map_err(|err| TransportError::failed(format!("request url: {err}")))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

fn map_transport_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::failed(format!("request timed out: {error}"))
    } else {
        TransportError::failed(error.to_string())
    }
}

#[async_trait]
impl MarketplaceTransport for HttpMarketplaceTransport {
    async fn send(
        &self,
        request: MarketplaceRequest,
    ) -> Result<MarketplaceResponse, TransportError> {
        let url = self.endpoint(&request)?;
        debug!(path = %request.path, method = ?request.method, "sending marketplace request");

        let builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };
        let response = builder
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_transport_error)?;
        Ok(MarketplaceResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://partner.shopeemobile.com/api/v2", "/shop/get")]
    #[case("https://partner.shopeemobile.com/api/v2", "shop/get")]
    fn endpoint_keeps_the_base_path(#[case] base: &str, #[case] path: &str) {
        let query = vec![
            ("partner_id".to_owned(), "42".to_owned()),
            ("sign".to_owned(), "a b".to_owned()),
        ];
        let url = endpoint(base, path, &query).expect("valid url");
        assert_eq!(
            url.as_str(),
            "https://partner.shopeemobile.com/api/v2/shop/get?partner_id=42&sign=a+b"
        );
    }

    #[rstest]
    fn trailing_slashes_are_trimmed() {
        let transport =
            HttpMarketplaceTransport::new("https://example.test/api/", Duration::from_secs(1))
                .expect("transport builds");
        let url = transport
            .endpoint(&MarketplaceRequest::get("/ping"))
            .expect("valid url");
        assert_eq!(url.as_str(), "https://example.test/api/ping");
    }

    #[rstest]
    fn relative_base_urls_are_rejected() {
        let result = HttpMarketplaceTransport::new("partner/api", Duration::from_secs(1));
        assert!(matches!(result, Err(TransportError::Failed { .. })));
    }
}
