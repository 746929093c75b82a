//! Port for raw HTTP exchanges with marketplace APIs.
//!
//! The transport knows nothing about signing or tokens; it sends a request
//! and reports the status and body, failing only on transport errors.

use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;

define_port_error! {
    /// Raised when no HTTP response was received.
    pub enum TransportError {
        /// Connection, TLS or timeout failure.
        Failed { message: String } => "marketplace transport failed: {message}",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One outbound call, addressed relative to the marketplace base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketplaceRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl MarketplaceRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Status and raw body of a marketplace reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceResponse {
    pub status: u16,
    pub body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketplaceTransport: Send + Sync {
    async fn send(&self, request: MarketplaceRequest)
    -> Result<MarketplaceResponse, TransportError>;
}
