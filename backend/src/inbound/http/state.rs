//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{AuthCommand, ProductCatalogue, ShopQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub products: Arc<dyn ProductCatalogue>,
    pub auth: Arc<dyn AuthCommand>,
    pub shop: Arc<dyn ShopQuery>,
}

impl HttpState {
    /// Construct state from the three driving ports.
    pub fn new(
        products: Arc<dyn ProductCatalogue>,
        auth: Arc<dyn AuthCommand>,
        shop: Arc<dyn ShopQuery>,
    ) -> Self {
        Self {
            products,
            auth,
            shop,
        }
    }
}
