//! HTTP inbound adapter exposing REST endpoints.
//!
//! Every body, success or failure, uses the envelope in [`envelope`].
//! Extractor failures (malformed JSON, query strings or path segments) are
//! routed through the domain [`Error`] so they render the same way.

use actix_web::{HttpRequest, web};

use crate::domain::Error;

pub mod auth;
pub mod bearer;
pub mod envelope;
pub mod error;
pub mod health;
pub mod products;
pub mod shop;
pub mod state;

pub use error::ApiResult;

fn rejected(message: String) -> actix_web::Error {
    Error::invalid_request(message).into()
}

/// JSON body settings: decoding errors become `400` envelopes.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req: &HttpRequest| rejected(format!("Invalid JSON body: {err}")))
}

/// Query string settings: decoding errors become `400` envelopes.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req: &HttpRequest| rejected(format!("Invalid query: {err}")))
}

/// Path segment settings: decoding errors become `400` envelopes.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req: &HttpRequest| rejected(format!("Invalid path: {err}")))
}

/// Register extractor settings and every API route on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .service(auth::register)
        .service(auth::login)
        .service(auth::logout)
        .service(auth::refresh)
        .service(auth::current_user)
        .service(products::create_products)
        .service(products::list_products)
        .service(products::get_product)
        .service(products::update_products)
        .service(products::delete_products)
        .service(shop::shop_info);
}
