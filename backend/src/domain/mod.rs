//! Domain entities, query model, services and ports.
//!
//! Purpose: keep the storefront's business rules independent of HTTP,
//! PostgreSQL, Redis and the marketplace APIs. Adapters live in `inbound`
//! and `outbound` and talk to the domain only through [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`) — transport-agnostic failure payload.
//! - ErrorCode (alias to `error::ErrorCode`) — stable error identifier.
//! - Product / User — persisted entities.
//! - ProductService / AuthService / ShopService — driving port
//!   implementations.

pub mod auth_service;
pub mod entity;
pub mod error;
pub mod filter;
pub mod marketplace;
pub mod ports;
pub mod product;
pub mod product_service;
mod service_errors;
pub mod shop_service;
pub mod trace_id;
pub mod transaction;
pub mod user;
pub mod validation;

pub use self::auth_service::AuthService;
pub use self::entity::{Entity, EntityField, EntityId, FieldValue, Patch, Record};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::product::{NewProduct, Product, ProductChanges, ProductField};
pub use self::product_service::ProductService;
pub use self::shop_service::ShopService;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{NewUser, Registration, User, UserField};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use storefront::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
