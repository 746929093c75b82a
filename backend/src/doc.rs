//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every handler in the inbound layer, the request DTOs
//! and the domain error payload, plus a bearer-token security scheme for
//! the JWTs issued by `POST /login`. Swagger UI serves it in debug builds and
//! `cargo run --bin openapi_dump` prints it for external tooling.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::ports::{AuthTokens, UserProfile};
use crate::domain::{Error, ErrorCode};
use crate::inbound::http::auth::{LoginRequest, RefreshRequest, RegisterRequest};
use crate::inbound::http::products::{
    CreateProductRequest, CreateProductsBody, DeleteProductsRequest, UpdateProductRequest,
};

/// Adds the bearer JWT security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        let scheme = HttpBuilder::new()
            .scheme(HttpAuthScheme::Bearer)
            .bearer_format("JWT")
            .description(Some("Access token issued by POST /login."))
            .build();
        components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme));
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Storefront API",
        description = "Product catalogue, account sessions and marketplace shop information."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerAuth" = [])),
    paths(
        crate::inbound::http::auth::register,
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::logout,
        crate::inbound::http::auth::refresh,
        crate::inbound::http::auth::current_user,
        crate::inbound::http::products::create_products,
        crate::inbound::http::products::list_products,
        crate::inbound::http::products::get_product,
        crate::inbound::http::products::update_products,
        crate::inbound::http::products::delete_products,
        crate::inbound::http::shop::shop_info,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        AuthTokens,
        UserProfile,
        RegisterRequest,
        LoginRequest,
        RefreshRequest,
        CreateProductRequest,
        CreateProductsBody,
        UpdateProductRequest,
        DeleteProductsRequest,
    )),
    tags(
        (name = "auth", description = "Registration, login and token lifecycle"),
        (name = "products", description = "Product catalogue"),
        (name = "shop", description = "Marketplace shop information"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
