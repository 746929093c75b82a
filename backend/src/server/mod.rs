//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;

use state_builders::build_http_state;

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, HttpServer, web};
use mockable::DefaultClock;

use storefront::Trace;
#[cfg(debug_assertions)]
use storefront::doc::ApiDoc;
use storefront::domain::Error;
use storefront::inbound::http::health::{HealthState, live, ready};
use storefront::inbound::http::state::HttpState;
use storefront::inbound::http::{ApiResult, configure};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

async fn route_not_found() -> ApiResult<HttpResponse> {
    Err(Error::not_found("Route not found"))
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .configure(configure)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app.default_service(web::to(route_not_found))
}

/// Construct an Actix HTTP server using the provided health state and
/// configuration.
///
/// Signal handling is left to the caller so liveness can be failed before
/// the listener drains.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when building adapters or binding the
/// socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let http_state = web::Data::new(build_http_state(&config, Arc::new(DefaultClock))?);

    let server = HttpServer::new(move || build_app(server_health_state.clone(), http_state.clone()))
        .disable_signals()
        .bind(config.bind_addr())?
        .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use chrono::TimeDelta;
    use rstest::rstest;
    use serde_json::Value;
    use storefront::outbound::security::JwtTokenIssuer;

    fn app_state() -> (web::Data<HealthState>, web::Data<HttpState>) {
        let tokens = JwtTokenIssuer::new("test-secret", TimeDelta::minutes(15), TimeDelta::days(1))
            .expect("issuer builds");
        let config = ServerConfig::new(([127, 0, 0, 1], 0).into(), Arc::new(tokens));
        let http = build_http_state(&config, Arc::new(DefaultClock)).expect("state builds");
        (web::Data::new(HealthState::new()), web::Data::new(http))
    }

    #[rstest]
    #[actix_web::test]
    async fn unknown_routes_use_the_error_envelope() {
        let (health, http) = app_state();
        let app = actix_test::init_service(build_app(health, http)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/nowhere").to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("trace-id"));
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["message"], "Route not found");
    }

    #[rstest]
    #[actix_web::test]
    async fn products_are_served_from_memory() {
        let (health, http) = app_state();
        let app = actix_test::init_service(build_app(health, http)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/products").to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["total"], 0);
    }
}
