//! Shared helpers for the storefront HTTP integration tests.
//!
//! Every test gets a fresh application backed by the in-memory adapters, so
//! no database, Redis or marketplace credentials are needed.

use std::sync::Arc;

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, Error, test as actix_test, web};
use chrono::TimeDelta;
use mockable::Clock;
use serde_json::{Value, json};

use storefront::Trace;
use storefront::domain::ports::FixtureShopQuery;
use storefront::domain::{AuthService, Product, ProductService, User};
use storefront::inbound::http::configure;
use storefront::inbound::http::state::HttpState;
use storefront::outbound::memory::{InMemoryKeyValueStore, InMemoryRepository};
use storefront::outbound::security::{BcryptPasswordHasher, JwtTokenIssuer};
use storefront::test_support::MutableClock;

/// Handles a test keeps after the application is built.
pub struct Harness {
    pub clock: Arc<MutableClock>,
    pub state: HttpState,
}

/// Build an [`HttpState`] over in-memory stores and a fixed clock.
pub fn harness() -> Harness {
    let clock = Arc::new(MutableClock::at_epoch());
    let shared_clock: Arc<dyn Clock> = clock.clone();

    let products = Arc::new(InMemoryRepository::<Product>::new(Arc::clone(&shared_clock)));
    let users = Arc::new(InMemoryRepository::<User>::new(Arc::clone(&shared_clock)));
    let revocations = Arc::new(InMemoryKeyValueStore::new(Arc::clone(&shared_clock)));
    let tokens = Arc::new(
        JwtTokenIssuer::new("integration-secret", TimeDelta::minutes(15), TimeDelta::days(1))
            .expect("token issuer builds"),
    );

    let state = HttpState::new(
        Arc::new(ProductService::new(products, Arc::clone(&shared_clock))),
        Arc::new(AuthService::new(
            users,
            Arc::new(BcryptPasswordHasher::with_cost(4)),
            tokens,
            revocations,
            shared_clock,
        )),
        Arc::new(FixtureShopQuery),
    );
    Harness { clock, state }
}

/// Initialise the routed application for `state`.
pub async fn init_app(
    state: HttpState,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    actix_test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .wrap(Trace)
            .configure(configure),
    )
    .await
}

/// Send `request` and decode the JSON envelope.
pub async fn call<S, B>(app: &S, request: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let response = actix_test::call_service(app, request).await;
    let status = response.status();
    let body: Value = actix_test::read_body_json(response).await;
    (status, body)
}

/// Register an account and log in, returning the token pair.
pub async fn sign_in<S, B>(app: &S, email: &str) -> (String, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let (status, _) = call(
        app,
        actix_test::TestRequest::post()
            .uri("/register")
            .set_json(json!({ "name": "Ada Lovelace", "email": email, "password": "analytical" }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        app,
        actix_test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": email, "password": "analytical" }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tokens = &body["data"][0];
    (
        tokens["access_token"].as_str().expect("access token").to_owned(),
        tokens["refresh_token"].as_str().expect("refresh token").to_owned(),
    )
}

/// `Authorization` header value for `token`.
pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}
