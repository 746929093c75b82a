//! Account registration and token lifecycle over HTTP.

mod support;

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use serde_json::json;

use support::{bearer, call, harness, init_app, sign_in};

#[actix_web::test]
async fn signed_in_users_can_read_their_profile() {
    let app = init_app(harness().state).await;
    let (access, _) = sign_in(&app, "ada@example.com").await;

    let (status, body) = call(
        &app,
        actix_test::TestRequest::get()
            .uri("/user")
            .insert_header(bearer(&access))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Success");
    assert_eq!(body["data"][0]["email"], "ada@example.com");
    assert_eq!(body["data"][0]["name"], "Ada Lovelace");
    assert!(body["data"][0].get("password_hash").is_none());
}

#[actix_web::test]
async fn duplicate_registration_conflicts() {
    let app = init_app(harness().state).await;
    sign_in(&app, "ada@example.com").await;

    let (status, body) = call(
        &app,
        actix_test::TestRequest::post()
            .uri("/register")
            .set_json(json!({ "name": "Ada Again", "email": "ada@example.com", "password": "secret1" }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[actix_web::test]
async fn login_rejects_bad_credentials() {
    let app = init_app(harness().state).await;
    sign_in(&app, "ada@example.com").await;

    let (status, body) = call(
        &app,
        actix_test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": "ada@example.com", "password": "wrong-password" }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, body) = call(
        &app,
        actix_test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": "not-an-email", "password": "analytical" }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Email format");
}

#[actix_web::test]
async fn logout_revokes_the_access_token() {
    let app = init_app(harness().state).await;
    let (access, _) = sign_in(&app, "ada@example.com").await;

    let (status, body) = call(
        &app,
        actix_test::TestRequest::post()
            .uri("/logout")
            .insert_header(bearer(&access))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logout Successfully!");

    let (status, body) = call(
        &app,
        actix_test::TestRequest::get()
            .uri("/user")
            .insert_header(bearer(&access))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token has been revoked");
}

#[actix_web::test]
async fn refresh_rotates_the_pair_once() {
    let app = init_app(harness().state).await;
    let (_, refresh) = sign_in(&app, "ada@example.com").await;

    let (status, body) = call(
        &app,
        actix_test::TestRequest::post()
            .uri("/refresh")
            .set_json(json!({ "refresh_token": refresh }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rotated = body["data"][0]["access_token"]
        .as_str()
        .expect("rotated access token")
        .to_owned();

    let (status, _) = call(
        &app,
        actix_test::TestRequest::get()
            .uri("/user")
            .insert_header(bearer(&rotated))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        actix_test::TestRequest::post()
            .uri("/refresh")
            .set_json(json!({ "refresh_token": refresh }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token has been revoked");
}

#[actix_web::test]
async fn access_tokens_expire_with_the_clock() {
    let harness = harness();
    let clock = harness.clock.clone();
    let app = init_app(harness.state).await;
    let (access, _) = sign_in(&app, "ada@example.com").await;

    clock.advance_seconds(15 * 60);

    let (status, body) = call(
        &app,
        actix_test::TestRequest::get()
            .uri("/user")
            .insert_header(bearer(&access))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token has expired");
}

#[actix_web::test]
async fn refresh_tokens_do_not_grant_access() {
    let app = init_app(harness().state).await;
    let (_, refresh) = sign_in(&app, "ada@example.com").await;

    let (status, body) = call(
        &app,
        actix_test::TestRequest::get()
            .uri("/user")
            .insert_header(bearer(&refresh))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[actix_web::test]
async fn missing_bearer_header_is_unauthorised() {
    let app = init_app(harness().state).await;
    let (status, body) = call(&app, actix_test::TestRequest::get().uri("/user").to_request()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing Authorization Header");
}

#[actix_web::test]
async fn shop_reports_unconfigured_marketplace() {
    let app = init_app(harness().state).await;
    let (status, body) = call(&app, actix_test::TestRequest::get().uri("/shop").to_request()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "service_unavailable");
}
