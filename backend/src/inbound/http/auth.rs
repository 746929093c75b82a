//! Account and session handlers.
//!
//! ```text
//! POST /register {"name":"Ada","email":"ada@example.com","password":"..."}
//! POST /login    {"email":"ada@example.com","password":"..."}
//! POST /logout   Authorization: Bearer <token>
//! POST /refresh  {"refresh_token":"..."}
//! GET  /user     Authorization: Bearer <access token>
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use serde_json::Value;
use zeroize::Zeroizing;

use crate::domain::Registration;
use crate::domain::ports::LoginCredentials;
use crate::inbound::http::ApiResult;
use crate::inbound::http::bearer::BearerToken;
use crate::inbound::http::envelope::{created, ok};
use crate::inbound::http::state::HttpState;

/// Body of `POST /register`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Body of `POST /login`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /refresh`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Create an account.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Invalid registration"),
        (status = 409, description = "Email already registered")
    ),
    tags = ["auth"],
    operation_id = "register",
    security([])
)]
#[post("/register")]
pub async fn register(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let RegisterRequest {
        name,
        email,
        password,
    } = payload.into_inner();
    let profile = state
        .auth
        .register(Registration {
            name,
            email,
            password,
        })
        .await?;
    Ok(created("User registered successfully!", vec![profile]))
}

/// Exchange credentials for an access/refresh token pair.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success"),
        (status = 400, description = "Invalid Email format"),
        (status = 401, description = "Invalid Email or Password")
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let LoginRequest { email, password } = payload.into_inner();
    let tokens = state
        .auth
        .login(LoginCredentials { email, password })
        .await?;
    Ok(ok("Login Successfully!", vec![tokens]))
}

/// Revoke the presented token.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Token revoked"),
        (status = 401, description = "Missing or invalid token")
    ),
    tags = ["auth"],
    operation_id = "logout",
    security(("BearerAuth" = []))
)]
#[post("/logout")]
pub async fn logout(state: web::Data<HttpState>, token: BearerToken) -> ApiResult<HttpResponse> {
    state.auth.logout(token.as_str()).await?;
    Ok(ok::<Value>("Logout Successfully!", Vec::new()))
}

/// Rotate a refresh token into a new token pair.
#[utoipa::path(
    post,
    path = "/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair"),
        (status = 401, description = "Refresh token invalid, expired or revoked")
    ),
    tags = ["auth"],
    operation_id = "refresh",
    security([])
)]
#[post("/refresh")]
pub async fn refresh(
    state: web::Data<HttpState>,
    payload: web::Json<RefreshRequest>,
) -> ApiResult<HttpResponse> {
    let refresh_token = Zeroizing::new(payload.into_inner().refresh_token);
    let tokens = state.auth.refresh(&refresh_token).await?;
    Ok(ok("Token refreshed successfully!", vec![tokens]))
}

/// Profile of the authenticated caller.
#[utoipa::path(
    get,
    path = "/user",
    responses(
        (status = 200, description = "Current user"),
        (status = 401, description = "Missing or invalid token")
    ),
    tags = ["auth"],
    operation_id = "currentUser",
    security(("BearerAuth" = []))
)]
#[get("/user")]
pub async fn current_user(
    state: web::Data<HttpState>,
    token: BearerToken,
) -> ApiResult<HttpResponse> {
    let profile = state.auth.current_user(token.as_str()).await?;
    Ok(ok("Success", vec![profile]))
}
