//! Driving port for account and session use-cases.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::entity::EntityId;
use crate::domain::user::Registration;
use crate::domain::Error;

/// Email and plaintext password presented at login.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Token pair handed out by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct UserProfile {
    #[schema(value_type = i64)]
    pub id: EntityId,
    pub name: String,
    pub email: String,
}

/// Domain use-case port for authentication.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthCommand: Send + Sync {
    /// Create an account.
    async fn register(&self, registration: Registration) -> Result<UserProfile, Error>;

    /// Check credentials and issue an access/refresh token pair.
    async fn login(&self, credentials: LoginCredentials) -> Result<AuthTokens, Error>;

    /// Revoke a presented token for the rest of its lifetime.
    async fn logout(&self, token: &str) -> Result<(), Error>;

    /// Exchange a refresh token for a new pair, revoking the old one.
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, Error>;

    /// Profile of the bearer of `token`.
    async fn current_user(&self, token: &str) -> Result<UserProfile, Error>;
}
