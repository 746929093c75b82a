//! Account and session use-cases implementing the [`AuthCommand`] port.
//!
//! Passwords are hashed through [`PasswordHasher`] and never leave the
//! service. Sessions are stateless signed tokens from [`TokenIssuer`];
//! logging out or rotating a refresh token records the token identifier in
//! a revocation list held in the [`KeyValueStore`] until the token would
//! have expired anyway.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use pagination::PageRequest;
use tracing::{error, info, warn};

use super::entity::{Entity, EntityField, EntityId, FieldValue};
use super::filter::{Condition, FilterSpec, QuerySpec, compile};
use super::ports::{
    AuthCommand, AuthTokens, KeyValueStore, LoginCredentials, PasswordHasher, Repository,
    TokenClaims, TokenError, TokenIssuer, TokenKind, UserProfile,
};
use super::service_errors::{filter_failure, repository_failure, validation_failure};
use super::user::{NewUser, Registration, User, UserField, validate_email, validate_password};
use super::Error;

/// Prefix of revocation-list keys; the token identifier follows.
pub const REVOKED_KEY_PREFIX: &str = "revoked:";

/// `token_type` reported with every token pair.
pub const TOKEN_TYPE: &str = "Bearer";

const INVALID_CREDENTIALS: &str = "Invalid Email or Password";

/// Authentication use-cases over any [`Repository<User>`].
pub struct AuthService<R> {
    users: Arc<R>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    revocations: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl<R> AuthService<R> {
    pub fn new(
        users: Arc<R>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
        revocations: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            revocations,
            clock,
        }
    }
}

fn revocation_key(token_id: &str) -> String {
    format!("{REVOKED_KEY_PREFIX}{token_id}")
}

fn profile(user: &User) -> UserProfile {
    UserProfile {
        id: user.id(),
        name: user.name().to_owned(),
        email: user.email().to_owned(),
    }
}

fn token_failure(operation: &'static str, err: TokenError) -> Error {
    match err {
        TokenError::Expired => {
            warn!(operation, "expired token presented");
            Error::unauthorized("Token has expired")
        }
        TokenError::Invalid { message } => {
            warn!(operation, %message, "invalid token presented");
            Error::unauthorized("Invalid token")
        }
        TokenError::Signing { message } => {
            error!(operation, %message, "token signing failed");
            Error::internal("failed to issue token")
        }
    }
}

impl<R> AuthService<R>
where
    R: Repository<User>,
{
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let spec = QuerySpec {
            page: PageRequest::new(1, 1).map_err(|err| Error::internal(err.to_string()))?,
            filters: FilterSpec::new().with(
                UserField::Email.name(),
                Condition::Exact(FieldValue::Text(email.to_owned())),
            ),
            ..QuerySpec::default()
        };
        let plan = compile::<User>(&spec).map_err(|err| filter_failure("login", err))?;
        let mut rows = self
            .users
            .select(&plan)
            .await
            .map_err(|err| repository_failure("login", err))?;
        Ok(rows.pop())
    }

    async fn active_user(&self, operation: &'static str, id: EntityId) -> Result<User, Error> {
        let found = self
            .users
            .find_by_id(id)
            .await
            .map_err(|err| repository_failure(operation, err))?;
        match found {
            Some(user) if !user.timestamps().is_deleted() => Ok(user),
            _ => {
                warn!(operation, %id, "token subject no longer exists");
                Err(Error::unauthorized("Invalid token"))
            }
        }
    }

    fn issue_pair(&self, user: &User, now: DateTime<Utc>) -> Result<AuthTokens, Error> {
        let access = self
            .tokens
            .issue(user.id(), user.email(), TokenKind::Access, now)
            .map_err(|err| token_failure("issue_tokens", err))?;
        let refresh = self
            .tokens
            .issue(user.id(), user.email(), TokenKind::Refresh, now)
            .map_err(|err| token_failure("issue_tokens", err))?;
        Ok(AuthTokens {
            expires_in: (access.claims.expires_at - now).num_seconds(),
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: TOKEN_TYPE.to_owned(),
        })
    }

    /// Verify `token`, require `kind` when given, and reject revoked tokens.
    async fn authenticate(
        &self,
        operation: &'static str,
        token: &str,
        kind: Option<TokenKind>,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, Error> {
        let claims = self
            .tokens
            .verify(token, now)
            .map_err(|err| token_failure(operation, err))?;
        if kind.is_some_and(|expected| expected != claims.kind) {
            warn!(operation, kind = ?claims.kind, "token of the wrong kind presented");
            return Err(Error::unauthorized("Invalid token"));
        }
        let revoked = self
            .revocations
            .get(&revocation_key(&claims.token_id))
            .await
            .map_err(|err| {
                error!(operation, error = %err, "revocation list unavailable");
                Error::service_unavailable("session store unavailable")
            })?;
        if revoked.is_some() {
            warn!(operation, subject = %claims.subject, "revoked token presented");
            return Err(Error::unauthorized("Token has been revoked"));
        }
        Ok(claims)
    }

    /// Add the token to the revocation list for the rest of its lifetime.
    async fn revoke(
        &self,
        operation: &'static str,
        claims: &TokenClaims,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let Ok(remaining) = (claims.expires_at - now).to_std() else {
            return Ok(());
        };
        if remaining.is_zero() {
            return Ok(());
        }
        self.revocations
            .set_with_ttl(
                &revocation_key(&claims.token_id),
                &claims.subject.to_string(),
                remaining,
            )
            .await
            .map_err(|err| {
                error!(operation, error = %err, "failed to record revocation");
                Error::service_unavailable("session store unavailable")
            })
    }
}

#[async_trait]
impl<R> AuthCommand for AuthService<R>
where
    R: Repository<User> + 'static,
{
    async fn register(&self, registration: Registration) -> Result<UserProfile, Error> {
        registration
            .validate()
            .map_err(|err| validation_failure("register", &err))?;
        let password_hash = self
            .hasher
            .hash(&registration.password)
            .await
            .map_err(|err| {
                error!(error = %err, "password hashing failed");
                Error::internal("failed to register user")
            })?;

        let created = self
            .users
            .create(vec![NewUser {
                name: registration.name,
                email: registration.email,
                password_hash,
            }])
            .await
            .map_err(|err| repository_failure("register", err))?;
        let user = created
            .first()
            .ok_or_else(|| Error::internal("user insert returned no rows"))?;
        info!(user_id = %user.id(), "user registered");
        Ok(profile(user))
    }

    async fn login(&self, credentials: LoginCredentials) -> Result<AuthTokens, Error> {
        if let Err(err) = validate_email(&credentials.email) {
            warn!(error = %err, "login rejected");
            return Err(Error::invalid_request("Invalid Email format").with_details(err.details()));
        }
        validate_password(&credentials.password)
            .map_err(|err| validation_failure("login", &err))?;

        let Some(user) = self.find_by_email(&credentials.email).await? else {
            warn!("login for unknown email");
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };
        let matches = self
            .hasher
            .verify(&credentials.password, user.password_hash())
            .await
            .map_err(|err| {
                error!(user_id = %user.id(), error = %err, "password verification failed");
                Error::internal("failed to verify credentials")
            })?;
        if !matches {
            warn!(user_id = %user.id(), "login with wrong password");
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }

        let tokens = self.issue_pair(&user, self.clock.utc())?;
        info!(user_id = %user.id(), "user logged in");
        Ok(tokens)
    }

    async fn logout(&self, token: &str) -> Result<(), Error> {
        let now = self.clock.utc();
        let claims = self.authenticate("logout", token, None, now).await?;
        self.revoke("logout", &claims, now).await?;
        info!(user_id = %claims.subject, "user logged out");
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, Error> {
        let now = self.clock.utc();
        let claims = self
            .authenticate("refresh", refresh_token, Some(TokenKind::Refresh), now)
            .await?;
        let user = self.active_user("refresh", claims.subject).await?;
        self.revoke("refresh", &claims, now).await?;
        let tokens = self.issue_pair(&user, now)?;
        info!(user_id = %user.id(), "token pair rotated");
        Ok(tokens)
    }

    async fn current_user(&self, token: &str) -> Result<UserProfile, Error> {
        let now = self.clock.utc();
        let claims = self
            .authenticate("current_user", token, Some(TokenKind::Access), now)
            .await?;
        let user = self.active_user("current_user", claims.subject).await?;
        Ok(profile(&user))
    }
}

#[cfg(test)]
#[path = "auth_service_tests.rs"]
mod tests;
