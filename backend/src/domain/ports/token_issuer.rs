//! Port for issuing and verifying signed identity tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::EntityId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by token adapters.
    pub enum TokenError {
        /// Signature, structure or claims are invalid.
        Invalid { message: String } => "invalid token: {message}",
        /// The token is past its expiry.
        Expired => "token has expired",
        /// The token could not be signed.
        Signing { message: String } => "token signing failed: {message}",
    }
}

/// Purpose of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Verified identity claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject: EntityId,
    pub email: String,
    pub kind: TokenKind,
    /// Unique token identifier used for revocation.
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

/// A freshly signed token and the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

#[cfg_attr(test, mockall::automock)]
pub trait TokenIssuer: Send + Sync {
    /// Sign a token of `kind` for `subject`, valid from `now`.
    fn issue(
        &self,
        subject: EntityId,
        email: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError>;

    /// Verify the signature and expiry of `token` as of `now`.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError>;
}
