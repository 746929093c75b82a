//! Port for exchanging a refresh credential for a new access token.

use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Raised when a new access token could not be obtained.
    pub enum RefreshError {
        /// No refresh credential is configured or cached.
        MissingCredential => "no refresh credential available",
        /// The marketplace rejected the refresh request.
        Rejected { message: String } => "token refresh rejected: {message}",
        /// The refresh call failed in transit.
        Unavailable { message: String } => "token refresh unavailable: {message}",
    }
}

/// Result of a successful refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshedCredential {
    pub access_token: String,
    /// Replacement refresh token, when the marketplace rotates it.
    pub refresh_token: Option<String>,
    pub expires_in: Duration,
}

impl std::fmt::Debug for RefreshedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshedCredential")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    async fn refresh(&self) -> Result<RefreshedCredential, RefreshError>;
}
