//! HS256 JSON Web Token [`TokenIssuer`].
//!
//! Expiry is checked against the caller-supplied `now` rather than the
//! library's wall clock, so the issuer follows the injected service clock.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::EntityId;
use crate::domain::ports::{IssuedToken, TokenClaims, TokenError, TokenIssuer, TokenKind};

/// `iss` claim of every token this service signs.
pub const ISSUER: &str = "storefront";

#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    sub: i64,
    email: String,
    typ: TokenKind,
    jti: String,
    iss: String,
    iat: i64,
    exp: i64,
}

/// Signs and verifies access and refresh tokens with one shared secret.
pub struct JwtTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: TimeDelta,
    refresh_ttl: TimeDelta,
}

impl JwtTokenIssuer {
    /// # Errors
    ///
    /// Returns `TokenError::Signing` when `secret` is empty.
    pub fn new(
        secret: &str,
        access_ttl: TimeDelta,
        refresh_ttl: TimeDelta,
    ) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::signing("signing secret must not be empty"));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_issuer(&[ISSUER]);
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        })
    }

    fn ttl(&self, kind: TokenKind) -> TimeDelta {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }
}

impl std::fmt::Debug for JwtTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

fn invalid(message: impl Into<String>) -> TokenError {
    TokenError::invalid(message)
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(
        &self,
        subject: EntityId,
        email: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = now + self.ttl(kind);
        let claims = JwtClaims {
            sub: subject.get(),
            email: email.to_owned(),
            typ: kind,
            jti: Uuid::new_v4().to_string(),
            iss: ISSUER.to_owned(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| TokenError::signing(err.to_string()))?;
        Ok(IssuedToken {
            token,
            claims: TokenClaims {
                subject,
                email: claims.email,
                kind,
                token_id: claims.jti,
                expires_at,
            },
        })
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let decoded = decode::<JwtClaims>(token, &self.decoding, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::expired(),
                ErrorKind::InvalidSignature => invalid("signature mismatch"),
                ErrorKind::InvalidIssuer => invalid("untrusted issuer"),
                _ => invalid(err.to_string()),
            },
        )?;
        let claims = decoded.claims;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::expired());
        }
        let subject = EntityId::new(claims.sub).map_err(|err| invalid(err.to_string()))?;
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .ok_or_else(|| invalid("expiry out of range"))?;
        Ok(TokenClaims {
            subject,
            email: claims.email,
            kind: claims.typ,
            token_id: claims.jti,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).single().expect("valid timestamp")
    }

    #[fixture]
    fn issuer() -> JwtTokenIssuer {
        JwtTokenIssuer::new("test-secret", TimeDelta::minutes(15), TimeDelta::days(1))
            .expect("issuer builds")
    }

    fn subject() -> EntityId {
        EntityId::new(7).expect("positive id")
    }

    #[rstest]
    fn issued_tokens_verify_with_their_claims(issuer: JwtTokenIssuer) {
        let issued = issuer
            .issue(subject(), "ada@example.com", TokenKind::Refresh, at(1_000))
            .expect("issue");

        let claims = issuer.verify(&issued.token, at(1_001)).expect("verify");

        assert_eq!(claims, issued.claims);
        assert_eq!(claims.expires_at, at(1_000 + 86_400));
    }

    #[rstest]
    fn token_ids_are_unique(issuer: JwtTokenIssuer) {
        let first = issuer
            .issue(subject(), "ada@example.com", TokenKind::Access, at(0))
            .expect("issue");
        let second = issuer
            .issue(subject(), "ada@example.com", TokenKind::Access, at(0))
            .expect("issue");
        assert_ne!(first.claims.token_id, second.claims.token_id);
    }

    #[rstest]
    #[case(899, true)]
    #[case(900, false)]
    fn expiry_follows_the_supplied_clock(
        issuer: JwtTokenIssuer,
        #[case] elapsed: i64,
        #[case] valid: bool,
    ) {
        let issued = issuer
            .issue(subject(), "ada@example.com", TokenKind::Access, at(10_000))
            .expect("issue");
        let result = issuer.verify(&issued.token, at(10_000 + elapsed));
        if valid {
            assert!(result.is_ok());
        } else {
            assert_eq!(result, Err(TokenError::Expired));
        }
    }

    #[rstest]
    fn tokens_from_another_secret_are_invalid(issuer: JwtTokenIssuer) {
        let other = JwtTokenIssuer::new("other-secret", TimeDelta::minutes(15), TimeDelta::days(1))
            .expect("issuer builds");
        let foreign = other
            .issue(subject(), "ada@example.com", TokenKind::Access, at(0))
            .expect("issue");

        let err = issuer.verify(&foreign.token, at(1)).expect_err("rejected");
        assert_eq!(err, TokenError::invalid("signature mismatch"));
    }

    #[rstest]
    fn empty_secrets_are_refused() {
        let result = JwtTokenIssuer::new("", TimeDelta::minutes(1), TimeDelta::minutes(1));
        assert!(matches!(result, Err(TokenError::Signing { .. })));
    }
}
