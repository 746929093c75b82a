//! `Authorization: Bearer <token>` extractor.

use std::future::{Ready, ready};

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use zeroize::Zeroizing;

use crate::domain::Error;

const SCHEME: &str = "Bearer";

/// The raw token presented by the caller.
///
/// Extraction fails with `401 Unauthorized` when the header is absent, uses
/// another scheme or carries an empty token. The token itself is not
/// validated here; the auth port does that.
pub struct BearerToken(Zeroizing<String>);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

fn parse(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case(SCHEME) && !token.is_empty()).then_some(token)
}

impl FromRequest for BearerToken {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse)
            .map(|token| Self(Zeroizing::new(token.to_owned())))
            .ok_or_else(|| Error::unauthorized("Missing Authorization Header"));
        ready(token)
    }
}
