//! Credential adapters: bcrypt password hashing and HS256 JWT tokens.

mod bcrypt_hasher;
mod jwt_issuer;

pub use bcrypt_hasher::BcryptPasswordHasher;
pub use jwt_issuer::{ISSUER, JwtTokenIssuer};
