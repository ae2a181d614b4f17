//! `factha-auth` — authentication/authorization boundary.
//!
//! Decoupled from HTTP and storage: the api crate feeds it header values and
//! stored hashes, it answers with claims, tokens and yes/no decisions.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;

pub use authorize::{AuthzError, authorize_owner};
pub use claims::{JwtClaims, TokenSubject, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtIssuer, JwtValidator};
pub use password::{BcryptPasswordHasher, PasswordError, PasswordHasher};
