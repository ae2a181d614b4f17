//! HS256 bearer tokens.

use chrono::{DateTime, Duration, Timelike, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::{JwtClaims, TokenSubject, TokenValidationError, validate_claims};

/// Verifies a bearer token and yields its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// Mints bearer tokens for authenticated users.
pub trait JwtIssuer: Send + Sync {
    fn issue(&self, subject: &TokenSubject, now: DateTime<Utc>) -> Result<String, TokenValidationError>;
}

/// Shared-secret HS256 signer/verifier.
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn validation() -> Validation {
        // Time checks are done by `validate_claims` against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &Self::validation())
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl JwtIssuer for Hs256Jwt {
    fn issue(&self, subject: &TokenSubject, now: DateTime<Utc>) -> Result<String, TokenValidationError> {
        // Claims carry whole seconds; keep the in-memory value identical to the wire value.
        let issued_at = now.with_nanosecond(0).unwrap_or(now);
        let claims = JwtClaims {
            sub: subject.user_id,
            email: subject.email.clone(),
            name: subject.name.clone(),
            issued_at,
            expires_at: issued_at + self.ttl,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factha_core::UserId;

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: UserId::new(),
            email: "siti@example.com".into(),
            name: "Siti".into(),
        }
    }

    #[test]
    fn issued_token_validates() {
        let jwt = Hs256Jwt::new(b"test-secret", Duration::hours(1));
        let subject = subject();
        let now = Utc::now();

        let token = jwt.issue(&subject, now).unwrap();
        let claims = jwt.validate(&token, now).unwrap();

        assert_eq!(claims.sub, subject.user_id);
        assert_eq!(claims.email, subject.email);
        assert_eq!(claims.expires_at - claims.issued_at, Duration::hours(1));
    }

    #[test]
    fn token_expires_after_ttl() {
        let jwt = Hs256Jwt::new(b"test-secret", Duration::hours(1));
        let now = Utc::now();
        let token = jwt.issue(&subject(), now).unwrap();

        let later = now + Duration::hours(2);
        assert_eq!(jwt.validate(&token, later), Err(TokenValidationError::Expired));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = Hs256Jwt::new(b"secret-a", Duration::hours(1));
        let validator = Hs256Jwt::new(b"secret-b", Duration::hours(1));
        let now = Utc::now();
        let token = issuer.issue(&subject(), now).unwrap();

        assert!(matches!(
            validator.validate(&token, now),
            Err(TokenValidationError::Malformed(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        let jwt = Hs256Jwt::new(b"test-secret", Duration::hours(1));
        assert!(matches!(
            jwt.validate("not.a.token", Utc::now()),
            Err(TokenValidationError::Malformed(_))
        ));
    }
}
