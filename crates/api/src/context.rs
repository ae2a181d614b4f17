use factha_auth::JwtClaims;
use factha_core::UserId;

/// Principal context for a request (the authenticated user).
///
/// Inserted by the auth middleware; every protected handler can rely on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    email: String,
    name: String,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, email: String, name: String) -> Self {
        Self {
            user_id,
            email,
            name,
        }
    }

    pub fn from_claims(claims: JwtClaims) -> Self {
        Self::new(claims.sub, claims.email, claims.name)
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
