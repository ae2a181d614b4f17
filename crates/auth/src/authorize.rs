use thiserror::Error;

use factha_core::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {0} belongs to another user")]
    NotOwner(&'static str),
}

/// Allow an action only when the acting user owns the resource.
///
/// - No IO
/// - No panics
pub fn authorize_owner(
    principal: UserId,
    owner: UserId,
    resource: &'static str,
) -> Result<(), AuthzError> {
    if principal == owner {
        Ok(())
    } else {
        Err(AuthzError::NotOwner(resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_allowed() {
        let me = UserId::new();
        assert!(authorize_owner(me, me, "profile").is_ok());
    }

    #[test]
    fn other_user_is_denied() {
        let err = authorize_owner(UserId::new(), UserId::new(), "profile").unwrap_err();
        assert_eq!(err, AuthzError::NotOwner("profile"));
        assert_eq!(err.to_string(), "forbidden: profile belongs to another user");
    }
}
