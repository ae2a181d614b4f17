//! Registered users and the rules for their identity fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainResult, UserId};

const MAX_NAME_CHARS: usize = 100;
const MIN_PASSWORD_CHARS: usize = 8;

// ─────────────────────────────────────────────────────────────────────────────
// User record
// ─────────────────────────────────────────────────────────────────────────────

/// A registered user.
///
/// `password_hash` never leaves the server; API mapping drops it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    /// Free-form profile text.
    pub bio: Option<String>,
    /// Object key of the profile picture, if any.
    pub file_name: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh user from already validated fields.
    pub fn register(
        name: String,
        email: String,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::new(),
            name,
            email,
            password_hash,
            bio: None,
            file_name: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Trim and bound a display name.
pub fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(DomainError::validation(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

/// Canonical (trimmed, lowercased) form of an email address.
///
/// Only the shape is checked: one `@`, non-empty local part, dotted domain.
pub fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    let invalid = || DomainError::validation("email is not a valid address");

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let dot = domain.find('.').ok_or_else(invalid)?;
    if dot == 0 || domain.ends_with('.') {
        return Err(invalid());
    }

    Ok(email)
}

pub fn validate_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}
