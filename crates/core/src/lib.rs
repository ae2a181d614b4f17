//! `factha-core` — domain records and validation rules.
//!
//! Pure domain code: no storage, no transport, no clock besides what callers pass in.

pub mod error;
pub mod id;
pub mod news;
pub mod saved;
pub mod user;

pub use error::{DomainError, DomainResult};
pub use id::{NewsId, PredictionId, SavedNewsId, UserId};
pub use news::{News, NewsDraft, parse_tags};
pub use saved::SavedNews;
pub use user::{User, normalize_email, validate_name, validate_password};
