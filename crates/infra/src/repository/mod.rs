//! Relational storage of users, news and saved news.
//!
//! Every operation is a single parameterized statement (or its in-memory
//! equivalent). Handlers never see SQL.

use async_trait::async_trait;
use thiserror::Error;

use factha_core::{News, NewsId, SavedNews, SavedNewsId, User, UserId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryRepositories;
pub use postgres::PostgresRepositories;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("not found")]
    NotFound,

    /// A uniqueness rule was violated (duplicate email, duplicate bookmark).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn insert(&self, user: &User) -> Result<(), RepositoryError>;

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// All users, oldest first.
    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    /// Overwrite a user; `Conflict` when the new email belongs to someone else.
    async fn update(&self, user: &User) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait NewsRepository: Send + Sync {
    async fn insert(&self, news: &News) -> Result<(), RepositoryError>;

    async fn get(&self, id: NewsId) -> Result<Option<News>, RepositoryError>;

    /// All news, newest first.
    async fn list(&self) -> Result<Vec<News>, RepositoryError>;

    /// Case-insensitive substring match on title or body, newest first.
    async fn search(&self, keyword: &str) -> Result<Vec<News>, RepositoryError>;

    async fn update(&self, news: &News) -> Result<(), RepositoryError>;

    /// Remove the article and every bookmark that points at it.
    async fn delete(&self, id: NewsId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SavedNewsRepository: Send + Sync {
    /// `Conflict` when the user already saved this article,
    /// `NotFound` when the article does not exist.
    async fn insert(&self, saved: &SavedNews) -> Result<(), RepositoryError>;

    async fn get(&self, id: SavedNewsId) -> Result<Option<SavedNews>, RepositoryError>;

    /// A user's bookmarks, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<SavedNews>, RepositoryError>;

    async fn delete(&self, id: SavedNewsId) -> Result<(), RepositoryError>;
}
