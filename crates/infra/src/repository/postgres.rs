//! Postgres-backed repositories.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | RepositoryError | Scenario |
//! |-----------------------|-----------------|----------|
//! | `23505` (unique violation) | `Conflict` | Duplicate email, duplicate bookmark |
//! | `23503` (foreign key violation) | `NotFound` | Bookmark or article referencing a missing row |
//! | any other | `Backend` | Connection failures, malformed rows, etc. |

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use async_trait::async_trait;
use factha_core::{News, NewsId, SavedNews, SavedNewsId, User, UserId};

use super::{NewsRepository, RepositoryError, SavedNewsRepository, UserRepository};

/// All three repositories over one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresRepositories {
    pool: PgPool,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "user_id, name, email, password_hash, bio, file_name, image_url, created_at, updated_at";
const NEWS_COLUMNS: &str =
    "news_id, user_id, title, tags, body, file_name, image_url, created_at, updated_at";
const SAVED_COLUMNS: &str = "saved_id, user_id, news_id, created_at";

#[async_trait]
impl UserRepository for PostgresRepositories {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, name, email, password_hash, bio, file_name, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.bio)
        .bind(&user.file_name)
        .bind(&user.image_url)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, user_id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, password_hash = $4, bio = $5,
                file_name = $6, image_url = $7, updated_at = $8
            WHERE user_id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.bio)
        .bind(&user.file_name)
        .bind(&user.image_url)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl NewsRepository for PostgresRepositories {
    #[instrument(skip(self, news), fields(news_id = %news.id))]
    async fn insert(&self, news: &News) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO news (news_id, user_id, title, tags, body, file_name, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(news.id.as_uuid())
        .bind(news.author_id.as_uuid())
        .bind(&news.title)
        .bind(&news.tags)
        .bind(&news.body)
        .bind(&news.file_name)
        .bind(&news.image_url)
        .bind(news.created_at)
        .bind(news.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_news", e))?;
        Ok(())
    }

    async fn get(&self, id: NewsId) -> Result<Option<News>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {NEWS_COLUMNS} FROM news WHERE news_id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_news", e))?;
        row.as_ref().map(news_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<News>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {NEWS_COLUMNS} FROM news ORDER BY created_at DESC, news_id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_news", e))?;
        rows.iter().map(news_from_row).collect()
    }

    async fn search(&self, keyword: &str) -> Result<Vec<News>, RepositoryError> {
        let pattern = format!("%{}%", escape_like(keyword));
        let rows = sqlx::query(&format!(
            r#"
            SELECT {NEWS_COLUMNS} FROM news
            WHERE title ILIKE $1 ESCAPE '\' OR body ILIKE $1 ESCAPE '\'
            ORDER BY created_at DESC, news_id DESC
            "#
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("search_news", e))?;
        rows.iter().map(news_from_row).collect()
    }

    #[instrument(skip(self, news), fields(news_id = %news.id))]
    async fn update(&self, news: &News) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE news
            SET title = $2, tags = $3, body = $4, file_name = $5, image_url = $6, updated_at = $7
            WHERE news_id = $1
            "#,
        )
        .bind(news.id.as_uuid())
        .bind(&news.title)
        .bind(&news.tags)
        .bind(&news.body)
        .bind(&news.file_name)
        .bind(&news.image_url)
        .bind(news.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_news", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: NewsId) -> Result<(), RepositoryError> {
        // saved_news rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM news WHERE news_id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_news", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl SavedNewsRepository for PostgresRepositories {
    #[instrument(skip(self, saved), fields(saved_id = %saved.id))]
    async fn insert(&self, saved: &SavedNews) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO saved_news (saved_id, user_id, news_id, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(saved.id.as_uuid())
        .bind(saved.user_id.as_uuid())
        .bind(saved.news_id.as_uuid())
        .bind(saved.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_saved_news", e))?;
        Ok(())
    }

    async fn get(&self, id: SavedNewsId) -> Result<Option<SavedNews>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SAVED_COLUMNS} FROM saved_news WHERE saved_id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_saved_news", e))?;
        row.as_ref().map(saved_from_row).transpose()
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<SavedNews>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SAVED_COLUMNS} FROM saved_news WHERE user_id = $1 ORDER BY created_at DESC, saved_id DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_saved_news", e))?;
        rows.iter().map(saved_from_row).collect()
    }

    async fn delete(&self, id: SavedNewsId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM saved_news WHERE saved_id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_saved_news", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// Row mapping

fn user_from_row(row: &PgRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: UserId::from_uuid(get(row, "user_id")?),
        name: get(row, "name")?,
        email: get(row, "email")?,
        password_hash: get(row, "password_hash")?,
        bio: get(row, "bio")?,
        file_name: get(row, "file_name")?,
        image_url: get(row, "image_url")?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
        updated_at: get::<DateTime<Utc>>(row, "updated_at")?,
    })
}

fn news_from_row(row: &PgRow) -> Result<News, RepositoryError> {
    Ok(News {
        id: NewsId::from_uuid(get(row, "news_id")?),
        author_id: UserId::from_uuid(get(row, "user_id")?),
        title: get(row, "title")?,
        tags: get(row, "tags")?,
        body: get(row, "body")?,
        file_name: get(row, "file_name")?,
        image_url: get(row, "image_url")?,
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
        updated_at: get::<DateTime<Utc>>(row, "updated_at")?,
    })
}

fn saved_from_row(row: &PgRow) -> Result<SavedNews, RepositoryError> {
    Ok(SavedNews {
        id: SavedNewsId::from_uuid(get(row, "saved_id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        news_id: NewsId::from_uuid(get(row, "news_id")?),
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
    })
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| RepositoryError::Backend(format!("failed to read column {column}: {e}")))
}

/// Escape `%`, `_` and `\` so the keyword matches literally inside ILIKE.
fn escape_like(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::Conflict(msg),
                Some("23503") => RepositoryError::NotFound,
                _ => RepositoryError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Backend(format!("connection pool closed in {operation}"))
        }
        other => RepositoryError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
