//! Connection pool and schema bootstrap.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;

/// Idempotent DDL, applied in order at startup.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        user_id       UUID PRIMARY KEY,
        name          TEXT NOT NULL,
        email         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        bio           TEXT,
        file_name     TEXT,
        image_url     TEXT,
        created_at    TIMESTAMPTZ NOT NULL,
        updated_at    TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS news (
        news_id    UUID PRIMARY KEY,
        user_id    UUID NOT NULL REFERENCES users (user_id) ON DELETE CASCADE,
        title      TEXT NOT NULL,
        tags       TEXT[] NOT NULL DEFAULT '{}',
        body       TEXT NOT NULL,
        file_name  TEXT,
        image_url  TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS news_created_at_idx ON news (created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS saved_news (
        saved_id   UUID PRIMARY KEY,
        user_id    UUID NOT NULL REFERENCES users (user_id) ON DELETE CASCADE,
        news_id    UUID NOT NULL REFERENCES news (news_id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL,
        UNIQUE (user_id, news_id)
    )
    "#,
];

pub async fn connect(config: &DatabaseConfig) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = config.url.as_deref() else {
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!(max_connections = config.max_connections, "connected to postgres");
    Ok(Some(pool))
}

pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!(statements = SCHEMA.len(), "database schema ensured");
    Ok(())
}
