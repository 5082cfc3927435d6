use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::filter::FilterError;

/// Errors from the document store
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Schema for the single JSONB documents table. Every statement is idempotent.
const MIGRATIONS: [&str; 4] = [
    r#"CREATE TABLE IF NOT EXISTS "documents" (
        "id" UUID PRIMARY KEY,
        "collection" TEXT NOT NULL,
        "organization_id" UUID NULL,
        "body" JSONB NOT NULL DEFAULT '{}'::jsonb,
        "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
        "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE INDEX IF NOT EXISTS "documents_collection_org_idx"
        ON "documents" ("collection", "organization_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "documents_created_at_idx"
        ON "documents" ("collection", "created_at", "id")"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS "documents_users_email_idx"
        ON "documents" (lower("body" ->> 'email')) WHERE "collection" = 'users'"#,
];

/// Builds the Postgres pool and keeps the schema current
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config.url.as_deref().ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(
            host = parsed.host_str().unwrap_or("localhost"),
            database = parsed.path().trim_start_matches('/'),
            max_connections = config.max_connections,
            "Created database pool"
        );

        if config.run_migrations {
            Self::migrate(&pool).await?;
        }
        Ok(pool)
    }

    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(pool).await?;
        }
        info!("Database schema is current");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[tokio::test]
    async fn rejects_missing_and_foreign_urls() {
        let mut config = AppConfig::development().database;
        config.url = None;
        assert!(matches!(DatabaseManager::connect(&config).await, Err(DatabaseError::ConfigMissing(_))));

        config.url = Some("mysql://localhost/propdesk".to_string());
        assert!(matches!(DatabaseManager::connect(&config).await, Err(DatabaseError::InvalidDatabaseUrl)));
    }
}
