//! PostgreSQL database connection and migrations

use crate::config::PostgresConfig;
use crate::error::{Error, Result};
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// PostgreSQL connection pool type alias
pub type PostgresPool = PgPool;

/// Initialize the PostgreSQL connection pool
pub async fn init_pool(config: &PostgresConfig) -> Result<PostgresPool> {
    init_pool_with_options(config, true).await
}

/// Initialize the PostgreSQL connection pool without pgvector check
/// Use this for running migrations before pgvector is installed
pub async fn init_pool_for_migrations(config: &PostgresConfig) -> Result<PostgresPool> {
    init_pool_with_options(config, false).await
}

async fn init_pool_with_options(config: &PostgresConfig, require_pgvector: bool) -> Result<PostgresPool> {
    info!("Initializing PostgreSQL connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(config.url.expose_secret())
        .await?;

    verify_database(&pool, require_pgvector).await?;

    info!("PostgreSQL connection pool initialized successfully");
    Ok(pool)
}

async fn verify_database(pool: &PgPool, require_pgvector: bool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;

    if require_pgvector {
        let result: Option<(String,)> = sqlx::query_as(
            "SELECT extname FROM pg_extension WHERE extname = 'vector'"
        )
        .fetch_optional(pool)
        .await?;

        if result.is_none() {
            return Err(Error::Database(sqlx::Error::Configuration(
                "pgvector extension is not installed. Run: memagent migrate".into()
            )));
        }
    }

    Ok(())
}

/// Database migrations
pub mod migrations {
    use super::*;
    use tracing::warn;

    /// Run all migrations
    ///
    /// `dimensions` fixes the width of the embedding column.
    pub async fn run(pool: &PgPool, dimensions: usize) -> Result<()> {
        info!("Running database migrations");

        // Requires superuser or the extension already being available
        match sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(pool)
            .await
        {
            Ok(_) => info!("pgvector extension enabled"),
            Err(e) => {
                warn!("Could not create pgvector extension: {}", e);
                warn!("Run as superuser: CREATE EXTENSION vector;");
            }
        }

        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS memory_collections (
                name TEXT PRIMARY KEY,
                dimensions INTEGER NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#)
        .execute(pool)
        .await?;

        sqlx::query(&format!(r#"
            CREATE TABLE IF NOT EXISTS memory_records (
                id UUID PRIMARY KEY,
                collection TEXT NOT NULL REFERENCES memory_collections(name) ON DELETE CASCADE,
                content TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'deleted')),
                embedding vector({}) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#, dimensions))
        .execute(pool)
        .await?;

        // Each index must be a separate query for SQLx
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_memory_records_collection_status ON memory_records(collection, status)"
        )
        .execute(pool)
        .await?;

        sqlx::query(r#"
            CREATE INDEX IF NOT EXISTS idx_memory_records_embedding ON memory_records
            USING hnsw (embedding vector_cosine_ops)
        "#)
        .execute(pool)
        .await
        .ok(); // hnsw needs pgvector >= 0.5.0; search falls back to a scan

        info!("Database migrations completed");
        Ok(())
    }
}
