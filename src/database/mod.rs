//! Database module - vector store backends
//!
//! Provides storage for:
//! - Qdrant: per-session collections over gRPC
//! - PostgreSQL with pgvector: the same model in two tables
//! - In-memory: brute-force search for offline runs and tests

mod in_memory;
mod pg_store;
mod postgres;
mod qdrant;

pub use in_memory::{cosine_similarity, InMemoryStore};
pub use pg_store::PgVectorStore;
pub use postgres::{init_pool, init_pool_for_migrations, migrations, PostgresPool};
pub use qdrant::QdrantStore;

use std::sync::Arc;

use tracing::info;

use crate::config::{StorageConfig, StoreBackendType};
use crate::core::VectorStore;
use crate::error::{Error, Result};

/// Connect the configured backend
pub async fn connect_store(config: &StorageConfig) -> Result<Arc<dyn VectorStore>> {
    let dimensions = config.embedding.dimensions;

    let store: Arc<dyn VectorStore> = match config.backend {
        StoreBackendType::Qdrant => Arc::new(QdrantStore::connect(&config.qdrant, dimensions).await?),
        StoreBackendType::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .ok_or_else(|| Error::Config("storage.postgres section is required for the postgres backend".into()))?;
            let pool = init_pool(pg).await?;
            Arc::new(PgVectorStore::new(pool, dimensions))
        }
        StoreBackendType::Memory => Arc::new(InMemoryStore::new(dimensions)),
    };

    info!("Using {} vector store ({} dimensions)", store.id(), dimensions);
    Ok(store)
}
