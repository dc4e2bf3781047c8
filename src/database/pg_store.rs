//! Vector store backed by PostgreSQL + pgvector
//!
//! Collections are rows in `memory_collections`; records live in
//! `memory_records` with a `status` column flipped in place on delete.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::FromRow;
use tracing::debug;
use uuid::Uuid;

use crate::core::{
    storage::validate_insert, MemoryPayload, MemoryStatus, ScoredMemory, SearchQuery, StoredMemory, VectorStore,
};
use crate::database::PostgresPool;
use crate::error::{Error, Result};

#[derive(FromRow)]
struct MemoryRow {
    id: Uuid,
    content: String,
    status: String,
    embedding: Vector,
    similarity: f32,
}

impl MemoryRow {
    fn into_scored(self, with_vectors: bool) -> Result<ScoredMemory> {
        Ok(ScoredMemory {
            memory: StoredMemory {
                id: self.id,
                payload: MemoryPayload {
                    status: self.status.parse()?,
                    content: self.content,
                },
                vector: with_vectors.then(|| self.embedding.to_vec()),
            },
            score: self.similarity,
        })
    }
}

/// pgvector-backed memory store
#[derive(Clone)]
pub struct PgVectorStore {
    pg_pool: PostgresPool,
    dimensions: usize,
}

impl PgVectorStore {
    /// Create a new store over an initialized pool
    pub fn new(pg_pool: PostgresPool, dimensions: usize) -> Self {
        PgVectorStore { pg_pool, dimensions }
    }

    async fn require_collection(&self, collection: &str) -> Result<()> {
        let found: Option<(String,)> = sqlx::query_as(
            "SELECT name FROM memory_collections WHERE name = $1"
        )
        .bind(collection)
        .fetch_optional(&self.pg_pool)
        .await?;

        found
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Collection {} does not exist", collection)))
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    fn id(&self) -> &str {
        "postgres"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        sqlx::query(r#"
            INSERT INTO memory_collections (name, dimensions)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
        "#)
        .bind(collection)
        .bind(self.dimensions as i32)
        .execute(&self.pg_pool)
        .await?;

        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<MemoryPayload>,
    ) -> Result<Vec<Uuid>> {
        validate_insert(self.dimensions, &vectors, &payloads)?;
        self.require_collection(collection).await?;

        let mut tx = self.pg_pool.begin().await?;
        let mut ids = Vec::with_capacity(vectors.len());

        for (vector, payload) in vectors.into_iter().zip(payloads) {
            let id = Uuid::new_v4();
            sqlx::query(r#"
                INSERT INTO memory_records (id, collection, content, status, embedding)
                VALUES ($1, $2, $3, $4, $5)
            "#)
            .bind(id)
            .bind(collection)
            .bind(&payload.content)
            .bind(payload.status.as_str())
            .bind(Vector::from(vector))
            .execute(&mut *tx)
            .await?;
            ids.push(id);
        }

        tx.commit().await?;
        debug!("Inserted {} records into {}", ids.len(), collection);
        Ok(ids)
    }

    async fn search(&self, collection: &str, query: &SearchQuery) -> Result<Vec<ScoredMemory>> {
        self.require_collection(collection).await?;
        let embedding = Vector::from(query.vector.clone());

        let rows: Vec<MemoryRow> = sqlx::query_as(r#"
            SELECT id, content, status, embedding,
                   (1 - (embedding <=> $1))::real AS similarity
            FROM memory_records
            WHERE collection = $2
              AND status = 'active'
              AND 1 - (embedding <=> $1) >= $3
            ORDER BY embedding <=> $1
            LIMIT $4
        "#)
        .bind(&embedding)
        .bind(collection)
        .bind(query.score_threshold as f64)
        .bind(query.limit as i64)
        .fetch_all(&self.pg_pool)
        .await?;

        rows.into_iter()
            .map(|row| row.into_scored(query.with_vectors))
            .collect()
    }

    async fn soft_delete(&self, collection: &str, id: Uuid) -> Result<()> {
        let result = sqlx::query(r#"
            UPDATE memory_records SET status = $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
        "#)
        .bind(collection)
        .bind(id)
        .bind(MemoryStatus::Deleted.as_str())
        .execute(&self.pg_pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Memory {} not found in {}", id, collection)));
        }
        Ok(())
    }

    async fn count(&self, collection: &str, status: Option<MemoryStatus>) -> Result<u64> {
        self.require_collection(collection).await?;

        let (n,): (i64,) = sqlx::query_as(r#"
            SELECT COUNT(*) FROM memory_records
            WHERE collection = $1 AND ($2::text IS NULL OR status = $2)
        "#)
        .bind(collection)
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.pg_pool)
        .await?;

        Ok(n as u64)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(sqlx::query("SELECT 1").execute(&self.pg_pool).await.is_ok())
    }
}
