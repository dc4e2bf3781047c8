//! Process-local vector store
//!
//! Brute-force cosine search over records held in memory. Nothing survives
//! the process; used for offline runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::{
    storage::validate_insert, MemoryPayload, MemoryStatus, ScoredMemory, SearchQuery, StoredMemory, VectorStore,
};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
struct Record {
    id: Uuid,
    vector: Vec<f32>,
    payload: MemoryPayload,
}

/// In-memory vector store
pub struct InMemoryStore {
    dimensions: usize,
    collections: RwLock<HashMap<String, Vec<Record>>>,
}

impl InMemoryStore {
    /// Create an empty store for vectors of the given length
    pub fn new(dimensions: usize) -> Self {
        InMemoryStore {
            dimensions,
            collections: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn id(&self) -> &str {
        "memory"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<MemoryPayload>,
    ) -> Result<Vec<Uuid>> {
        validate_insert(self.dimensions, &vectors, &payloads)?;

        let mut collections = self.collections.write().await;
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| Error::NotFound(format!("Collection {} does not exist", collection)))?;

        let mut ids = Vec::with_capacity(vectors.len());
        for (vector, payload) in vectors.into_iter().zip(payloads) {
            let id = Uuid::new_v4();
            records.push(Record { id, vector, payload });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn search(&self, collection: &str, query: &SearchQuery) -> Result<Vec<ScoredMemory>> {
        if query.vector.len() != self.dimensions {
            return Err(Error::InvalidInput(format!(
                "Expected {}-dimension query vector, got {}",
                self.dimensions,
                query.vector.len()
            )));
        }

        let collections = self.collections.read().await;
        let records = collections
            .get(collection)
            .ok_or_else(|| Error::NotFound(format!("Collection {} does not exist", collection)))?;

        let mut hits: Vec<ScoredMemory> = records
            .iter()
            .filter(|r| r.payload.status == MemoryStatus::Active)
            .map(|r| (r, cosine_similarity(&query.vector, &r.vector)))
            .filter(|(_, score)| *score >= query.score_threshold)
            .map(|(r, score)| ScoredMemory {
                memory: StoredMemory {
                    id: r.id,
                    payload: r.payload.clone(),
                    vector: query.with_vectors.then(|| r.vector.clone()),
                },
                score,
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(query.limit as usize);
        Ok(hits)
    }

    async fn soft_delete(&self, collection: &str, id: Uuid) -> Result<()> {
        let mut collections = self.collections.write().await;
        let record = collections
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| Error::NotFound(format!("Memory {} not found in {}", id, collection)))?;

        record.payload.status = MemoryStatus::Deleted;
        Ok(())
    }

    async fn count(&self, collection: &str, status: Option<MemoryStatus>) -> Result<u64> {
        let collections = self.collections.read().await;
        let records = collections
            .get(collection)
            .ok_or_else(|| Error::NotFound(format!("Collection {} does not exist", collection)))?;

        let n = records
            .iter()
            .filter(|r| status.map_or(true, |s| r.payload.status == s))
            .count();
        Ok(n as u64)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Cosine similarity; zero-length vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
