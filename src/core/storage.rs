//! Storage traits - Abstract interface for vector stores
//!
//! A store holds memory records in per-session collections. Records are
//! never removed: forgetting flips the payload status to `deleted`, and
//! searches only ever see `active` records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Lifecycle tag stored in every memory payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryStatus {
    /// Visible to searches
    Active,
    /// Soft-deleted; kept in storage but never returned by searches
    Deleted,
}

impl MemoryStatus {
    /// Wire value stored in the payload
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryStatus::Active => "active",
            MemoryStatus::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for MemoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(MemoryStatus::Active),
            "deleted" => Ok(MemoryStatus::Deleted),
            other => Err(Error::VectorStore(format!("Unknown memory status: {}", other))),
        }
    }
}

/// Payload stored alongside each vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPayload {
    /// Lifecycle tag
    pub status: MemoryStatus,
    /// The remembered fact
    pub content: String,
}

impl MemoryPayload {
    /// Payload for a freshly remembered fact
    pub fn active(content: impl Into<String>) -> Self {
        MemoryPayload {
            status: MemoryStatus::Active,
            content: content.into(),
        }
    }
}

/// A record as read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMemory {
    /// Store-assigned identifier
    pub id: Uuid,
    /// Status and content
    pub payload: MemoryPayload,
    /// The embedding, when the search asked for it
    pub vector: Option<Vec<f32>>,
}

/// A search hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMemory {
    /// The matched record
    pub memory: StoredMemory,
    /// Cosine similarity to the query, in [-1, 1]
    pub score: f32,
}

impl ScoredMemory {
    /// Content of the matched record
    pub fn content(&self) -> &str {
        &self.memory.payload.content
    }
}

/// Parameters of a similarity search
///
/// Only active records are considered. Hits scoring below `score_threshold`
/// are dropped (the bound is inclusive) and at most `limit` hits are returned,
/// best first.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Query embedding
    pub vector: Vec<f32>,
    /// Maximum number of hits
    pub limit: u64,
    /// Minimum cosine similarity, inclusive
    pub score_threshold: f32,
    /// Return the stored vectors with each hit
    pub with_vectors: bool,
}

impl SearchQuery {
    /// Create a query with the default limit (5) and threshold (0.35)
    pub fn new(vector: Vec<f32>) -> Self {
        SearchQuery {
            vector,
            limit: 5,
            score_threshold: 0.35,
            with_vectors: false,
        }
    }

    /// Set the result limit
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Set the similarity threshold
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Ask for stored vectors in the results
    pub fn include_vectors(mut self, with_vectors: bool) -> Self {
        self.with_vectors = with_vectors;
        self
    }
}

/// Abstract interface for vector storage
///
/// Every operation is scoped by a collection name; the orchestrator uses the
/// session identifier.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the backend ID
    fn id(&self) -> &str;

    /// Vector dimensionality of collections created by this store
    fn dimensions(&self) -> usize;

    /// Create the collection if it does not exist (cosine distance)
    async fn ensure_collection(&self, collection: &str) -> Result<()>;

    /// Store each vector/payload pair as a new record
    ///
    /// Returns the store-assigned identifiers in input order. There is no
    /// upsert-by-content: every call creates new records.
    async fn insert(
        &self,
        collection: &str,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<MemoryPayload>,
    ) -> Result<Vec<Uuid>>;

    /// Similarity search over active records
    async fn search(&self, collection: &str, query: &SearchQuery) -> Result<Vec<ScoredMemory>>;

    /// Mark a record as deleted in place
    async fn soft_delete(&self, collection: &str, id: Uuid) -> Result<()>;

    /// Count records, optionally only those with the given status
    async fn count(&self, collection: &str, status: Option<MemoryStatus>) -> Result<u64>;

    /// Health check
    async fn health_check(&self) -> Result<bool>;
}

/// Check the parallel-array and dimensionality invariants of an insert
pub fn validate_insert(
    dimensions: usize,
    vectors: &[Vec<f32>],
    payloads: &[MemoryPayload],
) -> Result<()> {
    if vectors.len() != payloads.len() {
        return Err(Error::InvalidInput(format!(
            "{} vectors but {} payloads",
            vectors.len(),
            payloads.len()
        )));
    }

    if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
        return Err(Error::InvalidInput(format!(
            "Expected {}-dimension vectors, got {}",
            dimensions,
            bad.len()
        )));
    }

    Ok(())
}
