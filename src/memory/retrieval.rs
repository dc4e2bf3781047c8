//! Memory retrieval
//!
//! Ties together embedding generation and thresholded similarity search,
//! and formats hits into the context block used by the final prompt.

use std::sync::Arc;

use tracing::{debug, info};

use super::embedding::Embedder;
use crate::config::AgentConfig;
use crate::core::{ScoredMemory, SearchQuery, VectorStore};
use crate::error::Result;

/// Context used when nothing relevant is stored
pub const NO_MEMORIES_CONTEXT: &str = "I don't have any memories about the user yet.";

/// Header of a non-empty context block
pub const MEMORIES_HEADER: &str = "Here are some things I know about the user:";

/// Runs similarity searches with the configured threshold and limit
#[derive(Clone)]
pub struct MemoryRetriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    limit: u64,
    threshold: f32,
}

impl MemoryRetriever {
    /// Create a new memory retriever
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>, config: &AgentConfig) -> Self {
        MemoryRetriever {
            store,
            embedder,
            limit: config.search_limit,
            threshold: config.similarity_threshold,
        }
    }

    /// Search active memories close to an embedding
    pub async fn search_vector(
        &self,
        collection: &str,
        vector: Vec<f32>,
        with_vectors: bool,
    ) -> Result<Vec<ScoredMemory>> {
        let query = SearchQuery::new(vector)
            .with_limit(self.limit)
            .with_threshold(self.threshold)
            .include_vectors(with_vectors);

        let hits = self.store.search(collection, &query).await?;
        debug!(
            "Search in {} returned {} hits (threshold {})",
            collection,
            hits.len(),
            self.threshold
        );
        Ok(hits)
    }

    /// Embed a text and search active memories close to it
    pub async fn search_text(&self, collection: &str, text: &str) -> Result<Vec<ScoredMemory>> {
        let vector = self.embedder.embed(text).await?;
        let hits = self.search_vector(collection, vector, false).await?;
        info!("Retrieved {} memories for {}", hits.len(), collection);
        Ok(hits)
    }
}

/// Format hits into the context block for the final prompt
pub fn format_memories(hits: &[ScoredMemory]) -> String {
    if hits.is_empty() {
        return NO_MEMORIES_CONTEXT.to_string();
    }

    let contents: Vec<&str> = hits.iter().map(|hit| hit.content()).collect();
    format!("{}\n- {}", MEMORIES_HEADER, contents.join("\n- "))
}
