//! In-process embedding cache
//!
//! Uses moka async cache (Send + Sync, TTL-based eviction). Repeated
//! subjects and queries skip the model entirely.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use super::embedding::Embedder;
use crate::error::{Error, Result};

/// Embedder wrapper that caches vectors by exact text
#[derive(Clone)]
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    embeddings: Cache<String, Vec<f32>>,
}

impl CachedEmbedder {
    /// Wrap an embedder with a cache of the given capacity
    pub fn new(inner: Arc<dyn Embedder>, capacity: u64) -> Self {
        CachedEmbedder {
            inner,
            embeddings: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(Duration::from_secs(30 * 60))
                .build(),
        }
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut slots: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut misses: Vec<String> = Vec::new();

        for text in &texts {
            let cached = self.embeddings.get(text).await;
            if cached.is_none() && !misses.contains(text) {
                misses.push(text.clone());
            }
            slots.push(cached);
        }

        // Fresh vectors are served from this map; the cache may drop them at once
        let mut fresh: HashMap<String, Vec<f32>> = HashMap::with_capacity(misses.len());
        if !misses.is_empty() {
            debug!("Embedding cache: {} hits, {} misses", texts.len() - misses.len(), misses.len());
            let vectors = self.inner.embed_batch(misses.clone()).await?;
            if vectors.len() != misses.len() {
                return Err(Error::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    misses.len(),
                    vectors.len()
                )));
            }
            for (text, vector) in misses.into_iter().zip(vectors) {
                self.embeddings.insert(text.clone(), vector.clone()).await;
                fresh.insert(text, vector);
            }
        }

        texts
            .iter()
            .zip(slots)
            .map(|(text, slot)| match slot {
                Some(vector) => Ok(vector),
                None => fresh
                    .get(text)
                    .cloned()
                    .ok_or_else(|| Error::Embedding(format!("No embedding produced for {:?}", text))),
            })
            .collect()
    }
}
