//! Local embedding generation via fastembed
//!
//! Defaults to all-MiniLM-L6-v2 (384 dimensions). The model auto-downloads
//! on first use.

use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, info};

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Turns text into fixed-length vectors
///
/// Output is order-matched to the input. A failure fails the whole call:
/// there are no partial results.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every produced vector
    fn dimensions(&self) -> usize;

    /// Embed a non-empty batch of texts
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("No embedding returned".into()))
    }
}

/// Local embedding service wrapping fastembed
#[derive(Clone)]
pub struct EmbeddingService {
    model: Arc<TextEmbedding>,
    dimensions: usize,
    batch_size: usize,
}

impl EmbeddingService {
    /// Load the configured model
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_kind = model_from_name(&config.model)?;
        info!("Loading embedding model {}", config.model);

        let model = TextEmbedding::try_new(
            InitOptions::new(model_kind).with_show_download_progress(config.show_download_progress),
        )
        .map_err(|e| Error::Embedding(format!("Failed to init embedding model: {}", e)))?;

        Ok(EmbeddingService {
            model: Arc::new(model),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        })
    }
}

#[async_trait]
impl Embedder for EmbeddingService {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(Error::InvalidInput("Cannot embed an empty batch".into()));
        }

        let model = self.model.clone();
        let batch_size = self.batch_size;
        let expected = texts.len();
        debug!("Embedding {} texts in batches of {}", expected, batch_size);

        let embeddings = tokio::task::spawn_blocking(move || {
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| Error::Embedding(format!("Batch embedding error: {}", e)))
        })
        .await
        .map_err(|e| Error::Internal(format!("Embedding task join error: {}", e)))??;

        check_embeddings(&embeddings, expected, self.dimensions)?;
        Ok(embeddings)
    }
}

/// Map a configured model name to a fastembed model
fn model_from_name(name: &str) -> Result<EmbeddingModel> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "multilingual-e5-small" | "intfloat/multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
        "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(Error::Config(format!(
            "Unsupported embedding model: {}. Valid options: all-MiniLM-L6-v2, multilingual-e5-small, bge-small-en-v1.5",
            other
        ))),
    }
}

/// Verify count and dimensionality of a model's output
fn check_embeddings(embeddings: &[Vec<f32>], expected: usize, dimensions: usize) -> Result<()> {
    if embeddings.len() != expected {
        return Err(Error::Embedding(format!(
            "Expected {} embeddings, got {}",
            expected,
            embeddings.len()
        )));
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
        return Err(Error::Embedding(format!(
            "Expected {}-dimension embeddings, got {}",
            dimensions,
            bad.len()
        )));
    }
    Ok(())
}
