//! Memory module - embedding generation, caching, and retrieval
//!
//! Local embeddings (fastembed), in-process caching (moka), and
//! thresholded similarity search over the configured vector store.

pub mod cache;
pub mod embedding;
pub mod retrieval;

pub use cache::CachedEmbedder;
pub use embedding::{Embedder, EmbeddingService};
pub use retrieval::{format_memories, MemoryRetriever, MEMORIES_HEADER, NO_MEMORIES_CONTEXT};
