//! Core module - Fundamental traits and types
//!
//! - Provider trait for language model backends
//! - Storage trait and memory record types for vector stores

pub mod provider;
pub mod storage;

pub use provider::LlmProvider;
pub use storage::{
    MemoryPayload, MemoryStatus, ScoredMemory, SearchQuery, StoredMemory, VectorStore,
};
