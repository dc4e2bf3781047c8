//! # memagent
//!
//! A conversational agent with per-user long-term memory.
//!
//! ## Features
//!
//! - **Intent-driven memory:** Each turn checks for facts to forget, facts to
//!   remember, and whether stored memories are needed to answer
//! - **Soft delete:** Forgotten memories are flagged, never physically removed
//! - **Local embeddings:** all-MiniLM-L6-v2 via fastembed, 384 dimensions
//! - **Pluggable vector stores:** Qdrant, PostgreSQL + pgvector, or in-memory
//! - **OpenAI-compatible LLMs:** OpenAI or OpenRouter chat completions

pub mod agent;
pub mod config;
pub mod core;
pub mod database;
pub mod error;
pub mod memory;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{MemoryOrchestrator, TurnReport};
pub use config::Config;
pub use error::{Error, Result};
pub use session::{Session, SessionSummary};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
