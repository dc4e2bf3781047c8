//! Storage configuration types
//!
//! Configuration for the vector store backends and the embedding model.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Vector store backend
    #[serde(default)]
    pub backend: StoreBackendType,
    /// Qdrant configuration
    #[serde(default)]
    pub qdrant: QdrantConfig,
    /// PostgreSQL configuration
    pub postgres: Option<PostgresConfig>,
    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Vector store backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendType {
    /// Qdrant over gRPC (default)
    #[default]
    Qdrant,
    /// PostgreSQL with pgvector
    Postgres,
    /// In-process (no persistence)
    Memory,
}

impl std::str::FromStr for StoreBackendType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "qdrant" => Ok(StoreBackendType::Qdrant),
            "postgres" | "pgvector" => Ok(StoreBackendType::Postgres),
            "memory" | "in-memory" => Ok(StoreBackendType::Memory),
            _ => Err(crate::error::Error::Config(format!(
                "Invalid store backend: {}. Valid options: qdrant, postgres, memory",
                s
            ))),
        }
    }
}

impl std::fmt::Display for StoreBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackendType::Qdrant => write!(f, "qdrant"),
            StoreBackendType::Postgres => write!(f, "postgres"),
            StoreBackendType::Memory => write!(f, "memory"),
        }
    }
}

/// Qdrant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// gRPC endpoint
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    /// API key
    #[serde(skip_serializing, default)]
    pub api_key: Option<SecretString>,
    /// Request timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub timeout_secs: u64,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        QdrantConfig {
            url: default_qdrant_url(),
            api_key: None,
            timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".to_string()
}

/// PostgreSQL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Database URL
    #[serde(skip_serializing)]
    pub url: SecretString,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl PostgresConfig {
    /// Defaults around the given connection URL
    pub fn with_url(url: SecretString) -> Self {
        PostgresConfig {
            url,
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Embedding dimensions
    #[serde(default = "default_embedding_dims")]
    pub dimensions: usize,
    /// Texts encoded per model call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Cached embeddings kept in process
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Show progress while the model downloads on first use
    #[serde(default)]
    pub show_download_progress: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            model: default_embedding_model(),
            dimensions: default_embedding_dims(),
            batch_size: default_batch_size(),
            cache_capacity: default_cache_capacity(),
            show_download_progress: false,
        }
    }
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_embedding_dims() -> usize {
    384
}

fn default_batch_size() -> usize {
    50
}

fn default_cache_capacity() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.backend, StoreBackendType::Qdrant);
        assert_eq!(config.qdrant.url, "http://localhost:6334");
        assert!(config.postgres.is_none());
    }

    #[test]
    fn test_embedding_config_default() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 50);
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("pgvector".parse::<StoreBackendType>().unwrap(), StoreBackendType::Postgres);
        assert_eq!("Memory".parse::<StoreBackendType>().unwrap(), StoreBackendType::Memory);
        assert!("redis".parse::<StoreBackendType>().is_err());
    }
}
