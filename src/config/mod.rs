//! Configuration module
//!
//! - types/mod.rs: Core configuration types (Config, AgentConfig)
//! - types/provider.rs: Chat completion provider configuration
//! - types/storage.rs: Vector store and embedding configuration
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

pub use types::{AgentConfig, Config, WriteFailurePolicy};

pub use types::provider::{ChatEndpoint, OpenAIConfig, OpenRouterConfig, ProviderConfig};

pub use types::storage::{
    EmbeddingConfig, PostgresConfig, QdrantConfig, StorageConfig, StoreBackendType,
};

pub use io::{apply_env_overrides, load_config, load_config_from_path, save_config};
pub use paths::{config_dir, config_path};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
