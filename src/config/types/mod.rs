//! Configuration types module

pub mod provider;
pub mod storage;

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Memory orchestration settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Language model provider configuration
    #[serde(default)]
    pub provider: provider::ProviderConfig,

    /// Vector store and embedding configuration
    #[serde(default)]
    pub storage: storage::StorageConfig,
}

impl Config {
    /// Load configuration from the config file and environment variables
    ///
    /// Layering: defaults < config file (if present) < environment.
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

/// Memory orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Minimum cosine similarity for a search hit to count as a match (inclusive)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// Maximum number of matches returned per query
    #[serde(default = "default_search_limit")]
    pub search_limit: u64,
    /// What to do when storing a new memory fails
    #[serde(default)]
    pub on_write_failure: WriteFailurePolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            similarity_threshold: default_similarity_threshold(),
            search_limit: default_search_limit(),
            on_write_failure: WriteFailurePolicy::default(),
        }
    }
}

fn default_similarity_threshold() -> f32 {
    0.35
}

fn default_search_limit() -> u64 {
    5
}

/// Policy applied when inserting new memories fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteFailurePolicy {
    /// Tell the user the memory was not saved and end the turn
    #[default]
    Report,
    /// Surface a fatal error so the caller terminates
    Abort,
}

impl std::str::FromStr for WriteFailurePolicy {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "report" => Ok(WriteFailurePolicy::Report),
            "abort" | "exit" => Ok(WriteFailurePolicy::Abort),
            _ => Err(crate::error::Error::Config(format!(
                "Invalid write failure policy: {}. Valid options: report, abort",
                s
            ))),
        }
    }
}

impl std::fmt::Display for WriteFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteFailurePolicy::Report => write!(f, "report"),
            WriteFailurePolicy::Abort => write!(f, "abort"),
        }
    }
}
