//! Configuration validation
//!
//! Validates configuration and reports issues.

use url::Url;

use super::types::storage::StoreBackendType;
use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_agent_config(config, result);
    result = validate_provider_config(config, result);
    result = validate_storage_config(config, result);

    result
}

fn validate_agent_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let threshold = config.agent.similarity_threshold;
    if !(-1.0..=1.0).contains(&threshold) {
        result = result.with_error(
            ValidationIssue::new(
                "agent.similarity_threshold",
                format!("Cosine similarity threshold {} is outside [-1, 1]", threshold),
            )
            .with_suggestion("Use a value such as 0.35"),
        );
    }

    if config.agent.search_limit == 0 {
        result = result.with_error(ValidationIssue::new(
            "agent.search_limit",
            "Search limit must be at least 1",
        ));
    }

    result
}

fn validate_provider_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    match config.provider.resolve() {
        Err(e) => {
            result = result.with_error(
                ValidationIssue::new("provider", e.to_string())
                    .with_suggestion("Set OPENAI_API_KEY or OPENROUTER_API_KEY"),
            );
        }
        Ok(endpoint) => {
            if !config.provider.has_api_key() {
                result = result.with_error(
                    ValidationIssue::new(
                        format!("provider.{}.api_key", endpoint.provider),
                        "API key is empty",
                    )
                    .with_suggestion("Set OPENAI_API_KEY or OPENROUTER_API_KEY"),
                );
            }
            if let Err(e) = Url::parse(&endpoint.base_url) {
                result = result.with_error(ValidationIssue::new(
                    format!("provider.{}.base_url", endpoint.provider),
                    format!("Invalid URL: {}", e),
                ));
            }
        }
    }

    result
}

fn validate_storage_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let storage = &config.storage;

    match storage.backend {
        StoreBackendType::Qdrant => {
            if let Err(e) = Url::parse(&storage.qdrant.url) {
                result = result.with_error(ValidationIssue::new(
                    "storage.qdrant.url",
                    format!("Invalid URL: {}", e),
                ));
            }
        }
        StoreBackendType::Postgres => {
            if storage.postgres.is_none() {
                result = result.with_error(
                    ValidationIssue::new("storage.postgres", "Postgres backend selected but not configured")
                        .with_suggestion("Set DATABASE_URL"),
                );
            }
        }
        StoreBackendType::Memory => {
            result = result.with_warning(ValidationIssue::new(
                "storage.backend",
                "In-memory store selected; memories are lost when the process exits",
            ));
        }
    }

    if storage.embedding.model == "all-MiniLM-L6-v2" && storage.embedding.dimensions != 384 {
        result = result.with_error(ValidationIssue::new(
            "storage.embedding.dimensions",
            format!(
                "all-MiniLM-L6-v2 produces 384-dimension vectors, not {}",
                storage.embedding.dimensions
            ),
        ));
    }

    if storage.embedding.batch_size == 0 {
        result = result.with_error(ValidationIssue::new(
            "storage.embedding.batch_size",
            "Batch size must be at least 1",
        ));
    }

    if storage.embedding.cache_capacity == 0 {
        result = result.with_warning(
            ValidationIssue::new(
                "storage.embedding.cache_capacity",
                "Embedding cache is disabled; every text is re-embedded",
            )
            .with_suggestion("Set cache_capacity to at least 1"),
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAIConfig;
    use secrecy::SecretString;

    fn configured() -> Config {
        let mut config = Config::default();
        config.provider.openai = Some(OpenAIConfig::with_api_key(SecretString::from("sk-test")));
        config
    }

    #[test]
    fn test_configured_default_is_valid() {
        let result = validate_config(&configured());
        assert!(result.valid, "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn test_missing_provider_is_error() {
        let result = validate_config(&Config::default());
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.path == "provider"));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut config = configured();
        config.agent.similarity_threshold = 1.5;
        let result = validate_config(&config);
        assert!(result.errors.iter().any(|e| e.path == "agent.similarity_threshold"));
    }

    #[test]
    fn test_postgres_without_section() {
        let mut config = configured();
        config.storage.backend = StoreBackendType::Postgres;
        let result = validate_config(&config);
        assert!(result.errors.iter().any(|e| e.path == "storage.postgres"));
    }

    #[test]
    fn test_memory_backend_warns() {
        let mut config = configured();
        config.storage.backend = StoreBackendType::Memory;
        let result = validate_config(&config);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_zero_cache_capacity_warns() {
        let mut config = configured();
        config.storage.embedding.cache_capacity = 0;
        let result = validate_config(&config);
        assert!(result.valid);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.path == "storage.embedding.cache_capacity"));
    }
}
