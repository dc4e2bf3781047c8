//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use secrecy::SecretString;
use tracing::warn;

use super::types::provider::{OpenAIConfig, OpenRouterConfig};
use super::types::storage::{PostgresConfig, StoreBackendType};
use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: Config = if path.extension().map_or(false, |ext| ext == "json") {
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().map_or(false, |ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads `.env` first, then overlays any set variables. Env vars have the
/// highest precedence: defaults < file < env.
pub fn apply_env_overrides(config: &mut Config) {
    dotenvy::dotenv().ok();
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides from an arbitrary variable lookup
pub(crate) fn apply_overrides_from<F>(config: &mut Config, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    // OpenAI
    if let Some(api_key) = var("OPENAI_API_KEY") {
        let openai = config
            .provider
            .openai
            .get_or_insert_with(|| OpenAIConfig::with_api_key(SecretString::from(String::new())));
        openai.api_key = SecretString::from(api_key);
    }
    if let Some(model) = var("OPENAI_MODEL") {
        if let Some(ref mut openai) = config.provider.openai {
            openai.default_model = model;
        }
    }
    if let Some(url) = var("OPENAI_BASE_URL") {
        if let Some(ref mut openai) = config.provider.openai {
            openai.base_url = url;
        }
    }

    // OpenRouter
    if let Some(api_key) = var("OPENROUTER_API_KEY") {
        let or = config
            .provider
            .openrouter
            .get_or_insert_with(|| OpenRouterConfig::with_api_key(SecretString::from(String::new())));
        or.api_key = SecretString::from(api_key);
        if config.provider.openai.is_none() {
            config.provider.default = "openrouter".to_string();
        }
    }
    if let Some(model) = var("OPENROUTER_MODEL") {
        if let Some(ref mut or) = config.provider.openrouter {
            or.default_model = model;
        }
    }
    if let Some(provider) = var("MEMAGENT_PROVIDER") {
        config.provider.default = provider.trim().to_lowercase();
    }

    // Storage. DATABASE_URL only configures Postgres; selecting it takes MEMAGENT_STORE
    if let Some(database_url) = var("DATABASE_URL") {
        let pg = config
            .storage
            .postgres
            .get_or_insert_with(|| PostgresConfig::with_url(SecretString::from(String::new())));
        pg.url = SecretString::from(database_url);
    }
    if let Some(url) = var("QDRANT_URL") {
        config.storage.qdrant.url = url;
    }
    if let Some(api_key) = var("QDRANT_API_KEY") {
        config.storage.qdrant.api_key = Some(SecretString::from(api_key));
    }
    if let Some(backend) = var("MEMAGENT_STORE") {
        match backend.parse::<StoreBackendType>() {
            Ok(backend) => config.storage.backend = backend,
            Err(e) => warn!("Ignoring MEMAGENT_STORE: {}", e),
        }
    }

    // Memory policy
    if let Some(threshold) = var("MEMAGENT_SIMILARITY_THRESHOLD") {
        match threshold.parse() {
            Ok(v) => config.agent.similarity_threshold = v,
            Err(e) => warn!("Ignoring MEMAGENT_SIMILARITY_THRESHOLD: {}", e),
        }
    }
    if let Some(limit) = var("MEMAGENT_SEARCH_LIMIT") {
        match limit.parse() {
            Ok(v) => config.agent.search_limit = v,
            Err(e) => warn!("Ignoring MEMAGENT_SEARCH_LIMIT: {}", e),
        }
    }
    if let Some(policy) = var("MEMAGENT_ON_WRITE_FAILURE") {
        match policy.parse() {
            Ok(policy) => config.agent.on_write_failure = policy,
            Err(e) => warn!("Ignoring MEMAGENT_ON_WRITE_FAILURE: {}", e),
        }
    }
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::to_string_pretty(config).map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config).map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriteFailurePolicy;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn overrides(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = Config::default();
        apply_overrides_from(&mut config, |key| vars.get(key).cloned());
        config
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_config.json");

        let mut config = Config::default();
        config.agent.search_limit = 7;
        save_config(&config, &path).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.agent.search_limit, 7);
        assert_eq!(loaded.storage.backend, StoreBackendType::Qdrant);
    }

    #[test]
    fn test_load_toml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[agent]\nsimilarity_threshold = 0.5\non_write_failure = \"abort\"\n\n[storage]\nbackend = \"memory\"\n",
        )
        .unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.agent.similarity_threshold, 0.5);
        assert_eq!(loaded.agent.on_write_failure, WriteFailurePolicy::Abort);
        assert_eq!(loaded.storage.backend, StoreBackendType::Memory);
    }

    #[test]
    fn test_invalid_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ agent: ").unwrap();
        assert!(matches!(load_config_from_path(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_openai_env_override() {
        let config = overrides(&[("OPENAI_API_KEY", "sk-env"), ("OPENAI_MODEL", "gpt-4o")]);
        let openai = config.provider.openai.unwrap();
        assert_eq!(openai.api_key.expose_secret(), "sk-env");
        assert_eq!(openai.default_model, "gpt-4o");
        assert_eq!(config.provider.default, "openai");
    }

    #[test]
    fn test_openrouter_becomes_default_without_openai() {
        let config = overrides(&[("OPENROUTER_API_KEY", "or-key")]);
        assert_eq!(config.provider.default, "openrouter");
        assert!(config.provider.resolve().is_ok());
    }

    #[test]
    fn test_store_overrides() {
        let config = overrides(&[
            ("DATABASE_URL", "postgres://localhost/memagent"),
            ("QDRANT_URL", "http://qdrant:6334"),
        ]);
        assert_eq!(config.storage.qdrant.url, "http://qdrant:6334");
        assert!(config.storage.postgres.is_some());

        let config = overrides(&[
            ("DATABASE_URL", "postgres://localhost/memagent"),
            ("MEMAGENT_STORE", "memory"),
        ]);
        assert_eq!(config.storage.backend, StoreBackendType::Memory);
    }

    #[test]
    fn test_database_url_keeps_default_backend() {
        let config = overrides(&[("DATABASE_URL", "postgres://localhost/memagent")]);
        assert_eq!(config.storage.backend, StoreBackendType::Qdrant);
        assert_eq!(
            config.storage.postgres.unwrap().url.expose_secret(),
            "postgres://localhost/memagent"
        );

        let config = overrides(&[
            ("DATABASE_URL", "postgres://localhost/memagent"),
            ("MEMAGENT_STORE", "postgres"),
        ]);
        assert_eq!(config.storage.backend, StoreBackendType::Postgres);
    }

    #[test]
    fn test_policy_overrides_ignore_garbage() {
        let config = overrides(&[
            ("MEMAGENT_SIMILARITY_THRESHOLD", "0.6"),
            ("MEMAGENT_SEARCH_LIMIT", "many"),
            ("MEMAGENT_ON_WRITE_FAILURE", "abort"),
        ]);
        assert_eq!(config.agent.similarity_threshold, 0.6);
        assert_eq!(config.agent.search_limit, 5);
        assert_eq!(config.agent.on_write_failure, WriteFailurePolicy::Abort);
    }
}
