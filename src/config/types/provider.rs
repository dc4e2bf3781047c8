//! Provider configuration types
//!
//! Configuration for OpenAI-compatible chat completion providers.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Default provider ("openai" or "openrouter")
    #[serde(default = "default_provider")]
    pub default: String,
    /// OpenAI configuration
    pub openai: Option<OpenAIConfig>,
    /// OpenRouter configuration
    pub openrouter: Option<OpenRouterConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            default: default_provider(),
            openai: None,
            openrouter: None,
        }
    }
}

impl ProviderConfig {
    /// Resolve the endpoint settings of the default provider
    pub fn resolve(&self) -> Result<ChatEndpoint> {
        match self.default.as_str() {
            "openai" => {
                let openai = self
                    .openai
                    .as_ref()
                    .ok_or_else(|| Error::Config("OpenAI provider not configured".into()))?;
                Ok(ChatEndpoint {
                    provider: "openai".to_string(),
                    api_key: openai.api_key.clone(),
                    model: openai.default_model.clone(),
                    base_url: openai.base_url.clone(),
                    organization: openai.organization.clone(),
                    site_url: None,
                    site_name: None,
                    timeout_secs: openai.timeout_secs,
                    max_retries: openai.max_retries,
                })
            }
            "openrouter" => {
                let or = self
                    .openrouter
                    .as_ref()
                    .ok_or_else(|| Error::Config("OpenRouter provider not configured".into()))?;
                Ok(ChatEndpoint {
                    provider: "openrouter".to_string(),
                    api_key: or.api_key.clone(),
                    model: or.default_model.clone(),
                    base_url: or.base_url.clone(),
                    organization: None,
                    site_url: or.site_url.clone(),
                    site_name: or.site_name.clone(),
                    timeout_secs: or.timeout_secs,
                    max_retries: or.max_retries,
                })
            }
            other => Err(Error::Config(format!(
                "Unknown provider: {}. Valid options: openai, openrouter",
                other
            ))),
        }
    }

    /// Whether the default provider has a non-empty API key
    pub fn has_api_key(&self) -> bool {
        self.resolve()
            .map(|endpoint| !endpoint.api_key.expose_secret().is_empty())
            .unwrap_or(false)
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

/// OpenAI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Default model
    #[serde(default = "default_openai_model")]
    pub default_model: String,
    /// Base URL
    #[serde(default = "default_openai_url")]
    pub base_url: String,
    /// Organization ID
    pub organization: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum retries for transient failures
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl OpenAIConfig {
    /// OpenAI defaults around the given key
    pub fn with_api_key(api_key: SecretString) -> Self {
        OpenAIConfig {
            api_key,
            default_model: default_openai_model(),
            base_url: default_openai_url(),
            organization: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

/// OpenRouter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Default model
    #[serde(default = "default_openrouter_model")]
    pub default_model: String,
    /// Base URL
    #[serde(default = "default_openrouter_url")]
    pub base_url: String,
    /// Site URL for rankings
    pub site_url: Option<String>,
    /// Site name for rankings
    pub site_name: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum retries for transient failures
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl OpenRouterConfig {
    /// OpenRouter defaults around the given key
    pub fn with_api_key(api_key: SecretString) -> Self {
        OpenRouterConfig {
            api_key,
            default_model: default_openrouter_model(),
            base_url: default_openrouter_url(),
            site_url: None,
            site_name: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }
}

fn default_openrouter_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_openrouter_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_retries() -> u32 {
    3
}

/// Resolved settings for one OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct ChatEndpoint {
    /// Provider ID the settings came from
    pub provider: String,
    /// Bearer token
    pub api_key: SecretString,
    /// Model used for every call
    pub model: String,
    /// Base URL, without the `/chat/completions` suffix
    pub base_url: String,
    /// OpenAI organization header
    pub organization: Option<String>,
    /// OpenRouter `HTTP-Referer` header
    pub site_url: Option<String>,
    /// OpenRouter `X-Title` header
    pub site_name: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries for transient failures
    pub max_retries: u32,
}
