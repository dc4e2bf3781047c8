//! LLM Provider trait - Abstract interface for language model backends
//!
//! The orchestrator only ever sends a single prompt and reads back text,
//! optionally constrained to a JSON object. Keeping that behind a trait lets
//! tests script the model's answers.

use async_trait::async_trait;

use crate::agent::GenerationOptions;
use crate::error::Result;

/// Abstract interface for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model used for every completion
    fn model(&self) -> &str;

    /// Send one prompt and return the generated text
    ///
    /// When `options.response_format` asks for JSON the provider is asked to
    /// produce a JSON object, but nothing guarantees it does: callers must
    /// decode the text defensively.
    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}
