//! OpenAI-compatible chat completions client

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::agent::types::*;
use crate::config::ChatEndpoint;
use crate::core::LlmProvider;
use crate::error::{Error, Result};

/// Chat completions client for OpenAI and OpenRouter
#[derive(Clone)]
pub struct ChatClient {
    /// HTTP client
    client: Client,
    /// Endpoint settings
    endpoint: ChatEndpoint,
    /// First retry delay
    initial_retry_interval: Duration,
}

impl ChatClient {
    /// Create a new chat client
    pub fn new(endpoint: ChatEndpoint) -> Result<Self> {
        let mut headers = header::HeaderMap::new();

        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!(
                "Bearer {}",
                endpoint.api_key.expose_secret()
            ))
            .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?,
        );

        if let Some(ref organization) = endpoint.organization {
            if let Ok(value) = header::HeaderValue::from_str(organization) {
                headers.insert("OpenAI-Organization", value);
            }
        }

        // OpenRouter ranking headers
        if let Some(ref site_url) = endpoint.site_url {
            if let Ok(value) = header::HeaderValue::from_str(site_url) {
                headers.insert("HTTP-Referer", value);
            }
        }
        if let Some(ref site_name) = endpoint.site_name {
            if let Ok(value) = header::HeaderValue::from_str(site_name) {
                headers.insert("X-Title", value);
            }
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .build()?;

        Ok(ChatClient {
            client,
            endpoint,
            initial_retry_interval: Duration::from_millis(500),
        })
    }

    /// Override the first retry delay
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.initial_retry_interval = interval;
        self
    }

    /// Send a chat completion request, retrying transient failures
    pub async fn chat(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_retry_interval)
            .with_max_elapsed_time(Some(Duration::from_secs(self.endpoint.timeout_secs)))
            .build();

        let max_retries = self.endpoint.max_retries;
        let retries = AtomicU32::new(0);
        let retries = &retries;
        let request = &request;

        backoff::future::retry(policy, move || async move {
            match self.send_request(request).await {
                Ok(response) => Ok(response),
                Err(e) if e.is_retryable() && retries.fetch_add(1, Ordering::SeqCst) < max_retries => {
                    warn!("Chat completion failed, retrying: {}", e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    /// Send a request to the chat completions endpoint
    async fn send_request(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = format!(
            "{}/chat/completions",
            self.endpoint.base_url.trim_end_matches('/')
        );

        debug!(
            "Sending request to {}: model={}, json={}",
            self.endpoint.provider,
            request.model,
            request.response_format.is_some()
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();

        if status.is_success() {
            let body = response
                .json::<ChatCompletionResponse>()
                .await
                .map_err(|e| self.transport_error(e))?;

            if let Some(ref usage) = body.usage {
                info!(
                    "{} response: model={}, tokens={}",
                    self.endpoint.provider, body.model, usage.total_tokens
                );
            }

            Ok(body)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            match status.as_u16() {
                429 => {
                    warn!("Rate limit exceeded: {}", error_text);
                    Err(Error::RateLimit(error_text))
                }
                401 => Err(Error::Unauthorized("Invalid API key".to_string())),
                code if code >= 500 => Err(Error::ServiceUnavailable(format!(
                    "API error ({}): {}",
                    status, error_text
                ))),
                _ => Err(Error::Llm(format!("API error ({}): {}", status, error_text))),
            }
        }
    }
}

impl ChatClient {
    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(format!(
                "{} did not answer within {}s",
                self.endpoint.provider, self.endpoint.timeout_secs
            ))
        } else {
            Error::Http(e)
        }
    }
}

#[async_trait]
impl LlmProvider for ChatClient {
    fn model(&self) -> &str {
        &self.endpoint.model
    }

    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.endpoint.model.clone(),
            messages: vec![Message::user(prompt)],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            response_format: options.response_format,
            stream: Some(false),
        };

        let response = self.chat(request).await?;

        match response.first_text() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(Error::Llm("Response contained no text".to_string())),
        }
    }
}
