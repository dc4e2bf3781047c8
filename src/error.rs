//! Error types for memagent

use thiserror::Error;

/// Result type alias using memagent's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for memagent
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Language model API error
    #[error("Language model error: {0}")]
    Llm(String),

    /// Embedding model error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector store service error
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unauthorized access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Remote service answered with a server-side failure
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A memory could not be written and the write-failure policy is `abort`
    #[error("Memory write failed: {0}")]
    MemoryWrite(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => !e.is_decode() && !e.is_builder(),
            Error::RateLimit(_)
            | Error::Timeout(_)
            | Error::ServiceUnavailable(_)
            | Error::Database(_)
            | Error::VectorStore(_) => true,
            _ => false,
        }
    }

    /// Check if error is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::NotFound(_) | Error::Unauthorized(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::RateLimit("slow down".into()).is_retryable());
        assert!(Error::Timeout("30s".into()).is_retryable());
        assert!(Error::ServiceUnavailable("502".into()).is_retryable());
        assert!(!Error::Unauthorized("bad key".into()).is_retryable());
        assert!(!Error::MemoryWrite("insert failed".into()).is_retryable());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::InvalidInput("empty".into()).is_client_error());
        assert!(!Error::Llm("500".into()).is_client_error());
    }
}
