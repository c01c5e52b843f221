//! Error types shared across the relay.

use std::path::PathBuf;

use llm::error::LLMError;
use thiserror::Error;

/// Problems that stop the relay from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key is missing or empty")]
    MissingApiKey,
    #[error("prompt template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),
    #[error("failed to read prompt template {}: {source}", .path.display())]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid model URL {url}: {reason}")]
    InvalidModel { url: String, reason: String },
    #[error("failed to build LLM model: {0}")]
    ModelBuild(String),
}

/// Failures reported by the external model provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("model provider rejected the credentials: {0}")]
    Auth(String),
    #[error("model provider rate limit reached: {0}")]
    RateLimited(String),
    #[error("network error talking to the model provider: {0}")]
    Network(String),
    #[error("model provider returned no text")]
    EmptyResponse,
    #[error("model provider error: {0}")]
    Provider(String),
}

impl UpstreamError {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::RateLimited(_) => "rate_limit",
            Self::Network(_) => "network",
            Self::EmptyResponse => "empty_response",
            Self::Provider(_) => "provider",
        }
    }
}

impl From<LLMError> for UpstreamError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::AuthError(message) => Self::Auth(message),
            LLMError::HttpError(message) if mentions_rate_limit(&message) => {
                Self::RateLimited(message)
            }
            LLMError::HttpError(message) => Self::Network(message),
            other => {
                let message = other.to_string();
                if mentions_rate_limit(&message) {
                    Self::RateLimited(message)
                } else {
                    Self::Provider(message)
                }
            }
        }
    }
}

/// Providers report throttling as plain text, usually with the HTTP status.
fn mentions_rate_limit(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("429") || message.contains("rate limit") || message.contains("quota")
}
