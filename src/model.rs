//! The model module wraps the external generative-language API behind the
//! `ModelClient` trait so the orchestrator can be driven by any provider.

use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::{ChatMessage, ChatProvider};
use log::debug;
use url::Url;

use crate::error::{ConfigError, UpstreamError};

/// Lazy sequence of response fragments from a streaming call.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

/// Client for the external model. One handle is shared by all requests.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Sends `prompt` and waits for the complete response text.
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError>;

    /// Sends `prompt` and returns the response as it is generated.
    ///
    /// Dropping the returned stream abandons the upstream call.
    async fn stream(&self, prompt: &str) -> Result<ChunkStream, UpstreamError>;
}

/// Settings needed to reach the model provider.
#[derive(Clone)]
pub struct ModelConfig {
    /// Model URL in the `backend://model-name` form, e.g. `google://gemini-2.0-flash`.
    pub model_url: String,
    pub api_key: String,
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ModelConfig")
            .field("model_url", &self.model_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// `ModelClient` backed by an `llm` crate chat provider.
pub struct LlmModelClient {
    provider: Box<dyn ChatProvider>,
    model: String,
}

impl LlmModelClient {
    pub fn new(provider: Box<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Builds the provider described by `config`.
    ///
    /// The URL scheme names the backend, the host names the model. A user part is
    /// appended to the model name after a colon: `ollama://14b@phi4` selects `phi4:14b`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The API key is empty
    /// * The model URL cannot be parsed or names an unknown backend
    /// * The provider fails to build
    pub fn from_config(config: &ModelConfig) -> Result<Self, ConfigError> {
        if config.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        let (backend, model) = parse_model_url(&config.model_url)?;
        let provider = LLMBuilder::new()
            .backend(backend)
            .model(model.clone())
            .api_key(config.api_key.clone())
            .build()
            .map_err(|e| ConfigError::ModelBuild(e.to_string()))?;

        debug!("Built model client for {model}");
        Ok(Self::new(provider, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn messages(prompt: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::user().content(prompt).build()]
    }
}

#[async_trait]
impl ModelClient for LlmModelClient {
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        let messages = Self::messages(prompt);
        let response = self.provider.chat(&messages).await?;
        response.text().ok_or(UpstreamError::EmptyResponse)
    }

    async fn stream(&self, prompt: &str) -> Result<ChunkStream, UpstreamError> {
        let messages = Self::messages(prompt);
        let upstream = self.provider.chat_stream(&messages).await?;
        Ok(Box::pin(
            upstream.map(|chunk| chunk.map_err(UpstreamError::from)),
        ))
    }
}

/// Splits a model URL into its backend and model name.
///
/// # Errors
///
/// Returns an error if the URL is malformed, has no host, or its scheme is not a
/// backend known to the `llm` crate.
pub fn parse_model_url(model_url: &str) -> Result<(LLMBackend, String), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidModel {
        url: model_url.to_owned(),
        reason,
    };

    let url = Url::parse(model_url).map_err(|e| invalid(e.to_string()))?;
    let backend = LLMBackend::from_str(url.scheme()).map_err(|e| invalid(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| invalid("Specify model name as host URL.".to_owned()))?;

    let model = [host, url.username()]
        .iter()
        .filter(|x| !x.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(":");

    Ok((backend, model))
}
