//! Startup configuration shared by the server and one-shot commands.

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};

use crate::error::ConfigError;
use crate::limit::RateLimiter;
use crate::model::{LlmModelClient, ModelConfig};
use crate::prettify::Prettifier;
use crate::template::PromptTemplate;

/// Everything needed to construct a `Prettifier`.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub model: ModelConfig,
    /// Path to the prompt template containing the `{input}` marker.
    pub prompt_file: PathBuf,
    /// Upstream requests per minute, unlimited when `None`.
    pub rpm: Option<u32>,
}

impl RelayConfig {
    /// Builds the model client, loads the template and wires them together.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The API key is missing
    /// * The model URL is invalid or the provider fails to build
    /// * The prompt template is missing or unreadable
    pub fn build_prettifier(&self) -> Result<Prettifier, ConfigError> {
        let client = LlmModelClient::from_config(&self.model)?;
        let template = PromptTemplate::load(&self.prompt_file)?;
        info!("Using model {}", client.model());

        let prettifier = Prettifier::new(template, Arc::new(client));
        let Some(rpm) = self.rpm else {
            return Ok(prettifier);
        };

        match RateLimiter::per_minute(rpm) {
            Some(limiter) => {
                info!("Limiting upstream calls to {rpm} per minute");
                Ok(prettifier.with_rate_limiter(limiter))
            }
            None => {
                warn!("Could not build rate limiter for {rpm} rpm, running unthrottled");
                Ok(prettifier)
            }
        }
    }
}
