//! The template module loads the instructional prompt that wraps user input.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::{info, warn};

use crate::constants::INPUT_MARKER;
use crate::error::ConfigError;

/// Prompt text loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    /// Reads the template from `path`.
    ///
    /// A template without the `{input}` marker is accepted, but logged, since the
    /// model would never see the user's text.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file does not exist
    /// * The file cannot be read as UTF-8 text
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ConfigError::TemplateNotFound(path.to_path_buf()),
            _ => ConfigError::TemplateRead {
                path: path.to_path_buf(),
                source,
            },
        })?;

        info!("Loaded prompt template from {}", path.display());
        Ok(Self::new(text))
    }

    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.contains(INPUT_MARKER) {
            warn!("Prompt template has no {INPUT_MARKER} marker, input will not reach the model");
        }
        Self { text }
    }

    /// Substitutes `input` for every `{input}` marker.
    pub fn render(&self, input: &str) -> String {
        self.text.replace(INPUT_MARKER, input)
    }
}
