//! The prettify-relay library forwards text or code to a generative language model
//! with a fixed instructional prompt and returns the model's JSON, whole or streamed.

pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod limit;
pub mod model;
pub mod prettify;
pub mod server;
pub mod template;

pub use config::RelayConfig;
pub use error::{ConfigError, UpstreamError};
pub use extract::extract_output;
pub use model::{ChunkStream, LlmModelClient, ModelClient, ModelConfig};
pub use prettify::{PrettifyStream, Prettifier};
pub use template::PromptTemplate;
