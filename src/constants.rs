pub const API_KEY_ENV_NAME: &str = "PRETTIFY_API_KEY";
pub const PROMPT_FILE_ENV_NAME: &str = "PRETTIFY_PROMPT_FILE";
pub const MODEL_ENV_NAME: &str = "PRETTIFY_MODEL";
pub const RPM_ENV_NAME: &str = "PRETTIFY_RPM";
pub const BIND_ENV_NAME: &str = "PRETTIFY_BIND";

pub const DEFAULT_MODEL_URL: &str = "google://gemini-2.0-flash";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Substitution marker inside the prompt template.
pub const INPUT_MARKER: &str = "{input}";

/// Returned instead of model output whenever the blocking call cannot produce any.
pub const EMPTY_OBJECT: &str = "{}";

pub const EMPTY_INPUT_MESSAGE: &str = "Input cannot be empty.";

pub(crate) const OUTPUT_MARKER: &str = "\"output\":";

pub(crate) const MAX_BODY_BYTES: usize = 1024 * 1024;
