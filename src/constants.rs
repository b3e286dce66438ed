//! Application constants
//!
//! Single source of truth for paths and other constants.

/// Default settings file path, optional at runtime
pub const CONFIG_PATH: &str = "config/assistant.toml";

/// Default environment file path
pub const ENV_PATH: &str = ".env";

/// Default OpenAI-compatible endpoint
pub const DEFAULT_MODEL_ENDPOINT: &str = "https://api.openai.com";

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Ceiling on tool-invocation/reasoning iterations for a single query
pub const DEFAULT_MAX_STEPS: usize = 100;

/// Default bind address for the web surface
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";

/// Seconds a web session may sit unused before it is evicted
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Prefix rendered in front of a failed query's assistant turn
pub const QUERY_ERROR_PREFIX: &str = "An error occurred: ";
