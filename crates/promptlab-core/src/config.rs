//! Configuration models.
//!
//! `AppConfig` is read from `config.toml`; every field has a default so a
//! missing or partial file still yields a usable configuration. Credentials
//! live separately in `SecretConfig`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::conversation::DEFAULT_SYSTEM_PROMPT;
use crate::generation::GenerationMode;
use crate::retry::{DEFAULT_MAX_RETRIES, RetryPolicy};

pub const DEFAULT_REMOTE_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LOCAL_MODEL: &str = "google/flan-t5-small";
pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://127.0.0.1:8080";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub backend: GenerationMode,
    /// Target model identifier. Falls back to the backend's default when unset.
    pub model: Option<String>,
    pub max_retries: u32,
    pub rate_limit_backoff_secs: u64,
    pub timeout_backoff_secs: u64,
    pub request_timeout_secs: u64,
    pub local_endpoint: String,
    pub openai_base_url: String,
    pub system_prompt: String,
}

impl AppConfig {
    /// The configured model, or the default for the selected backend.
    pub fn model(&self) -> &str {
        match (&self.model, self.backend) {
            (Some(model), _) if !model.trim().is_empty() => model,
            (_, GenerationMode::Remote) => DEFAULT_REMOTE_MODEL,
            (_, GenerationMode::Local) => DEFAULT_LOCAL_MODEL,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            rate_limit_backoff: Duration::from_secs(self.rate_limit_backoff_secs),
            timeout_backoff: Duration::from_secs(self.timeout_backoff_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: GenerationMode::Remote,
            model: None,
            max_retries: DEFAULT_MAX_RETRIES,
            rate_limit_backoff_secs: 20,
            timeout_backoff_secs: 10,
            request_timeout_secs: 60,
            local_endpoint: DEFAULT_LOCAL_ENDPOINT.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Root structure of `secret.json`.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SecretConfig {
    #[serde(default)]
    pub openai: Option<OpenAIConfig>,
}

/// OpenAI API configuration
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    #[serde(default)]
    pub model_name: Option<String>,
}

/// Service for loading secret configuration (API keys).
///
/// Implementations must never put secret values into error messages or logs.
#[async_trait::async_trait]
pub trait SecretService: Send + Sync {
    /// Loads the secret configuration.
    async fn load_secrets(&self) -> Result<SecretConfig, String>;

    /// Checks if the secret file exists.
    async fn secret_file_exists(&self) -> bool;
}
