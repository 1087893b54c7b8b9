//! Generation backends for PromptLab.
//!
//! - [`OpenAIApiAgent`]: hosted chat-completion service (remote mode)
//! - [`LocalModelAgent`]: locally hosted text2text model server (local mode)

mod http_errors;
pub mod local_model_agent;
pub mod openai_api_agent;

use std::sync::Arc;

use promptlab_core::config::{AppConfig, SecretService};
use promptlab_core::{GenerationMode, GenerationService, Result};

pub use local_model_agent::LocalModelAgent;
pub use openai_api_agent::OpenAIApiAgent;

/// A ready-to-use generation service plus the model it should be asked for.
#[derive(Clone)]
pub struct Backend {
    pub service: Arc<dyn GenerationService>,
    pub model: String,
}

/// Builds the backend selected in `config`.
///
/// For the remote backend the model is the configured one, falling back to
/// the `model_name` in secret.json and then the built-in default.
pub async fn build_backend(config: &AppConfig, secrets: &dyn SecretService) -> Result<Backend> {
    match config.backend {
        GenerationMode::Remote => {
            let agent = OpenAIApiAgent::try_from_config(config, secrets).await?;
            let secret_model = openai_api_agent::load_secret_config(secrets)
                .await?
                .and_then(|s| s.openai)
                .and_then(|openai| openai.model_name)
                .filter(|model| !model.trim().is_empty());
            let model = match (&config.model, secret_model) {
                (Some(model), _) if !model.trim().is_empty() => model.clone(),
                (_, Some(model)) => model,
                _ => config.model().to_string(),
            };
            tracing::info!("[Backend] Using OpenAI model {}", model);
            Ok(Backend {
                service: Arc::new(agent),
                model,
            })
        }
        GenerationMode::Local => {
            let agent = LocalModelAgent::new(config.local_endpoint.clone())
                .with_request_timeout(config.request_timeout());
            tracing::info!(
                "[Backend] Using local model {} at {}",
                config.model(),
                agent.endpoint()
            );
            Ok(Backend {
                service: Arc::new(agent),
                model: config.model().to_string(),
            })
        }
    }
}
