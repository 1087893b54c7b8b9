//! OpenAIApiAgent - Direct REST client for the OpenAI Chat Completions API.
//!
//! Credential priority: ~/.config/promptlab/secret.json > environment variables

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use promptlab_core::config::{AppConfig, DEFAULT_OPENAI_BASE_URL, SecretConfig, SecretService};
use promptlab_core::{
    GenerationFailure, GenerationInput, GenerationMode, GenerationRequest, GenerationService,
    Message, PromptLabError, Result,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::http_errors::{map_http_error, map_send_error};

const PROVIDER: &str = "OpenAI";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Generation service that talks to the OpenAI HTTP API.
#[derive(Clone)]
pub struct OpenAIApiAgent {
    client: Client,
    api_key: String,
    base_url: String,
    request_timeout: Duration,
}

impl OpenAIApiAgent {
    /// Creates a new agent with the provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Builds the agent from app config, taking the API key from secret
    /// storage first and the `OPENAI_API_KEY` environment variable second.
    pub async fn try_from_config(config: &AppConfig, secrets: &dyn SecretService) -> Result<Self> {
        let secret = load_secret_config(secrets).await?;
        let from_secret = secret
            .as_ref()
            .and_then(|s| s.openai.as_ref())
            .map(|openai| openai.api_key.clone());

        let api_key = resolve_api_key(from_secret, env::var("OPENAI_API_KEY").ok())?;

        Ok(Self::new(api_key)
            .with_base_url(config.openai_base_url.clone())
            .with_request_timeout(config.request_timeout()))
    }

    /// Points the agent at a different OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_messages(input: &GenerationInput) -> Vec<ChatMessage> {
        match input {
            GenerationInput::Prompt(prompt) => vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.clone(),
            }],
            GenerationInput::Conversation(messages) => {
                messages.iter().map(ChatMessage::from).collect()
            }
        }
    }

    async fn send_request(
        &self,
        body: &ChatCompletionRequest,
    ) -> std::result::Result<String, GenerationFailure> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|err| map_send_error(PROVIDER, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(map_http_error(PROVIDER, status, &body_text));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            if err.is_timeout() {
                GenerationFailure::timeout(format!("OpenAI response timed out: {err}"))
            } else {
                GenerationFailure::service_error(format!("Failed to parse OpenAI response: {err}"))
            }
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl GenerationService for OpenAIApiAgent {
    fn name(&self) -> &str {
        "openai"
    }

    fn mode(&self) -> GenerationMode {
        GenerationMode::Remote
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, GenerationFailure> {
        let body = ChatCompletionRequest {
            model: request.params.model.clone(),
            messages: Self::build_messages(&request.input),
            max_tokens: request.params.max_output_tokens,
            temperature: request.params.temperature,
        };

        tracing::debug!(
            model = %body.model,
            messages = body.messages.len(),
            "[OpenAIApiAgent] Sending chat completion request"
        );
        self.send_request(&body).await
    }
}

/// Loads secret.json. A missing file yields `None` so the environment can
/// supply the key; an unreadable or malformed one is a configuration error.
pub(crate) async fn load_secret_config(secrets: &dyn SecretService) -> Result<Option<SecretConfig>> {
    if !secrets.secret_file_exists().await {
        tracing::debug!("[OpenAIApiAgent] No secret file, falling back to environment");
        return Ok(None);
    }
    secrets
        .load_secrets()
        .await
        .map(Some)
        .map_err(PromptLabError::config)
}

/// Picks the API key: secret file first, then the environment. Blank keys
/// (as left by the secret template) don't count.
pub(crate) fn resolve_api_key(
    from_secret: Option<String>,
    from_env: Option<String>,
) -> Result<String> {
    from_secret
        .filter(|key| !key.trim().is_empty())
        .or_else(|| from_env.filter(|key| !key.trim().is_empty()))
        .ok_or_else(|| {
            PromptLabError::config(
                "OPENAI_API_KEY not found in ~/.config/promptlab/secret.json or environment variables",
            )
        })
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role().to_string(),
            content: message.content().to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn extract_text_response(
    response: ChatCompletionResponse,
) -> std::result::Result<String, GenerationFailure> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            GenerationFailure::service_error("OpenAI API returned no content in the response")
        })
}
