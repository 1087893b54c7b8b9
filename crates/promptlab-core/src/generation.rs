//! Generation requests and the service seam they are dispatched through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::message::Message;
use crate::prompt::TaskKind;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Closed set of ways a single generation call can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    #[strum(serialize = "rate limited")]
    RateLimited,
    #[strum(serialize = "timeout")]
    Timeout,
    #[strum(serialize = "service error")]
    ServiceError,
}

impl FailureKind {
    /// Rate limits and timeouts are expected to clear up on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureKind::RateLimited | FailureKind::Timeout)
    }
}

/// A classified failure of one call to a generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct GenerationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl GenerationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FailureKind::RateLimited, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn service_error(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ServiceError, message)
    }
}

/// Whether a backend takes a flat prompt or the whole conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum GenerationMode {
    /// Locally hosted text2text model, one prompt per call.
    Local,
    /// Hosted chat-completion service, takes an ordered message list.
    #[default]
    Remote,
}

/// What gets sent: a single prompt or an ordered conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationInput {
    Prompt(String),
    Conversation(Vec<Message>),
}

impl GenerationInput {
    /// Flattens the input to the single prompt a local model understands.
    ///
    /// For a conversation this is the latest user turn.
    pub fn as_prompt(&self) -> Option<&str> {
        match self {
            GenerationInput::Prompt(prompt) => Some(prompt),
            GenerationInput::Conversation(messages) => messages
                .iter()
                .rev()
                .find(|m| m.role() == crate::message::Role::User)
                .map(Message::content),
        }
    }
}

impl From<String> for GenerationInput {
    fn from(prompt: String) -> Self {
        GenerationInput::Prompt(prompt)
    }
}

impl From<&str> for GenerationInput {
    fn from(prompt: &str) -> Self {
        GenerationInput::Prompt(prompt.to_string())
    }
}

impl From<Vec<Message>> for GenerationInput {
    fn from(messages: Vec<Message>) -> Self {
        GenerationInput::Conversation(messages)
    }
}

impl From<&[Message]> for GenerationInput {
    fn from(messages: &[Message]) -> Self {
        GenerationInput::Conversation(messages.to_vec())
    }
}

/// Fully specified generation parameters. There are no optional fields, so a
/// request can never be dispatched half-configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub do_sample: bool,
}

impl GenerationParams {
    pub fn new(model: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_output_tokens,
            temperature: DEFAULT_TEMPERATURE,
            do_sample: true,
        }
    }

    /// Parameters tuned per task: longer outputs for emails than for chat.
    pub fn for_task(task: TaskKind, model: impl Into<String>) -> Self {
        let max_output_tokens = match task {
            TaskKind::Summarize | TaskKind::Infer | TaskKind::Chat => 150,
            TaskKind::Transform => 200,
            TaskKind::Expand => 250,
        };
        Self::new(model, max_output_tokens)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// One call to a generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub input: GenerationInput,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(input: impl Into<GenerationInput>, params: GenerationParams) -> Self {
        Self {
            input: input.into(),
            params,
        }
    }
}

/// Outcome of a retried generation: the text or the terminal error.
pub type GenerationResult = std::result::Result<String, crate::error::GenerationError>;

/// External text-generation collaborator.
///
/// Implementations are stateless handles that any number of sessions may
/// share. Each call either returns the generated text or one classified
/// failure; retrying is the caller's business.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Which input shape this backend expects.
    fn mode(&self) -> GenerationMode;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationFailure>;
}
