//! Interactive session: one handler call per user action.
//!
//! `PromptLabSession` owns the chat [`Conversation`] for one user and shares
//! the generation service with every other session. Each method runs to
//! completion, retry waits included, before returning; there is no
//! background work.

use promptlab_core::config::AppConfig;
use promptlab_core::{
    Conversation, GenerationInput, GenerationMode, GenerationParams, Message, PromptLabError,
    PromptOptions, Result, RetryingClient, TaskKind, build_prompt,
};
use uuid::Uuid;

pub struct PromptLabSession {
    id: Uuid,
    client: RetryingClient,
    model: String,
    max_retries: u32,
    conversation: Conversation,
}

impl PromptLabSession {
    /// Creates a session with a fresh conversation seeded with `system_prompt`.
    pub fn new(
        client: RetryingClient,
        model: impl Into<String>,
        max_retries: u32,
        system_prompt: impl Into<String>,
    ) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            client,
            model: model.into(),
            max_retries,
            conversation: Conversation::new(system_prompt),
        };
        tracing::debug!(session_id = %session.id, model = %session.model, "[Session] Created");
        session
    }

    /// Creates a session using the retry ceiling and seed prompt from `config`.
    pub fn from_config(client: RetryingClient, model: impl Into<String>, config: &AppConfig) -> Self {
        Self::new(client, model, config.max_retries, config.system_prompt.clone())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn mode(&self) -> GenerationMode {
        self.client.service().mode()
    }

    /// Handles a press of one of the task buttons (summarize, transform,
    /// expand, infer). Does not touch the chat history.
    pub async fn run_task(&self, task: TaskKind, text: &str, options: &PromptOptions) -> Result<String> {
        let text = require_text(text)?;
        let prompt = build_prompt(task, text, options)?;

        tracing::info!(session_id = %self.id, task = %task, "[Session] Running task");

        let input = match self.mode() {
            GenerationMode::Remote => GenerationInput::Conversation(vec![Message::user(prompt)]),
            GenerationMode::Local => GenerationInput::Prompt(prompt),
        };
        let params = GenerationParams::for_task(task, self.model.clone());

        Ok(self.client.send(input, params, self.max_retries).await?)
    }

    /// Handles a chat submission.
    ///
    /// The user message is recorded before dispatch and stays in the history
    /// even if generation fails; the reply is appended only on success.
    pub async fn chat(&mut self, text: &str) -> Result<String> {
        let text = require_text(text)?;
        self.conversation.append(Message::user(text));

        let input = match self.mode() {
            GenerationMode::Remote => GenerationInput::from(self.conversation.history()),
            GenerationMode::Local => GenerationInput::Prompt(text.to_string()),
        };
        let params = GenerationParams::for_task(TaskKind::Chat, self.model.clone());

        tracing::info!(
            session_id = %self.id,
            turns = self.conversation.len(),
            "[Session] Sending chat turn"
        );

        let reply = self.client.send(input, params, self.max_retries).await?;
        self.conversation.append(Message::assistant(reply.clone()));
        Ok(reply)
    }

    /// Handles the "clear chat history" action.
    pub fn clear_history(&mut self) {
        tracing::info!(session_id = %self.id, "[Session] Chat history cleared");
        self.conversation.reset();
    }

    pub fn history(&self) -> &[Message] {
        self.conversation.history()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }
}

/// Rejects empty or whitespace-only input and returns it trimmed.
fn require_text(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PromptLabError::EmptyInput);
    }
    Ok(trimmed)
}
