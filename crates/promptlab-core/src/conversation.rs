//! Session-scoped conversation store.
//!
//! A [`Conversation`] is an append-only log of [`Message`]s owned by exactly
//! one interactive session. The only way to shrink it is [`Conversation::reset`],
//! which puts it back to a single seed system message.

use serde::{Deserialize, Serialize};

use crate::message::{Message, Role};

/// Seed content used when no system prompt is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, concise assistant.";

/// Ordered dialogue history. Never empty: it always starts with the seed
/// system message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredConversation")]
pub struct Conversation {
    seed: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct StoredConversation {
    seed: String,
    messages: Vec<Message>,
}

impl TryFrom<StoredConversation> for Conversation {
    type Error = String;

    fn try_from(stored: StoredConversation) -> Result<Self, Self::Error> {
        match stored.messages.first() {
            Some(first) if first.role() == Role::System => Ok(Self {
                seed: stored.seed,
                messages: stored.messages,
            }),
            _ => Err("conversation must start with its system seed message".to_string()),
        }
    }
}

impl Conversation {
    /// Creates a conversation seeded with the given system prompt.
    pub fn new(seed: impl Into<String>) -> Self {
        let seed = seed.into();
        let messages = vec![Message::system(seed.clone())];
        Self { seed, messages }
    }

    /// Adds one message to the end of the history.
    pub fn append(&mut self, message: Message) {
        tracing::trace!(role = %message.role(), len = self.messages.len() + 1, "[Conversation] append");
        self.messages.push(message);
    }

    /// Discards the whole history and reseeds it.
    pub fn reset(&mut self) {
        tracing::debug!(dropped = self.messages.len(), "[Conversation] reset");
        self.messages = vec![Message::system(self.seed.clone())];
    }

    /// Read-only view of the history in turn order.
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Content of the most recent user message.
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role() == Role::User)
            .map(Message::content)
    }

    /// Messages that are shown to the user (everything but system messages).
    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role() != Role::System)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}
