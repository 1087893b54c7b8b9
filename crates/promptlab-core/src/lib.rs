//! Core domain for PromptLab: prompt building, the retrying request client
//! and the session-scoped conversation store.

pub mod config;
pub mod conversation;
pub mod error;
pub mod generation;
pub mod message;
pub mod prompt;
pub mod retry;

// Re-export common types
pub use conversation::Conversation;
pub use error::{GenerationError, PromptLabError, Result};
pub use generation::{
    FailureKind, GenerationFailure, GenerationInput, GenerationMode, GenerationParams,
    GenerationRequest, GenerationResult, GenerationService,
};
pub use message::{Message, Role};
pub use prompt::{PromptOptions, TaskKind, build_prompt};
pub use retry::{RetryEvent, RetryPolicy, RetryState, RetryingClient};
