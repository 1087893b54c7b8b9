//! Error types for PromptLab.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generation::{FailureKind, GenerationFailure};
use crate::prompt::TaskKind;

/// Terminal outcome of a failed generation after the retry policy gave up.
///
/// Transient failures never appear here on their own: they are absorbed by
/// the retrying client until the attempt ceiling is reached.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationError {
    /// The service rejected the request in a way retrying cannot fix.
    #[error("Service error: {0}")]
    Service(GenerationFailure),

    /// Every attempt failed with a transient error.
    #[error("Failed after {attempts} attempt(s); last error: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: GenerationFailure,
    },
}

impl GenerationError {
    /// Number of calls that were made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Service(_) => 1,
            Self::RetriesExhausted { attempts, .. } => *attempts,
        }
    }

    /// The failure kind of the last call.
    pub fn last_kind(&self) -> FailureKind {
        match self {
            Self::Service(failure) => failure.kind,
            Self::RetriesExhausted { last, .. } => last.kind,
        }
    }

    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }
}

/// A shared error type for the entire PromptLab application.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptLabError {
    /// An option value outside the domain accepted by the task (caller bug)
    #[error("Invalid option for {task}: {key} = '{value}'")]
    InvalidOption {
        task: TaskKind,
        key: String,
        value: String,
    },

    /// Empty or whitespace-only input text
    #[error("Input text is empty")]
    EmptyInput,

    /// Generation failed
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Configuration error (missing credentials, malformed config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },
}

impl PromptLabError {
    /// Creates an InvalidOption error
    pub fn invalid_option(task: TaskKind, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidOption {
            task,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn is_invalid_option(&self) -> bool {
        matches!(self, Self::InvalidOption { .. })
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns the generation error, if this is one.
    pub fn as_generation(&self) -> Option<&GenerationError> {
        match self {
            Self::Generation(err) => Some(err),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for PromptLabError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for PromptLabError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PromptLabError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for PromptLabError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<minijinja::Error> for PromptLabError {
    fn from(err: minijinja::Error) -> Self {
        Self::Serialization {
            format: "template".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, PromptLabError>`.
pub type Result<T> = std::result::Result<T, PromptLabError>;
