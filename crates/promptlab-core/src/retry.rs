//! Retrying request client.
//!
//! Wraps a [`GenerationService`] with a bounded retry policy. Rate limits and
//! timeouts are retried after a fixed, subtype-specific backoff; any other
//! failure stops the sequence immediately. The backoff is awaited inline, so
//! the caller's interaction does not complete until the sequence reaches
//! `Succeeded` or `Failed`.
//!
//! ```text
//! Idle --call--> Succeeded
//!      --call--> Failed(n)              (service error, or transient at n == ceiling)
//!      --call--> Waiting(n, reason) --backoff--> Idle
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::GenerationError;
use crate::generation::{
    FailureKind, GenerationInput, GenerationParams, GenerationRequest, GenerationResult,
    GenerationService,
};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(20);
pub const DEFAULT_TIMEOUT_BACKOFF: Duration = Duration::from_secs(10);

/// Fixed backoff intervals, one per transient failure subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub rate_limit_backoff: Duration,
    pub timeout_backoff: Duration,
}

impl RetryPolicy {
    /// Backoff for a failure kind, `None` for kinds that are never retried.
    pub fn backoff_for(&self, kind: FailureKind) -> Option<Duration> {
        match kind {
            FailureKind::RateLimited => Some(self.rate_limit_backoff),
            FailureKind::Timeout => Some(self.timeout_backoff),
            FailureKind::ServiceError => None,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
            timeout_backoff: DEFAULT_TIMEOUT_BACKOFF,
        }
    }
}

/// Where a retry sequence currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryState {
    Idle,
    Waiting { attempt: u32, reason: FailureKind },
    Succeeded,
    Failed { attempt: u32 },
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryState::Succeeded | RetryState::Failed { .. })
    }
}

/// Progress notification emitted while a sequence runs.
///
/// Lets a UI tell "still retrying" apart from "failed, try again later".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryEvent {
    /// A call is about to be made.
    Dispatched { attempt: u32, max_attempts: u32 },
    /// A transient failure occurred; the next call follows after `delay`.
    Waiting {
        attempt: u32,
        reason: FailureKind,
        delay: Duration,
        message: String,
    },
    Succeeded { attempt: u32 },
    Failed { attempt: u32, error: GenerationError },
}

impl RetryEvent {
    /// The state the sequence is in after this event.
    pub fn state(&self) -> RetryState {
        match self {
            RetryEvent::Dispatched { .. } => RetryState::Idle,
            RetryEvent::Waiting { attempt, reason, .. } => RetryState::Waiting {
                attempt: *attempt,
                reason: *reason,
            },
            RetryEvent::Succeeded { .. } => RetryState::Succeeded,
            RetryEvent::Failed { attempt, .. } => RetryState::Failed { attempt: *attempt },
        }
    }
}

/// Client that dispatches requests through a shared generation service and
/// applies the retry policy.
#[derive(Clone)]
pub struct RetryingClient {
    service: Arc<dyn GenerationService>,
    policy: RetryPolicy,
    events: Option<mpsc::UnboundedSender<RetryEvent>>,
}

impl RetryingClient {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self {
            service,
            policy: RetryPolicy::default(),
            events: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Forwards progress events to the given channel.
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<RetryEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn service(&self) -> &Arc<dyn GenerationService> {
        &self.service
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends `input` and retries transient failures.
    ///
    /// At most `max(max_retries, 1)` calls are made: with `max_retries == 0`
    /// the first failure is terminal.
    pub async fn send(
        &self,
        input: impl Into<GenerationInput>,
        params: GenerationParams,
        max_retries: u32,
    ) -> GenerationResult {
        let request = GenerationRequest::new(input, params);
        let max_attempts = max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.emit(RetryEvent::Dispatched {
                attempt,
                max_attempts,
            });
            tracing::debug!(
                service = self.service.name(),
                model = %request.params.model,
                attempt,
                max_attempts,
                "[RetryingClient] Dispatching request"
            );

            let failure = match self.service.generate(&request).await {
                Ok(text) => {
                    tracing::debug!(attempt, "[RetryingClient] Request succeeded");
                    self.emit(RetryEvent::Succeeded { attempt });
                    return Ok(text);
                }
                Err(failure) => failure,
            };

            let Some(delay) = self.policy.backoff_for(failure.kind) else {
                tracing::error!(attempt, error = %failure, "[RetryingClient] Non-retryable failure");
                return Err(self.fail(attempt, GenerationError::Service(failure)));
            };

            if attempt >= max_attempts {
                tracing::error!(
                    attempt,
                    error = %failure,
                    "[RetryingClient] Giving up after {} attempt(s)",
                    attempt
                );
                return Err(self.fail(
                    attempt,
                    GenerationError::RetriesExhausted {
                        attempts: attempt,
                        last: failure,
                    },
                ));
            }

            tracing::warn!(
                attempt,
                reason = %failure.kind,
                delay_secs = delay.as_secs_f64(),
                "[RetryingClient] Transient failure, retrying: {}",
                failure.message
            );
            self.emit(RetryEvent::Waiting {
                attempt,
                reason: failure.kind,
                delay,
                message: failure.message,
            });
            tokio::time::sleep(delay).await;
        }
    }

    fn fail(&self, attempt: u32, error: GenerationError) -> GenerationError {
        self.emit(RetryEvent::Failed {
            attempt,
            error: error.clone(),
        });
        error
    }

    fn emit(&self, event: RetryEvent) {
        if let Some(sender) = &self.events {
            // Receiver may be gone (UI closed); the sequence still runs to completion.
            let _ = sender.send(event);
        }
    }
}
