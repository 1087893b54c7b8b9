use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use promptlab_application::PromptLabSession;
use promptlab_core::config::AppConfig;
use promptlab_core::{
    FailureKind, GenerationError, GenerationMode, PromptLabError, RetryEvent, RetryingClient,
};
use promptlab_infrastructure::{ConfigStorage, SecretServiceImpl};
use promptlab_interaction::build_backend;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::GlobalArgs;

/// Config storage at `--config` or the default location.
pub fn config_storage(global: &GlobalArgs) -> Result<ConfigStorage> {
    match &global.config {
        Some(path) => Ok(ConfigStorage::new(path.clone())),
        None => Ok(ConfigStorage::default_location()?),
    }
}

/// Loads config.toml and applies the command-line overrides.
pub fn load_config(global: &GlobalArgs) -> Result<AppConfig> {
    let mut config = config_storage(global)?.load()?;

    if let Some(backend) = global.backend {
        config.backend = backend;
    }
    if let Some(model) = &global.model {
        config.model = Some(model.clone());
    }
    if let Some(max_retries) = global.max_retries {
        config.max_retries = max_retries;
    }

    Ok(config)
}

/// A session wired to the configured backend, plus the task printing retry
/// progress. Dropping the session closes the event channel and ends the task.
pub struct SessionHandle {
    pub session: PromptLabSession,
    pub printer: JoinHandle<()>,
}

pub async fn open_session(global: &GlobalArgs) -> Result<SessionHandle> {
    let config = load_config(global)?;
    let secrets = secret_service(config.backend)?;
    let backend = build_backend(&config, &secrets).await?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let client = RetryingClient::new(backend.service)
        .with_policy(config.retry_policy())
        .with_events(events_tx);

    let session = PromptLabSession::from_config(client, backend.model, &config);
    let printer = tokio::spawn(print_retry_events(events_rx));

    Ok(SessionHandle { session, printer })
}

/// Secret storage for the remote backend. The local backend never reads
/// credentials, so it gets a service without a file behind it.
fn secret_service(backend: GenerationMode) -> Result<SecretServiceImpl> {
    match backend {
        GenerationMode::Remote => {
            SecretServiceImpl::new().context("Failed to locate secret storage")
        }
        GenerationMode::Local => Ok(SecretServiceImpl::with_path(PathBuf::new())),
    }
}

async fn print_retry_events(mut events: mpsc::UnboundedReceiver<RetryEvent>) {
    while let Some(event) = events.recv().await {
        if let Some(notice) = retry_notice(&event) {
            eprintln!("{}", notice.yellow());
        }
    }
}

/// "Still retrying" text for a waiting event; `None` for every other event.
pub fn retry_notice(event: &RetryEvent) -> Option<String> {
    let RetryEvent::Waiting { reason, delay, .. } = event else {
        return None;
    };
    let what = match reason {
        FailureKind::RateLimited => "Rate limit reached",
        FailureKind::Timeout => "Request timed out",
        FailureKind::ServiceError => return None,
    };
    Some(format!("⚠️ {}. Retrying in {} seconds...", what, delay.as_secs()))
}

/// User-facing text for a failed action.
pub fn describe_error(err: &PromptLabError) -> String {
    match err {
        PromptLabError::Generation(GenerationError::RetriesExhausted { .. }) => {
            "❌ Failed after multiple retries. Please try again later.".to_string()
        }
        PromptLabError::Generation(GenerationError::Service(failure)) => {
            format!("⚠️ API Error: {}", failure.message)
        }
        PromptLabError::EmptyInput => "Please enter some text first.".to_string(),
        other => format!("⚠️ {other}"),
    }
}
