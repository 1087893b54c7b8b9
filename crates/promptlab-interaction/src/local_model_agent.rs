//! LocalModelAgent - client for a locally hosted text2text inference server.
//!
//! Speaks the `/generate` shape used by text-generation-inference style
//! servers: `{ inputs, parameters }` in, `generated_text` out. The model itself
//! is loaded and owned by that server.

use std::time::Duration;

use async_trait::async_trait;
use promptlab_core::config::DEFAULT_LOCAL_ENDPOINT;
use promptlab_core::{
    GenerationFailure, GenerationMode, GenerationRequest, GenerationService,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::http_errors::{map_http_error, map_send_error};

const PROVIDER: &str = "Local model";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct LocalModelAgent {
    client: Client,
    endpoint: String,
    request_timeout: Duration,
}

impl LocalModelAgent {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for LocalModelAgent {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_ENDPOINT)
    }
}

#[async_trait]
impl GenerationService for LocalModelAgent {
    fn name(&self) -> &str {
        "local"
    }

    fn mode(&self) -> GenerationMode {
        GenerationMode::Local
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationFailure> {
        let inputs = request.input.as_prompt().ok_or_else(|| {
            GenerationFailure::service_error("Local model needs a prompt or a user message")
        })?;

        let body = GenerateRequest {
            inputs,
            parameters: GenerateParameters {
                max_new_tokens: request.params.max_output_tokens,
                do_sample: request.params.do_sample,
                temperature: request.params.temperature,
            },
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %request.params.model,
            "[LocalModelAgent] Sending generate request"
        );

        let response = self
            .client
            .post(format!("{}/generate", self.endpoint))
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| map_send_error(PROVIDER, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(PROVIDER, status, &body_text));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|err| {
            GenerationFailure::service_error(format!("Failed to parse local model response: {err}"))
        })?;

        parsed.into_text()
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

#[derive(Serialize)]
struct GenerateParameters {
    max_new_tokens: u32,
    do_sample: bool,
    temperature: f32,
}

#[derive(Deserialize)]
struct Generated {
    generated_text: String,
}

/// Servers answer either with a single object or a one-element list.
#[derive(Deserialize)]
#[serde(untagged)]
enum GenerateResponse {
    Single(Generated),
    Batch(Vec<Generated>),
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, GenerationFailure> {
        match self {
            GenerateResponse::Single(generated) => Ok(generated.generated_text),
            GenerateResponse::Batch(batch) => batch
                .into_iter()
                .next()
                .map(|generated| generated.generated_text)
                .ok_or_else(|| {
                    GenerationFailure::service_error("Local model returned an empty batch")
                }),
        }
    }
}
