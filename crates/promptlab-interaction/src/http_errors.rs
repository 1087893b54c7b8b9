//! Maps HTTP transport outcomes onto the three generation failure kinds.

use promptlab_core::GenerationFailure;
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Object { message: String },
    Text(String),
}

/// Classifies a failed send (no response received).
pub(crate) fn map_send_error(provider: &str, err: reqwest::Error) -> GenerationFailure {
    if err.is_timeout() {
        GenerationFailure::timeout(format!("{provider} request timed out: {err}"))
    } else {
        GenerationFailure::service_error(format!("{provider} request failed: {err}"))
    }
}

/// Classifies a non-success HTTP status.
///
/// 429 is a rate limit, 408/504 are timeouts, everything else (auth errors,
/// bad requests, server faults) is a service error.
pub(crate) fn map_http_error(provider: &str, status: StatusCode, body: &str) -> GenerationFailure {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| match wrapper.error {
            ErrorBody::Object { message } | ErrorBody::Text(message) => message,
        })
        .unwrap_or_else(|_| body.trim().to_string());
    let message = format!("{provider} API returned {status}: {detail}");

    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationFailure::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            GenerationFailure::timeout(message)
        }
        _ => GenerationFailure::service_error(message),
    }
}
