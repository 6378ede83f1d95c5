//! LLM provider implementations
//!
//! This module contains concrete implementations of the CompletionProvider
//! trait for each supported upstream, plus the HTTP response handling they
//! share.

pub mod anthropic;
pub mod openai;

use std::sync::Arc;

use chronicle_core::{ChronicleError, ChronicleResult, ConfigError, LlmError};
use reqwest::{header::HeaderMap, Response, StatusCode};
use serde::Deserialize;

use crate::config::{ProviderConfig, ProviderKind};
use crate::{CompletionProvider, RawEnvelope};

pub use anthropic::{AnthropicClient, AnthropicProvider};
pub use openai::{OpenAIClient, OpenAIProvider};

/// Build the adapter selected by `config.kind`.
pub fn build_provider(config: ProviderConfig) -> ChronicleResult<Arc<dyn CompletionProvider>> {
    let provider: Arc<dyn CompletionProvider> = match config.kind {
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::from_config(config)?),
        ProviderKind::OpenAI => Arc::new(OpenAIProvider::from_config(config)?),
    };
    Ok(provider)
}

// ============================================================================
// ERROR CONSTRUCTORS
// ============================================================================

pub(crate) fn rate_limited(provider: &str, retry_after_ms: Option<i64>) -> ChronicleError {
    LlmError::RateLimited {
        provider: provider.to_string(),
        retry_after_ms,
    }
    .into()
}

pub(crate) fn request_failed(
    provider: &str,
    status: StatusCode,
    error_type: Option<String>,
    message: impl Into<String>,
) -> ChronicleError {
    LlmError::RequestFailed {
        provider: provider.to_string(),
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
        error_type,
        message: message.into(),
    }
    .into()
}

pub(crate) fn network_error(provider: &str, message: impl Into<String>) -> ChronicleError {
    LlmError::Network {
        provider: provider.to_string(),
        message: message.into(),
    }
    .into()
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> ChronicleError {
    LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    }
    .into()
}

pub(crate) fn missing_credential(kind: ProviderKind) -> ChronicleError {
    ConfigError::MissingCredential {
        provider: kind.display_name().to_string(),
        variable: kind.credential_variable().to_string(),
    }
    .into()
}

pub(crate) fn http_client(kind: ProviderKind, timeout: std::time::Duration) -> ChronicleResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            ChronicleError::from(ConfigError::InvalidValue {
                field: format!("{} HTTP client", kind),
                value: format!("{:?}", timeout),
                reason: e.to_string(),
            })
        })
}

// ============================================================================
// RESPONSE HANDLING
// ============================================================================

const INSUFFICIENT_QUOTA: &str = "insufficient_quota";

/// Error body shape shared by both providers:
/// `{"error": {"type": "...", "code": "...", "message": "..."}}`.
#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    r#type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Turn an HTTP response into an envelope or a typed failure.
pub(crate) async fn read_envelope(
    provider: &'static str,
    response: Response,
) -> ChronicleResult<RawEnvelope> {
    let status = response.status();
    let retry_after_ms = parse_retry_after_ms(response.headers());

    if status.is_success() {
        let body = response
            .text()
            .await
            .map_err(|e| network_error(provider, format!("Failed to read response body: {}", e)))?;
        let value = serde_json::from_str(&body)
            .map_err(|e| invalid_response(provider, format!("Response body is not JSON: {}", e)))?;
        return Ok(RawEnvelope(value));
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let (error_type, message) = match serde_json::from_str::<ApiErrorBody>(&error_text) {
        Ok(body) => (body.error.code.or(body.error.r#type), body.error.message),
        Err(_) => (None, error_text),
    };

    // OpenAI answers an exhausted quota with 429 too; that is not a cooldown.
    if status == StatusCode::TOO_MANY_REQUESTS
        && error_type.as_deref() != Some(INSUFFICIENT_QUOTA)
    {
        tracing::warn!(provider, retry_after_ms = ?retry_after_ms, "Provider rate limit hit");
        return Err(rate_limited(provider, retry_after_ms));
    }

    tracing::error!(
        provider,
        status = status.as_u16(),
        error_type = ?error_type,
        message = %message,
        "Provider returned an error response"
    );

    Err(request_failed(provider, status, error_type, message))
}

fn parse_retry_after_ms(headers: &HeaderMap) -> Option<i64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .map(|seconds| (seconds * 1000.0) as i64)
}

pub(crate) fn describe_send_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("HTTP request timed out: {}", err)
    } else if err.is_connect() {
        format!("Connection failed: {}", err)
    } else {
        format!("HTTP request failed: {}", err)
    }
}
