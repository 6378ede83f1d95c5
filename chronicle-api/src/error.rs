//! Error Types for Chronicle API
//!
//! This module maps pipeline failures to HTTP responses:
//! - ErrorCode enum for categorizing errors
//! - ApiError with the user-facing message
//! - `ApiError::classify` choosing the category for a `ChronicleError`
//!
//! Every error body is `{"error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chronicle_core::{ChronicleError, ConfigError, LlmError, ValidationError};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::config::Environment;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each code maps to one HTTP status and one user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// `birthDate` is absent or blank
    MissingField,

    /// `birthDate` is not a date, or lies in a future year
    InvalidInput,

    /// Request body is not a JSON object
    InvalidBody,

    // ========================================================================
    // Generation Errors (500)
    // ========================================================================
    /// Provider credential is not configured
    ConfigurationMissing,

    /// Provider account is out of quota or credit
    QuotaExceeded,

    /// Provider kept rate limiting
    RateLimited,

    /// Provider returned an error or could not be reached
    UpstreamError,

    /// Model output could not be parsed into a timeline
    ParseFailed,

    /// Retries ran out without a more specific cause
    RetriesExhausted,

    /// Whole-request deadline exceeded
    Timeout,

    /// Anything else
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::MissingField | ErrorCode::InvalidInput | ErrorCode::InvalidBody => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::ConfigurationMissing
            | ErrorCode::QuotaExceeded
            | ErrorCode::RateLimited
            | ErrorCode::UpstreamError
            | ErrorCode::ParseFailed
            | ErrorCode::RetriesExhausted
            | ErrorCode::Timeout
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the user-facing message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::MissingField => "Birth date is required",
            ErrorCode::InvalidInput => "Birth date is invalid",
            ErrorCode::InvalidBody => "Request body must be a JSON object",
            ErrorCode::ConfigurationMissing => "Provider API key is not configured",
            ErrorCode::QuotaExceeded => "Usage limit reached; check billing",
            ErrorCode::RateLimited => "Rate limited; retry later",
            ErrorCode::UpstreamError => "Upstream error; retry later",
            ErrorCode::ParseFailed => "Response parsing failed; retry",
            ErrorCode::RetriesExhausted => "Repeated connection failures; check configuration",
            ErrorCode::Timeout => "Generation timed out; retry later",
            ErrorCode::InternalError => "Failed to generate timeline",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::MissingField => "MISSING_FIELD",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::InvalidBody => "INVALID_BODY",
            ErrorCode::ConfigurationMissing => "CONFIGURATION_MISSING",
            ErrorCode::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::UpstreamError => "UPSTREAM_ERROR",
            ErrorCode::ParseFailed => "PARSE_FAILED",
            ErrorCode::RetriesExhausted => "RETRIES_EXHAUSTED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// API ERROR
// ============================================================================

/// API error returned to clients.
///
/// Serializes to `{"error": message}`; the code only selects the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    /// Create a new ApiError with a custom message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create an ApiError carrying the code's default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn invalid_body() -> Self {
        Self::from_code(ErrorCode::InvalidBody)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Choose the response for a pipeline failure.
    ///
    /// Precedence, most specific first: missing credential, quota, rate
    /// limit, upstream or transport, malformed output, bare retry
    /// exhaustion, input validation, deadline. Development appends the
    /// technical message.
    pub fn classify(err: &ChronicleError, environment: Environment) -> Self {
        let code = classify_code(err);
        let message = if environment.is_development() {
            format!("{} (detail: {})", code.default_message(), err)
        } else {
            code.default_message().to_string()
        };
        Self::new(code, message)
    }
}

fn classify_code(err: &ChronicleError) -> ErrorCode {
    match err {
        ChronicleError::Config(ConfigError::MissingCredential { .. }) => {
            ErrorCode::ConfigurationMissing
        }
        ChronicleError::Llm(llm) if llm.is_quota_exhausted() => ErrorCode::QuotaExceeded,
        ChronicleError::Llm(llm) if llm.is_rate_limit_signal() => ErrorCode::RateLimited,
        ChronicleError::Llm(llm) => match llm.root_cause() {
            LlmError::RequestFailed { .. } | LlmError::Network { .. } => ErrorCode::UpstreamError,
            LlmError::InvalidResponse { .. } => ErrorCode::ParseFailed,
            LlmError::RetriesExhausted { .. } => ErrorCode::RetriesExhausted,
            LlmError::RateLimited { .. } => ErrorCode::RateLimited,
        },
        ChronicleError::Validation(ValidationError::RequiredFieldMissing { .. }) => {
            ErrorCode::MissingField
        }
        ChronicleError::Validation(_) => ErrorCode::InvalidInput,
        ChronicleError::Timeout { .. } => ErrorCode::Timeout,
        ChronicleError::Config(_) => ErrorCode::InternalError,
    }
}

impl Serialize for ApiError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            error: &'a str,
        }
        Body {
            error: &self.message,
        }
        .serialize(serializer)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Implement IntoResponse for ApiError to enable automatic error handling in Axum.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

impl From<ChronicleError> for ApiError {
    fn from(err: ChronicleError) -> Self {
        ApiError::classify(&err, Environment::Production)
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
