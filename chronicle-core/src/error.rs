//! Error types for Chronicle operations

use thiserror::Error;

/// Error markers a provider uses when an account has run out of quota or credit.
const QUOTA_MARKERS: &[&str] = &["insufficient_quota", "billing_error", "credit balance"];

/// Error markers a provider uses for rate limiting outside of HTTP 429.
const RATE_LIMIT_MARKERS: &[&str] = &["rate_limit_error", "rate_limit_exceeded"];

/// Request validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Birth year {birth_year} is after the current year {current_year}")]
    BirthYearInFuture { birth_year: i32, current_year: i32 },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{provider} API key not configured (set {variable})")]
    MissingCredential { provider: String, variable: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Provider not supported: {provider}")]
    ProviderNotSupported { provider: String },
}

/// LLM provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("Rate limited by {provider}")]
    RateLimited {
        provider: String,
        retry_after_ms: Option<i64>,
    },

    #[error("{provider} API error: {status} {status_text} - {message}")]
    RequestFailed {
        provider: String,
        status: u16,
        status_text: String,
        error_type: Option<String>,
        message: String,
    },

    #[error("Network error reaching {provider}: {message}")]
    Network { provider: String, message: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Max retries exceeded after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        last_error: Option<Box<LlmError>>,
    },
}

impl LlmError {
    /// Innermost failure, looking through `RetriesExhausted`.
    pub fn root_cause(&self) -> &LlmError {
        match self {
            LlmError::RetriesExhausted {
                last_error: Some(inner),
                ..
            } => inner.root_cause(),
            other => other,
        }
    }

    /// Whether the provider reported an exhausted quota or billing problem.
    pub fn is_quota_exhausted(&self) -> bool {
        match self.root_cause() {
            LlmError::RequestFailed {
                error_type,
                message,
                ..
            } => {
                let error_type = error_type.as_deref().unwrap_or_default();
                let message = message.to_lowercase();
                QUOTA_MARKERS
                    .iter()
                    .any(|marker| error_type == *marker || message.contains(marker))
            }
            _ => false,
        }
    }

    /// Whether the failure carries a rate-limit signal from the provider.
    pub fn is_rate_limit_signal(&self) -> bool {
        match self.root_cause() {
            LlmError::RateLimited { .. } => true,
            LlmError::RequestFailed {
                error_type,
                message,
                ..
            } => RATE_LIMIT_MARKERS.iter().any(|marker| {
                error_type.as_deref() == Some(*marker) || message.contains(marker)
            }),
            _ => false,
        }
    }
}

/// Flat classification of every failure the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Configuration,
    RateLimited,
    Upstream,
    Network,
    MalformedResponse,
    RetriesExhausted,
    Timeout,
}

/// Master error type for all Chronicle errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChronicleError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Generation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

impl ChronicleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChronicleError::Validation(_) => ErrorKind::Validation,
            ChronicleError::Config(_) => ErrorKind::Configuration,
            ChronicleError::Timeout { .. } => ErrorKind::Timeout,
            ChronicleError::Llm(err) => match err {
                LlmError::RateLimited { .. } => ErrorKind::RateLimited,
                LlmError::RequestFailed { .. } => ErrorKind::Upstream,
                LlmError::Network { .. } => ErrorKind::Network,
                LlmError::InvalidResponse { .. } => ErrorKind::MalformedResponse,
                LlmError::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            },
        }
    }

    /// Terminal errors are never worth another attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation
                | ErrorKind::Configuration
                | ErrorKind::Timeout
                | ErrorKind::RetriesExhausted
        )
    }
}

/// Result type alias for Chronicle operations.
pub type ChronicleResult<T> = Result<T, ChronicleError>;

// =============================================================================
// TESTS
// =============================================================================
