//! API Configuration Module
//!
//! Server-level settings: deployment environment, CORS and the whole-request
//! deadline. Loaded from environment variables once at startup.

use std::fmt;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// ENVIRONMENT
// ============================================================================

/// Deployment environment. Only development exposes failure detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    /// Parse `CHRONICLE_ENVIRONMENT`. Anything unrecognised is production.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Self::Development,
            _ => Self::Production,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => f.write_str("production"),
            Self::Development => f.write_str("development"),
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS, deadlines and error detail.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub environment: Environment,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins.
    /// Example: "https://chronicle.run,https://app.chronicle.run"
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Deadline for one generation request, retries and backoff included.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            cors_origins: Vec::new(),
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CHRONICLE_ENVIRONMENT`: "development"/"dev" or anything else (default: production)
    /// - `CHRONICLE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `CHRONICLE_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `CHRONICLE_REQUEST_TIMEOUT_SECS`: Whole-request deadline (default: 120)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = lookup("CHRONICLE_ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or_default();

        let cors_origins = lookup("CHRONICLE_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_max_age_secs = lookup("CHRONICLE_CORS_MAX_AGE_SECS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_CORS_MAX_AGE_SECS);

        let request_timeout = lookup("CHRONICLE_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));

        Self {
            environment,
            cors_origins,
            cors_max_age_secs,
            request_timeout,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn is_production(&self) -> bool {
        !self.environment.is_development()
    }
}
