//! Tracing Subscriber Initialization
//!
//! Installs one global subscriber: `EnvFilter` from `RUST_LOG` plus a
//! formatting layer, JSON by default.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str = "chronicle_api=debug,chronicle_llm=debug,tower_http=debug,info";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Deployment environment label
    pub environment: String,
    /// Emit JSON lines (default) or human-readable text
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl TelemetryConfig {
    /// Environment variables:
    /// - `CHRONICLE_SERVICE_NAME` (default: "chronicle-api")
    /// - `CHRONICLE_ENVIRONMENT` (default: "production")
    /// - `CHRONICLE_LOG_FORMAT`: "json" or "text" (default: json)
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            service_name: lookup("CHRONICLE_SERVICE_NAME")
                .unwrap_or_else(|| "chronicle-api".to_string()),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: lookup("CHRONICLE_ENVIRONMENT")
                .unwrap_or_else(|| "production".to_string()),
            json: lookup("CHRONICLE_LOG_FORMAT")
                .map(|s| !s.trim().eq_ignore_ascii_case("text"))
                .unwrap_or(true),
        }
    }
}

/// Initialize the tracing subscriber.
///
/// Call once at startup, before any events are emitted. A second call
/// fails because a global subscriber is already set.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = config.service_name,
        service_version = config.service_version,
        environment = config.environment,
        json = config.json,
        "Telemetry initialized"
    );

    Ok(())
}
