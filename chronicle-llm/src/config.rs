//! Provider and pipeline configuration.
//!
//! Configuration is resolved once at process start from environment
//! variables and then injected into the provider adapters. Nothing in the
//! request path reads the environment.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chronicle_core::{ChronicleError, ChronicleResult, ConfigError};
use secrecy::SecretString;

use crate::retry::RetryPolicy;

const DEFAULT_MAX_TOKENS: u32 = 2000;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// PROVIDER KIND
// ============================================================================

/// Supported upstream LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderKind {
    #[default]
    Anthropic,
    OpenAI,
}

impl ProviderKind {
    /// Short name used in logs and error values.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAI => "openai",
        }
    }

    /// Human-facing provider name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Anthropic => "Anthropic",
            Self::OpenAI => "OpenAI",
        }
    }

    /// Environment variable holding this provider's credential.
    pub fn credential_variable(&self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => "claude-3-haiku-20240307",
            Self::OpenAI => "gpt-4o-mini",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::OpenAI => "https://api.openai.com/v1",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAI),
            other => Err(ConfigError::ProviderNotSupported {
                provider: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// PROVIDER CONFIGURATION
// ============================================================================

/// Everything an adapter needs to talk to its provider.
#[derive(Debug)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// `None` when the credential variable is unset or blank.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Per-call HTTP timeout.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Configuration with the provider's defaults and the given credential.
    pub fn new(kind: ProviderKind, api_key: Option<&str>) -> Self {
        Self {
            kind,
            api_key: api_key.map(secret),
            model: kind.default_model().to_string(),
            base_url: kind.default_base_url().to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create ProviderConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CHRONICLE_PROVIDER`: "anthropic" or "openai" (default: anthropic)
    /// - `ANTHROPIC_API_KEY` / `OPENAI_API_KEY`: credential for the selected provider
    /// - `CHRONICLE_MODEL`: model identifier (default: provider specific)
    /// - `CHRONICLE_PROVIDER_BASE_URL`: endpoint override
    /// - `CHRONICLE_MAX_TOKENS`: completion token cap (default: 2000)
    /// - `CHRONICLE_TEMPERATURE`: sampling temperature (default: unset)
    /// - `CHRONICLE_UPSTREAM_TIMEOUT_SECS`: per-call timeout (default: 60)
    pub fn from_env() -> ChronicleResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ProviderConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ChronicleResult<Self> {
        let kind = match non_blank(lookup("CHRONICLE_PROVIDER")) {
            Some(name) => name.parse::<ProviderKind>().map_err(ChronicleError::from)?,
            None => ProviderKind::default(),
        };

        let api_key = non_blank(lookup(kind.credential_variable()));
        let mut config = Self::new(kind, api_key.as_deref());

        if let Some(model) = non_blank(lookup("CHRONICLE_MODEL")) {
            config.model = model;
        }
        if let Some(base_url) = non_blank(lookup("CHRONICLE_PROVIDER_BASE_URL")) {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        config.max_tokens = lookup("CHRONICLE_MAX_TOKENS")
            .and_then(|s| s.trim().parse().ok())
            .filter(|tokens| *tokens > 0)
            .unwrap_or(DEFAULT_MAX_TOKENS);
        config.temperature = lookup("CHRONICLE_TEMPERATURE").and_then(|s| s.trim().parse().ok());
        config.timeout = lookup("CHRONICLE_UPSTREAM_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS));

        Ok(config)
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

// ============================================================================
// GENERATOR CONFIGURATION
// ============================================================================

/// Pipeline configuration: which provider, which prompt variant, how to retry.
#[derive(Debug)]
pub struct GeneratorConfig {
    pub provider: ProviderConfig,
    /// Ask the model for famous people sharing the birthday.
    pub include_famous_people: bool,
    pub retry: RetryPolicy,
}

impl GeneratorConfig {
    /// Create GeneratorConfig from environment variables.
    ///
    /// In addition to the [`ProviderConfig`] variables:
    /// - `CHRONICLE_INCLUDE_FAMOUS_PEOPLE`: "true" or "false" (default: false)
    pub fn from_env() -> ChronicleResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ChronicleResult<Self> {
        let include_famous_people = lookup("CHRONICLE_INCLUDE_FAMOUS_PEOPLE")
            .map(|s| matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            provider: ProviderConfig::from_lookup(&lookup)?,
            include_famous_people,
            retry: RetryPolicy::default(),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn secret(value: &str) -> SecretString {
    SecretString::new(value.to_string().into_boxed_str())
}
