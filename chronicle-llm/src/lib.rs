//! Chronicle LLM - Provider Adapter Layer
//!
//! Provider-agnostic trait for text completion, concrete Anthropic and OpenAI
//! adapters, the retry controller and the response parser. The
//! [`TimelineGenerator`] composes them into the generation pipeline.

pub mod config;
pub mod generator;
pub mod parser;
pub mod providers;
pub mod retry;

use async_trait::async_trait;
use chronicle_core::{ChronicleResult, Prompt};

pub use config::{GeneratorConfig, ProviderConfig, ProviderKind};
pub use generator::TimelineGenerator;
pub use parser::ResponseParser;
pub use providers::{build_provider, AnthropicProvider, OpenAIProvider};
pub use retry::{with_retry, BackoffStrategy, RetryPolicy, DEFAULT_MAX_ATTEMPTS};

// ============================================================================
// RAW ENVELOPE
// ============================================================================

/// Successful provider response body, not yet interpreted.
///
/// Its shape is provider specific; only the provider that produced it knows
/// where the completion text lives.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEnvelope(pub serde_json::Value);

// ============================================================================
// COMPLETION PROVIDER TRAIT
// ============================================================================

/// Trait for text-completion providers.
/// Implementations must be thread-safe (Send + Sync).
///
/// # Example
/// ```ignore
/// struct ClaudeCompletion { /* ... */ }
///
/// #[async_trait]
/// impl CompletionProvider for ClaudeCompletion {
///     async fn call(&self, prompt: &Prompt) -> ChronicleResult<RawEnvelope> {
///         // POST to the Messages API
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name used in logs and errors (e.g. "anthropic").
    fn name(&self) -> &'static str;

    /// Model identifier sent with every request.
    fn model_id(&self) -> &str;

    /// Fail with `ConfigError::MissingCredential` when no credential is set.
    ///
    /// Never touches the network.
    fn ensure_configured(&self) -> ChronicleResult<()>;

    /// Issue exactly one completion request.
    ///
    /// # Arguments
    /// * `prompt` - System and user instructions
    ///
    /// # Returns
    /// * `Ok(RawEnvelope)` - The provider's response body on 2xx
    /// * `Err(ChronicleError::Config)` - If the credential is missing (no request is sent)
    /// * `Err(ChronicleError::Llm)` - Rate limiting, upstream, network or non-JSON body failures
    async fn call(&self, prompt: &Prompt) -> ChronicleResult<RawEnvelope>;

    /// Pull the completion text out of this provider's envelope.
    ///
    /// # Returns
    /// * `Err(LlmError::InvalidResponse)` - If the envelope lacks the expected fields
    fn extract_completion(&self, envelope: RawEnvelope) -> ChronicleResult<String>;
}
