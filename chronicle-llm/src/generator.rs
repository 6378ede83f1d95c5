//! Generation pipeline: prompt, retried upstream call, parse.

use std::sync::Arc;

use chronicle_core::{ChronicleError, ChronicleResult, GenerationRequest, GenerationResult, PromptBuilder};
use tracing::Instrument;

use crate::config::GeneratorConfig;
use crate::parser::ResponseParser;
use crate::providers::build_provider;
use crate::retry::{with_retry, RetryPolicy};
use crate::CompletionProvider;

/// Produces timelines through one configured provider.
///
/// Cheap to share: holds only immutable configuration and the provider.
#[derive(Clone)]
pub struct TimelineGenerator {
    provider: Arc<dyn CompletionProvider>,
    prompts: PromptBuilder,
    retry: RetryPolicy,
}

impl TimelineGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            prompts: PromptBuilder::new(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the provider adapter and pipeline from resolved configuration.
    pub fn from_config(config: GeneratorConfig) -> ChronicleResult<Self> {
        let provider = build_provider(config.provider)?;
        Ok(Self::new(provider)
            .with_prompt_builder(PromptBuilder::new().with_famous_people(config.include_famous_people))
            .with_retry_policy(config.retry))
    }

    pub fn provider(&self) -> &Arc<dyn CompletionProvider> {
        &self.provider
    }

    /// Generate a validated timeline for `request`.
    ///
    /// Fails with a configuration error before any network call when the
    /// provider has no credential.
    pub async fn generate(&self, request: &GenerationRequest) -> ChronicleResult<GenerationResult> {
        let span = tracing::info_span!(
            "generate_timeline",
            provider = self.provider.name(),
            model = %self.provider.model_id(),
            birth_year = request.birth_year,
        );

        async {
            self.provider.ensure_configured()?;

            let prompt = self.prompts.build(request);
            let parser = ResponseParser::new(*request)
                .with_famous_people(self.prompts.includes_famous_people());
            let provider = self.provider.as_ref();

            let result = with_retry(&self.retry, |attempt| {
                let prompt = &prompt;
                async move {
                    tracing::debug!(attempt, "Calling provider");
                    let envelope = provider.call(prompt).await?;
                    parser.parse(provider, envelope)
                }
            })
            .await?;

            tracing::info!(events = result.timeline.len(), "Timeline generated");
            Ok::<_, ChronicleError>(result)
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for TimelineGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineGenerator")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model_id())
            .field("prompts", &self.prompts)
            .field("retry", &self.retry)
            .finish()
    }
}
