//! OpenAI chat completion provider implementation

use super::client::OpenAIClient;
use super::types::{CompletionRequest, CompletionResponse, Message};
use crate::config::{ProviderConfig, ProviderKind};
use crate::providers::{invalid_response, missing_credential};
use crate::{CompletionProvider, RawEnvelope};
use async_trait::async_trait;
use chronicle_core::{ChronicleResult, Prompt};

const PROVIDER: &str = "openai";

/// OpenAI completion provider using GPT models.
pub struct OpenAIProvider {
    client: OpenAIClient,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (e.g., "gpt-4o-mini", "gpt-4o")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> ChronicleResult<Self> {
        let api_key = api_key.into();
        Self::from_config(ProviderConfig::new(ProviderKind::OpenAI, Some(&api_key)).with_model(model))
    }

    pub fn from_config(config: ProviderConfig) -> ChronicleResult<Self> {
        Ok(Self {
            client: OpenAIClient::new(config.api_key, config.base_url, config.timeout)?,
            model: config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn build_request(&self, prompt: &Prompt) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: Some(prompt.system.clone()),
                },
                Message {
                    role: "user".to_string(),
                    content: Some(prompt.user.clone()),
                },
            ],
            max_tokens: Some(self.max_tokens),
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn ensure_configured(&self) -> ChronicleResult<()> {
        if self.client.has_credential() {
            Ok(())
        } else {
            Err(missing_credential(ProviderKind::OpenAI))
        }
    }

    async fn call(&self, prompt: &Prompt) -> ChronicleResult<RawEnvelope> {
        let request = self.build_request(prompt);
        tracing::debug!(provider = PROVIDER, model = %self.model, "Sending chat completion request");
        self.client.request("chat/completions", &request).await
    }

    fn extract_completion(&self, envelope: RawEnvelope) -> ChronicleResult<String> {
        let response: CompletionResponse = serde_json::from_value(envelope.0)
            .map_err(|e| invalid_response(PROVIDER, format!("Unexpected envelope shape: {}", e)))?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                provider = PROVIDER,
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                total_tokens = ?usage.total_tokens,
                "Chat completion usage"
            );
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| invalid_response(PROVIDER, "No completion content in choices"))
    }
}

impl std::fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field("model", &self.model)
            .finish()
    }
}
