//! Anthropic (Claude) completion provider implementation

use super::client::AnthropicClient;
use super::types::{ContentBlock, Message, MessageRequest, MessageResponse};
use crate::config::{ProviderConfig, ProviderKind};
use crate::providers::{invalid_response, missing_credential};
use crate::{CompletionProvider, RawEnvelope};
use async_trait::async_trait;
use chronicle_core::{ChronicleResult, Prompt};

const PROVIDER: &str = "anthropic";

/// Anthropic completion provider using Claude models.
pub struct AnthropicProvider {
    client: AnthropicClient,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    ///
    /// # Arguments
    /// * `api_key` - Anthropic API key
    /// * `model` - Model name (e.g., "claude-3-haiku-20240307", "claude-3-5-sonnet-20241022")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> ChronicleResult<Self> {
        let api_key = api_key.into();
        Self::from_config(ProviderConfig::new(ProviderKind::Anthropic, Some(&api_key)).with_model(model))
    }

    /// Create provider from resolved configuration.
    pub fn from_config(config: ProviderConfig) -> ChronicleResult<Self> {
        Ok(Self {
            client: AnthropicClient::new(config.api_key, config.base_url, config.timeout)?,
            model: config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn build_request(&self, prompt: &Prompt) -> MessageRequest {
        MessageRequest {
            model: self.model.clone(),
            system: Some(prompt.system.clone()),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.user.clone(),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Extract text from content blocks.
    fn extract_text(content: Vec<ContentBlock>) -> String {
        content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
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
            Err(missing_credential(ProviderKind::Anthropic))
        }
    }

    async fn call(&self, prompt: &Prompt) -> ChronicleResult<RawEnvelope> {
        let request = self.build_request(prompt);
        tracing::debug!(provider = PROVIDER, model = %self.model, "Sending messages request");
        self.client.request("messages", &request).await
    }

    fn extract_completion(&self, envelope: RawEnvelope) -> ChronicleResult<String> {
        let response: MessageResponse = serde_json::from_value(envelope.0)
            .map_err(|e| invalid_response(PROVIDER, format!("Unexpected envelope shape: {}", e)))?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                provider = PROVIDER,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Messages usage"
            );
        }

        let text = Self::extract_text(response.content);
        if text.trim().is_empty() {
            return Err(invalid_response(PROVIDER, "Response contained no text content"));
        }
        Ok(text)
    }
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("model", &self.model)
            .finish()
    }
}
