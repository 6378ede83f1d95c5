//! Anthropic HTTP client

use std::time::Duration;

use chronicle_core::ChronicleResult;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::ProviderKind;
use crate::providers::{describe_send_error, http_client, missing_credential, network_error, read_envelope};
use crate::RawEnvelope;

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

/// Anthropic API client. Issues exactly one HTTP request per call.
pub struct AnthropicClient {
    client: Client,
    api_key: Option<SecretString>,
    base_url: String,
}

impl AnthropicClient {
    /// Create a new Anthropic client.
    ///
    /// # Arguments
    /// * `api_key` - Anthropic API key; `None` makes every request fail with a configuration error
    /// * `base_url` - API root, e.g. "https://api.anthropic.com/v1"
    /// * `timeout` - Per-request timeout
    pub fn new(
        api_key: Option<SecretString>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> ChronicleResult<Self> {
        Ok(Self {
            client: http_client(ProviderKind::Anthropic, timeout)?,
            api_key,
            base_url: base_url.into(),
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> ChronicleResult<&SecretString> {
        self.api_key
            .as_ref()
            .ok_or_else(|| missing_credential(ProviderKind::Anthropic))
    }

    /// Make one API request.
    pub async fn request<Req: Serialize>(&self, endpoint: &str, body: &Req) -> ChronicleResult<RawEnvelope> {
        let api_key = self.api_key()?;

        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, describe_send_error(&e)))?;

        read_envelope(PROVIDER, response).await
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
