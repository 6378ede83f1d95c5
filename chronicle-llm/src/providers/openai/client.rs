//! OpenAI HTTP client

use std::time::Duration;

use chronicle_core::ChronicleResult;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::ProviderKind;
use crate::providers::{describe_send_error, http_client, missing_credential, network_error, read_envelope};
use crate::RawEnvelope;

const PROVIDER: &str = "openai";

/// OpenAI API client. One HTTP request per call, no internal retries.
pub struct OpenAIClient {
    client: Client,
    api_key: Option<SecretString>,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client.
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key, or `None` when unconfigured
    /// * `base_url` - API root, e.g. "https://api.openai.com/v1"
    /// * `timeout` - Per-request timeout
    pub fn new(
        api_key: Option<SecretString>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> ChronicleResult<Self> {
        Ok(Self {
            client: http_client(ProviderKind::OpenAI, timeout)?,
            api_key,
            base_url: base_url.into(),
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Make one API request.
    pub async fn request<Req: Serialize>(&self, endpoint: &str, body: &Req) -> ChronicleResult<RawEnvelope> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| missing_credential(ProviderKind::OpenAI))?;

        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key.expose_secret()))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, describe_send_error(&e)))?;

        read_envelope(PROVIDER, response).await
    }
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
