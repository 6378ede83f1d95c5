//! Chronicle Test Utilities
//!
//! Shared test infrastructure for the Chronicle workspace:
//! - A scripted completion provider that replays canned outcomes
//! - Proptest generators for requests and model output
//! - Fixtures for provider envelopes and failures
//! - Assertions over results and error kinds

pub use chronicle_core::{
    ChronicleError, ChronicleResult, ConfigError, ErrorKind, FamousPerson, GenerationRequest,
    GenerationResult, LlmError, Prompt, TimelineEvent,
};
pub use chronicle_llm::{CompletionProvider, RawEnvelope};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

// ============================================================================
// SCRIPTED PROVIDER
// ============================================================================

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// 2xx with this completion text
    Completion(String),
    /// The call fails with this error
    Failure(ChronicleError),
}

/// Completion provider that replays a script instead of calling out.
///
/// Envelopes use the Anthropic Messages shape. Every call records the
/// prompt and the (tokio) instant it started.
#[derive(Debug)]
pub struct ScriptedProvider {
    configured: bool,
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<(Instant, Prompt)>>,
}

impl ScriptedProvider {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            configured: true,
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Provider with no credential. Any call is a test failure.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(Vec::new())
        }
    }

    /// Number of upstream calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }

    /// Start instants of every call, in order.
    pub fn call_instants(&self) -> Vec<Instant> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(at, _)| *at).collect())
            .unwrap_or_default()
    }

    /// Prompts received, in order.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(_, prompt)| prompt.clone()).collect())
            .unwrap_or_default()
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|script| script.len()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }

    fn ensure_configured(&self) -> ChronicleResult<()> {
        if self.configured {
            Ok(())
        } else {
            Err(fixtures::missing_credential())
        }
    }

    async fn call(&self, prompt: &Prompt) -> ChronicleResult<RawEnvelope> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((Instant::now(), prompt.clone()));
        }
        self.ensure_configured()?;

        let next = self.script.lock().ok().and_then(|mut script| script.pop_front());
        match next {
            Some(Scripted::Completion(text)) => Ok(fixtures::anthropic_envelope(&text)),
            Some(Scripted::Failure(err)) => Err(err),
            None => panic!("ScriptedProvider called more times than scripted"),
        }
    }

    fn extract_completion(&self, envelope: RawEnvelope) -> ChronicleResult<String> {
        envelope.0["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                LlmError::InvalidResponse {
                    provider: "scripted".to_string(),
                    reason: "missing content[0].text".to_string(),
                }
                .into()
            })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Chronicle inputs and model output.

    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    /// Generate a calendar date between 1900 and 2023.
    pub fn arb_birth_date() -> impl Strategy<Value = NaiveDate> {
        (1900i32..=2023, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
    }

    /// Generate a valid request with a current year of 2024.
    pub fn arb_generation_request() -> impl Strategy<Value = GenerationRequest> {
        arb_birth_date().prop_map(|date| {
            GenerationRequest::from_birth_date(date, 2024)
                .unwrap_or_else(|e| panic!("generated date rejected: {}", e))
        })
    }

    /// Generate an in-range event for `request`, possibly with a wrong age.
    pub fn arb_timeline_event(request: GenerationRequest) -> impl Strategy<Value = TimelineEvent> {
        (
            request.birth_year..=request.current_year,
            -3i32..3,
            "[A-Z][a-z]{2,20}( [a-z]{2,12}){0,5}",
            any::<bool>(),
        )
            .prop_map(move |(year, age_skew, event, is_highlighted)| TimelineEvent {
                year,
                age: request.age_in(year) + age_skew,
                event,
                is_highlighted,
            })
    }

    /// Generate a request together with a completion the parser must accept.
    pub fn arb_valid_completion() -> impl Strategy<Value = (GenerationRequest, String)> {
        arb_generation_request().prop_flat_map(|request| {
            prop::collection::vec(arb_timeline_event(request), 1..15)
                .prop_map(move |events| (request, fixtures::timeline_completion(&events)))
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built envelopes, completions and failures.

    use super::*;
    use serde_json::json;

    /// Request for someone born on 1990-05-15, evaluated in 2024.
    pub fn request_1990() -> GenerationRequest {
        GenerationRequest {
            birth_year: 1990,
            birth_month: 5,
            birth_day: 15,
            current_year: 2024,
        }
    }

    /// Serialize `events` the way a model answers.
    pub fn timeline_completion(events: &[TimelineEvent]) -> String {
        json!({ "timeline": events }).to_string()
    }

    /// Realistic completion for [`request_1990`], deliberately out of order.
    pub fn sample_completion() -> String {
        timeline_completion(&[
            TimelineEvent {
                year: 2001,
                age: 11,
                event: "September 11 attacks in the United States".to_string(),
                is_highlighted: true,
            },
            TimelineEvent {
                year: 1991,
                age: 1,
                event: "Dissolution of the Soviet Union".to_string(),
                is_highlighted: false,
            },
            TimelineEvent {
                year: 2008,
                age: 18,
                event: "Global financial crisis".to_string(),
                is_highlighted: false,
            },
        ])
    }

    /// Same as [`sample_completion`] wrapped in a Markdown code fence.
    pub fn fenced_completion() -> String {
        format!("```json\n{}\n```", sample_completion())
    }

    pub fn anthropic_envelope(text: &str) -> RawEnvelope {
        RawEnvelope(json!({
            "id": "msg_test",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-haiku-20240307",
            "content": [{ "type": "text", "text": text }],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 100, "output_tokens": 200 }
        }))
    }

    pub fn openai_envelope(text: &str) -> RawEnvelope {
        RawEnvelope(json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": text },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 100, "completion_tokens": 200, "total_tokens": 300 }
        }))
    }

    pub fn rate_limited() -> ChronicleError {
        LlmError::RateLimited {
            provider: "scripted".to_string(),
            retry_after_ms: None,
        }
        .into()
    }

    pub fn upstream_failure(status: u16, error_type: Option<&str>, message: &str) -> ChronicleError {
        LlmError::RequestFailed {
            provider: "scripted".to_string(),
            status,
            status_text: "Error".to_string(),
            error_type: error_type.map(str::to_string),
            message: message.to_string(),
        }
        .into()
    }

    pub fn quota_exhausted() -> ChronicleError {
        upstream_failure(429, Some("insufficient_quota"), "You exceeded your current quota")
    }

    pub fn network_failure() -> ChronicleError {
        LlmError::Network {
            provider: "scripted".to_string(),
            message: "Connection failed: connection refused".to_string(),
        }
        .into()
    }

    pub fn missing_credential() -> ChronicleError {
        ConfigError::MissingCredential {
            provider: "Scripted".to_string(),
            variable: "SCRIPTED_API_KEY".to_string(),
        }
        .into()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over generation results.

    use super::*;

    /// Assert a result satisfies every structural invariant for its request.
    #[track_caller]
    pub fn assert_consistent(result: &GenerationResult, request: &GenerationRequest) {
        assert!(!result.timeline.is_empty(), "timeline is empty");
        for pair in result.timeline.windows(2) {
            assert!(
                pair[0].year <= pair[1].year,
                "timeline not sorted: {} before {}",
                pair[0].year,
                pair[1].year
            );
        }
        for event in &result.timeline {
            assert!(
                request.covers(event.year),
                "year {} outside {}..={}",
                event.year,
                request.birth_year,
                request.current_year
            );
            assert_eq!(event.age, event.year - request.birth_year, "wrong age for {}", event.year);
        }
    }

    /// Assert a ChronicleResult failed with `kind`.
    #[track_caller]
    pub fn assert_error_kind<T: std::fmt::Debug>(result: &ChronicleResult<T>, kind: ErrorKind) {
        match result {
            Err(err) => assert_eq!(err.kind(), kind, "unexpected error: {:?}", err),
            Ok(value) => panic!("Expected {:?} error, got Ok: {:?}", kind, value),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
