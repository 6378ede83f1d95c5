//! Provider adapters against a local HTTP stub.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chronicle_core::{ChronicleError, ConfigError, LlmError, Prompt};
use chronicle_llm::{
    build_provider, CompletionProvider, ProviderConfig, ProviderKind, RawEnvelope,
};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
struct Captured {
    headers: HeaderMap,
    body: Value,
}

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    body: Value,
    extra_headers: Vec<(&'static str, &'static str)>,
    captured: Arc<Mutex<Vec<Captured>>>,
}

async fn handle(State(stub): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    stub.captured.lock().unwrap().push(Captured { headers, body });
    let mut response = (stub.status, Json(stub.body.clone())).into_response();
    for (name, value) in &stub.extra_headers {
        response
            .headers_mut()
            .insert(*name, value.parse().unwrap());
    }
    response
}

/// Serve `status`/`body` on both provider endpoints and return the base URL.
async fn spawn_stub(
    status: StatusCode,
    body: Value,
    extra_headers: Vec<(&'static str, &'static str)>,
) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let stub = Stub {
        status,
        body,
        extra_headers,
        captured: captured.clone(),
    };
    let app = Router::new()
        .route("/v1/messages", post(handle))
        .route("/v1/chat/completions", post(handle))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1", addr), captured)
}

fn provider(kind: ProviderKind, base_url: &str, api_key: Option<&str>) -> Arc<dyn CompletionProvider> {
    build_provider(
        ProviderConfig::new(kind, api_key)
            .with_base_url(base_url)
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

fn prompt() -> Prompt {
    Prompt {
        system: "system instruction".to_string(),
        user: "Date of birth: 1990-05-15".to_string(),
    }
}

fn anthropic_success() -> Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-haiku-20240307",
        "content": [{"type": "text", "text": "{\"timeline\":[]}"}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 12, "output_tokens": 34}
    })
}

#[tokio::test]
async fn anthropic_success_sends_expected_headers_and_body() {
    let (base_url, captured) = spawn_stub(StatusCode::OK, anthropic_success(), vec![]).await;
    let provider = provider(ProviderKind::Anthropic, &base_url, Some("sk-ant-test"));

    let envelope = provider.call(&prompt()).await.unwrap();
    assert_eq!(envelope, RawEnvelope(anthropic_success()));
    assert_eq!(provider.extract_completion(envelope).unwrap(), "{\"timeline\":[]}");

    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    let request = &captured[0];
    assert_eq!(request.headers["x-api-key"], "sk-ant-test");
    assert_eq!(request.headers["anthropic-version"], "2023-06-01");
    assert!(request.headers["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    assert_eq!(request.body["model"], "claude-3-haiku-20240307");
    assert_eq!(request.body["max_tokens"], 2000);
    assert_eq!(request.body["system"], "system instruction");
    assert_eq!(request.body["messages"][0]["content"], "Date of birth: 1990-05-15");
}

#[tokio::test]
async fn anthropic_429_maps_to_rate_limited_with_hint() {
    let (base_url, _) = spawn_stub(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"type": "error", "error": {"type": "rate_limit_error", "message": "Slow down"}}),
        vec![("retry-after", "3")],
    )
    .await;
    let provider = provider(ProviderKind::Anthropic, &base_url, Some("sk-ant-test"));

    let err = provider.call(&prompt()).await.unwrap_err();
    assert_eq!(
        err,
        ChronicleError::Llm(LlmError::RateLimited {
            provider: "anthropic".to_string(),
            retry_after_ms: Some(3000),
        })
    );
}

#[tokio::test]
async fn anthropic_500_maps_to_request_failed_with_body_fields() {
    let (base_url, _) = spawn_stub(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"type": "error", "error": {"type": "api_error", "message": "Internal failure"}}),
        vec![],
    )
    .await;
    let provider = provider(ProviderKind::Anthropic, &base_url, Some("sk-ant-test"));

    match provider.call(&prompt()).await.unwrap_err() {
        ChronicleError::Llm(LlmError::RequestFailed {
            provider,
            status,
            status_text,
            error_type,
            message,
        }) => {
            assert_eq!(provider, "anthropic");
            assert_eq!(status, 500);
            assert_eq!(status_text, "Internal Server Error");
            assert_eq!(error_type.as_deref(), Some("api_error"));
            assert_eq!(message, "Internal failure");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn anthropic_credit_balance_error_is_quota() {
    let (base_url, _) = spawn_stub(
        StatusCode::BAD_REQUEST,
        json!({"type": "error", "error": {"type": "invalid_request_error", "message": "Your credit balance is too low to access the Anthropic API."}}),
        vec![],
    )
    .await;
    let provider = provider(ProviderKind::Anthropic, &base_url, Some("sk-ant-test"));

    match provider.call(&prompt()).await.unwrap_err() {
        ChronicleError::Llm(err) => assert!(err.is_quota_exhausted()),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn openai_success_uses_bearer_auth() {
    let body = json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"timeline\":[]}"}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    });
    let (base_url, captured) = spawn_stub(StatusCode::OK, body, vec![]).await;
    let provider = provider(ProviderKind::OpenAI, &base_url, Some("sk-openai"));

    let envelope = provider.call(&prompt()).await.unwrap();
    assert_eq!(provider.extract_completion(envelope).unwrap(), "{\"timeline\":[]}");

    let captured = captured.lock().unwrap();
    assert_eq!(captured[0].headers["authorization"], "Bearer sk-openai");
    assert_eq!(captured[0].body["model"], "gpt-4o-mini");
    assert_eq!(captured[0].body["messages"][0]["role"], "system");
}

#[tokio::test]
async fn openai_quota_429_is_not_a_rate_limit() {
    let (base_url, _) = spawn_stub(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"message": "You exceeded your current quota", "type": "insufficient_quota", "code": "insufficient_quota"}}),
        vec![],
    )
    .await;
    let provider = provider(ProviderKind::OpenAI, &base_url, Some("sk-openai"));

    match provider.call(&prompt()).await.unwrap_err() {
        ChronicleError::Llm(err @ LlmError::RequestFailed { status: 429, .. }) => {
            assert!(err.is_quota_exhausted());
            assert!(!err.is_rate_limit_signal());
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn openai_plain_429_is_rate_limited() {
    let (base_url, _) = spawn_stub(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}}),
        vec![],
    )
    .await;
    let provider = provider(ProviderKind::OpenAI, &base_url, Some("sk-openai"));

    assert!(matches!(
        provider.call(&prompt()).await.unwrap_err(),
        ChronicleError::Llm(LlmError::RateLimited { retry_after_ms: None, .. })
    ));
}

#[tokio::test]
async fn missing_credential_sends_nothing() {
    let (base_url, captured) = spawn_stub(StatusCode::OK, anthropic_success(), vec![]).await;

    for kind in [ProviderKind::Anthropic, ProviderKind::OpenAI] {
        let provider = provider(kind, &base_url, None);
        assert!(matches!(
            provider.ensure_configured().unwrap_err(),
            ChronicleError::Config(ConfigError::MissingCredential { .. })
        ));
        assert!(matches!(
            provider.call(&prompt()).await.unwrap_err(),
            ChronicleError::Config(ConfigError::MissingCredential { .. })
        ));
    }

    assert!(captured.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_upstream_is_network_error() {
    // bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider = provider(
        ProviderKind::Anthropic,
        &format!("http://{}/v1", addr),
        Some("sk-ant-test"),
    );
    assert!(matches!(
        provider.call(&prompt()).await.unwrap_err(),
        ChronicleError::Llm(LlmError::Network { .. })
    ));
}

#[tokio::test]
async fn non_json_success_body_is_invalid_response() {
    let app = Router::new().route("/v1/messages", post(|| async { "<html>maintenance</html>" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let provider = provider(
        ProviderKind::Anthropic,
        &format!("http://{}/v1", addr),
        Some("sk-ant-test"),
    );
    assert!(matches!(
        provider.call(&prompt()).await.unwrap_err(),
        ChronicleError::Llm(LlmError::InvalidResponse { .. })
    ));
}
