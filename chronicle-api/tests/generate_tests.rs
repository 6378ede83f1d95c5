//! End-to-end tests for the generate endpoint against a scripted provider.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Datelike, Utc};
use chronicle_api::{create_api_router, ApiConfig, AppState, Environment};
use chronicle_llm::TimelineGenerator;
use chronicle_test_utils::assertions::assert_consistent;
use chronicle_test_utils::{fixtures, GenerationRequest, GenerationResult, Scripted, ScriptedProvider};
use serde_json::{json, Value};
use tower::ServiceExt;

const BIRTH_DATE: &str = "1990-05-15";

fn app(provider: Arc<ScriptedProvider>, config: ApiConfig) -> Router {
    let generator = TimelineGenerator::new(provider);
    create_api_router(AppState::new(generator, config))
}

fn scripted(script: Vec<Scripted>) -> Arc<ScriptedProvider> {
    Arc::new(ScriptedProvider::new(script))
}

fn request_now() -> GenerationRequest {
    GenerationRequest::from_input(Some(BIRTH_DATE), Utc::now().year()).unwrap()
}

async fn post_raw(app: Router, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("POST").uri("/api/generate");
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let response = app
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_generate(app: Router, body: Value) -> (StatusCode, Value) {
    post_raw(app, Some("application/json"), &body.to_string()).await
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

// ============================================================================
// SUCCESS PATHS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn first_attempt_success_returns_sorted_timeline() {
    let provider = scripted(vec![Scripted::Completion(fixtures::sample_completion())]);
    let (status, body) = post_generate(
        app(provider.clone(), ApiConfig::default()),
        json!({ "birthDate": BIRTH_DATE }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let result: GenerationResult = serde_json::from_value(body.clone()).unwrap();
    assert_consistent(&result, &request_now());
    let years: Vec<i32> = result.timeline.iter().map(|e| e.year).collect();
    assert_eq!(years, vec![1991, 2001, 2008]);
    assert_eq!(body["timeline"][1]["isHighlighted"], true);
    assert!(body.get("famousPeople").is_none());
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn rfc3339_birth_date_uses_date_part() {
    let provider = scripted(vec![Scripted::Completion(fixtures::fenced_completion())]);
    let (status, _) = post_generate(
        app(provider.clone(), ApiConfig::default()),
        json!({ "birthDate": "1990-05-15T08:30:00Z" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let prompts = provider.prompts();
    assert!(prompts[0].user.contains(BIRTH_DATE));
}

#[tokio::test(start_paused = true)]
async fn rate_limited_twice_then_success_backs_off_exponentially() {
    let provider = scripted(vec![
        Scripted::Failure(fixtures::rate_limited()),
        Scripted::Failure(fixtures::rate_limited()),
        Scripted::Completion(fixtures::sample_completion()),
    ]);
    let (status, body) = post_generate(
        app(provider.clone(), ApiConfig::default()),
        json!({ "birthDate": BIRTH_DATE }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timeline"].as_array().map(Vec::len), Some(3));
    assert_eq!(provider.call_count(), 3);

    let at = provider.call_instants();
    assert!(at[1] - at[0] >= Duration::from_secs(2));
    assert!(at[2] - at[1] >= Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn repeated_requests_are_independent() {
    let provider = scripted(vec![
        Scripted::Completion(fixtures::sample_completion()),
        Scripted::Completion(fixtures::sample_completion()),
    ]);
    let router = app(provider.clone(), ApiConfig::default());

    let (first_status, first) = post_generate(router.clone(), json!({ "birthDate": BIRTH_DATE })).await;
    let (second_status, second) = post_generate(router, json!({ "birthDate": BIRTH_DATE })).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    for body in [first, second] {
        let result: GenerationResult = serde_json::from_value(body).unwrap();
        assert_consistent(&result, &request_now());
    }
    assert_eq!(provider.call_count(), 2);
}

// ============================================================================
// GENERATION FAILURES
// ============================================================================

#[tokio::test(start_paused = true)]
async fn always_rate_limited_reports_rate_limit() {
    let provider = scripted(vec![
        Scripted::Failure(fixtures::rate_limited()),
        Scripted::Failure(fixtures::rate_limited()),
        Scripted::Failure(fixtures::rate_limited()),
    ]);
    let (status, body) = post_generate(
        app(provider.clone(), ApiConfig::default()),
        json!({ "birthDate": BIRTH_DATE }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Rate limited; retry later" }));
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn non_json_completion_reports_parse_failure() {
    let provider = scripted(vec![
        Scripted::Completion("I cannot help with that.".to_string()),
        Scripted::Completion("I cannot help with that.".to_string()),
        Scripted::Completion("I cannot help with that.".to_string()),
    ]);
    let (status, parse_body) = post_generate(
        app(provider.clone(), ApiConfig::default()),
        json!({ "birthDate": BIRTH_DATE }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(parse_body, json!({ "error": "Response parsing failed; retry" }));
    assert_eq!(provider.call_count(), 3);

    let transport = scripted(vec![
        Scripted::Failure(fixtures::network_failure()),
        Scripted::Failure(fixtures::network_failure()),
        Scripted::Failure(fixtures::network_failure()),
    ]);
    let (_, transport_body) = post_generate(
        app(transport, ApiConfig::default()),
        json!({ "birthDate": BIRTH_DATE }),
    )
    .await;
    assert_ne!(parse_body, transport_body);
    assert_eq!(transport_body, json!({ "error": "Upstream error; retry later" }));
}

#[tokio::test(start_paused = true)]
async fn quota_exhaustion_reports_billing() {
    let provider = scripted(vec![
        Scripted::Failure(fixtures::quota_exhausted()),
        Scripted::Failure(fixtures::quota_exhausted()),
        Scripted::Failure(fixtures::quota_exhausted()),
    ]);
    let (status, body) = post_generate(
        app(provider, ApiConfig::default()),
        json!({ "birthDate": BIRTH_DATE }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Usage limit reached; check billing" }));
}

#[tokio::test(start_paused = true)]
async fn missing_credential_makes_no_calls() {
    let provider = Arc::new(ScriptedProvider::unconfigured());
    let (status, body) = post_generate(
        app(provider.clone(), ApiConfig::default()),
        json!({ "birthDate": BIRTH_DATE }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Provider API key is not configured" }));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn deadline_exceeded_reports_timeout() {
    let provider = scripted(vec![
        Scripted::Failure(fixtures::rate_limited()),
        Scripted::Failure(fixtures::rate_limited()),
        Scripted::Failure(fixtures::rate_limited()),
    ]);
    let config = ApiConfig::default().with_request_timeout(Duration::from_secs(5));
    let (status, body) = post_generate(
        app(provider.clone(), config),
        json!({ "birthDate": BIRTH_DATE }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Generation timed out; retry later" }));
    // second backoff (4s) would end past the 5s deadline
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn development_appends_detail() {
    let failure = fixtures::upstream_failure(503, Some("overloaded_error"), "Overloaded");
    let provider = scripted(vec![
        Scripted::Failure(failure.clone()),
        Scripted::Failure(failure.clone()),
        Scripted::Failure(failure),
    ]);
    let config = ApiConfig::default().with_environment(Environment::Development);
    let (status, body) = post_generate(
        app(provider, config),
        json!({ "birthDate": BIRTH_DATE }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Upstream error; retry later (detail: "));
    assert!(message.contains("Overloaded"));
}

// ============================================================================
// INPUT VALIDATION
// ============================================================================

#[tokio::test]
async fn missing_birth_date_is_bad_request() {
    for body in [json!({}), json!({ "birthDate": null }), json!({ "birthDate": "  " })] {
        let provider = scripted(Vec::new());
        let (status, response) = post_generate(app(provider.clone(), ApiConfig::default()), body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({ "error": "Birth date is required" }));
        assert_eq!(provider.call_count(), 0);
    }
}

#[tokio::test]
async fn invalid_birth_date_is_bad_request() {
    for body in [
        json!({ "birthDate": "15/05/1990" }),
        json!({ "birthDate": "1990-02-30" }),
        json!({ "birthDate": 19900515 }),
        json!({ "birthDate": "2999-01-01" }),
    ] {
        let provider = scripted(Vec::new());
        let (status, response) = post_generate(app(provider.clone(), ApiConfig::default()), body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({ "error": "Birth date is invalid" }));
        assert_eq!(provider.call_count(), 0);
    }
}

#[tokio::test]
async fn non_object_body_is_bad_request() {
    let cases: [(Option<&str>, &str); 3] = [
        (Some("application/json"), "not json"),
        (Some("application/json"), "[1, 2, 3]"),
        (None, "{\"birthDate\": \"1990-05-15\"}"),
    ];
    for (content_type, raw) in cases {
        let provider = scripted(Vec::new());
        let (status, response) = post_raw(app(provider.clone(), ApiConfig::default()), content_type, raw).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({ "error": "Request body must be a JSON object" }));
        assert_eq!(provider.call_count(), 0);
    }
}

// ============================================================================
// HEALTH AND CORS
// ============================================================================

#[tokio::test]
async fn health_ping_and_live() {
    let router = app(scripted(Vec::new()), ApiConfig::default());

    let (status, body) = get(router.clone(), "/health/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"pong");

    let (status, body) = get(router, "/health/live").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn readiness_reports_provider() {
    let (status, body) = get(app(scripted(Vec::new()), ApiConfig::default()), "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["details"]["provider"]["name"], "scripted");
    assert_eq!(json["details"]["provider"]["model"], "scripted-model");
    assert_eq!(json["details"]["provider"]["credential_configured"], true);
    assert_eq!(json["details"]["environment"], "production");
}

#[tokio::test]
async fn readiness_degraded_without_credential() {
    let provider = Arc::new(ScriptedProvider::unconfigured());
    let (status, body) = get(app(provider, ApiConfig::default()), "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["details"]["provider"]["credential_configured"], false);
}

#[tokio::test]
async fn cors_allows_any_origin_by_default() {
    let response = app(scripted(Vec::new()), ApiConfig::default())
        .oneshot(
            Request::builder()
                .uri("/health/ping")
                .header(header::ORIGIN, "https://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
