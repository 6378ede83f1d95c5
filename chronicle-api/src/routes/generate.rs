//! Timeline Generation Endpoint
//!
//! `POST /api/generate` with `{"birthDate": "<ISO-8601 date>"}`.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono::{Datelike, Utc};
use chronicle_core::{
    ChronicleError, ChronicleResult, GenerationRequest, GenerationResult, ValidationError,
    BIRTH_DATE_FIELD,
};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /api/generate - Build a historical timeline for a birth date
pub async fn generate_timeline(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<GenerationResult>> {
    let Ok(Json(Value::Object(body))) = payload else {
        tracing::warn!("Rejected generate request with a non-object body");
        return Err(ApiError::invalid_body());
    };

    let current_year = Utc::now().year();
    let outcome = match read_birth_date(body.get(BIRTH_DATE_FIELD)) {
        Ok(birth_date) => run(&state, birth_date, current_year).await,
        Err(err) => Err(err),
    };

    outcome.map(Json).map_err(|err| {
        let api_error = ApiError::classify(&err, state.config.environment);
        tracing::error!(
            kind = ?err.kind(),
            message = %api_error.message,
            detail = %err,
            "Timeline generation failed"
        );
        api_error
    })
}

async fn run(
    state: &AppState,
    birth_date: Option<&str>,
    current_year: i32,
) -> ChronicleResult<GenerationResult> {
    let request = GenerationRequest::from_input(birth_date, current_year)?;
    let deadline = state.config.request_timeout;

    match tokio::time::timeout(deadline, state.generator.generate(&request)).await {
        Ok(result) => {
            if let Ok(result) = &result {
                tracing::info!(
                    birth_year = request.birth_year,
                    events = result.timeline.len(),
                    "Generate request completed"
                );
            }
            result
        }
        Err(_) => Err(ChronicleError::Timeout {
            elapsed_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Absent and `null` both count as missing; any other non-string is invalid.
fn read_birth_date(value: Option<&Value>) -> ChronicleResult<Option<&str>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => Ok(Some(raw.as_str())),
        Some(other) => Err(ValidationError::InvalidValue {
            field: BIRTH_DATE_FIELD.to_string(),
            reason: format!("expected a string, got {}", other),
        }
        .into()),
    }
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new().route("/generate", post(generate_timeline))
}
