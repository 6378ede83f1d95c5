//! REST API Routes Module
//!
//! Assembles the generation endpoint and health checks into one router with
//! CORS and request tracing.

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::state::AppState;

pub mod generate;
pub mod health;

/// Create the complete API router.
///
/// - `POST /api/generate`
/// - `GET /health/{ping,live,ready}`
pub fn create_api_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config);

    Router::new()
        .nest("/api", generate::create_router())
        .nest("/health", health::create_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build CORS layer from configuration.
///
/// Empty `cors_origins` allows any origin.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!("CORS: allowing origins: {:?}", config.cors_origins);
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}
