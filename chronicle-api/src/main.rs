//! Chronicle API Server Entry Point
//!
//! Resolves provider and server configuration from the environment and
//! starts the Axum HTTP server.

use std::net::SocketAddr;

use axum::Router;
use chronicle_api::telemetry::{init_tracing, TelemetryConfig};
use chronicle_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState};
use chronicle_llm::{GeneratorConfig, TimelineGenerator};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::from_env())?;

    let generator = GeneratorConfig::from_env()
        .and_then(TimelineGenerator::from_config)
        .map_err(|e| ApiError::internal_error(format!("Invalid provider configuration: {}", e)))?;

    let provider = generator.provider();
    if let Err(e) = provider.ensure_configured() {
        tracing::warn!(
            provider = provider.name(),
            error = %e,
            "Provider credential missing; generation requests will fail"
        );
    }
    tracing::info!(provider = provider.name(), model = %provider.model_id(), "Provider configured");

    let api_config = ApiConfig::from_env();
    tracing::info!(
        environment = %api_config.environment,
        request_timeout_secs = api_config.request_timeout.as_secs(),
        "API configured"
    );

    let app: Router = create_api_router(AppState::new(generator, api_config));

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Chronicle API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("CHRONICLE_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("CHRONICLE_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::internal_error(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::internal_error(format!("Invalid bind address {}: {}", addr, e)))
}
