//! Chronicle API - HTTP Layer
//!
//! Axum server exposing `POST /api/generate`, which turns a birth date into
//! a validated historical timeline, plus Kubernetes-style health checks.
//! Generation itself lives in `chronicle-llm`; this crate validates input,
//! enforces the request deadline and classifies failures into responses.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::{ApiConfig, Environment};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
pub use state::AppState;
