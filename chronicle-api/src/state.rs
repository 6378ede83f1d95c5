//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use chronicle_llm::TimelineGenerator;

use crate::config::ApiConfig;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Generation pipeline. Cheap to clone; the provider sits behind an `Arc`.
    pub generator: TimelineGenerator,
    pub config: Arc<ApiConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(generator: TimelineGenerator, config: ApiConfig) -> Self {
        Self {
            generator,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}

impl FromRef<AppState> for Arc<ApiConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
