//! fftiers-api library - HTTP surface for the tier engine
//!
//! Routes:
//! - `POST /tiers`, `POST /tiers/by-category`
//! - `GET /cache/stats`, `DELETE /cache`, `DELETE /cache/:key`, `POST /cache/prewarm`
//! - `GET /health`

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use fftiers_common::config::TomlConfig;
use fftiers_engine::TierService;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Cache-aware tier computation
    pub service: TierService,
    /// Loaded configuration (tier limits and defaults)
    pub config: Arc<TomlConfig>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: TierService, config: TomlConfig) -> Self {
        Self {
            service,
            config: Arc::new(config),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::tier_routes())
        .merge(api::cache_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
