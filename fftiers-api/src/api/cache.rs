//! Cache administration handlers
//!
//! GET /cache/stats, DELETE /cache, DELETE /cache/:key, POST /cache/prewarm

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use fftiers_engine::CacheStats;
use serde::{Deserialize, Serialize};

use super::tiers::TierRequestBody;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /cache/stats response
#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub keys: Vec<String>,
}

/// DELETE /cache and DELETE /cache/:key response
#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub removed: usize,
}

/// POST /cache/prewarm request
#[derive(Debug, Deserialize)]
pub struct PrewarmRequest {
    pub requests: Vec<TierRequestBody>,
}

/// POST /cache/prewarm response
#[derive(Debug, Serialize)]
pub struct PrewarmResponse {
    pub requested: usize,
    pub warmed: usize,
}

/// GET /cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let cache = state.service.cache();
    Json(CacheStatsResponse {
        stats: cache.stats().await,
        keys: cache.keys().await,
    })
}

/// DELETE /cache
pub async fn clear_cache(State(state): State<AppState>) -> Json<InvalidateResponse> {
    let removed = state.service.cache().clear().await;
    tracing::info!(removed, "Tier cache cleared via API");
    Json(InvalidateResponse { removed })
}

/// DELETE /cache/:key
///
/// 404 when no entry exists for `key`.
pub async fn invalidate_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<InvalidateResponse>> {
    if state.service.cache().invalidate(&key).await {
        Ok(Json(InvalidateResponse { removed: 1 }))
    } else {
        Err(ApiError::NotFound(format!("cache key {}", key)))
    }
}

/// POST /cache/prewarm
///
/// Every request in the batch is validated before any is computed.
pub async fn prewarm(
    State(state): State<AppState>,
    Json(body): Json<PrewarmRequest>,
) -> ApiResult<Json<PrewarmResponse>> {
    let requests = body
        .requests
        .into_iter()
        .map(|b| b.into_request(&state.config.tiers))
        .collect::<ApiResult<Vec<_>>>()?;

    let warmed = state.service.prewarm(&requests).await;
    Ok(Json(PrewarmResponse {
        requested: requests.len(),
        warmed,
    }))
}

/// Build cache administration routes
pub fn cache_routes() -> Router<AppState> {
    Router::new()
        .route("/cache", delete(clear_cache))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/prewarm", post(prewarm))
        .route("/cache/:key", delete(invalidate_key))
}
