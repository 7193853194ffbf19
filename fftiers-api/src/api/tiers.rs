//! Tier computation handlers
//!
//! POST /tiers, POST /tiers/by-category

use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use fftiers_common::config::TierConfig;
use fftiers_engine::{
    CategoryTiers, RankedEntity, ScoringFormat, TierOptions, TierPayload, TierRequest,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /tiers request body
///
/// Also the element type of a pre-warm batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierRequestBody {
    /// Entity-set identity, e.g. "ALL" or "RB"
    pub target: String,
    /// Scoring format token; standard when absent
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, alias = "num_tiers")]
    pub num_tiers: Option<usize>,
    #[serde(default, alias = "force_refresh")]
    pub force_refresh: bool,
    /// Overrides for the configured tuning values
    #[serde(default)]
    pub options: Option<TierOptions>,
    pub entities: Vec<RankedEntity>,
}

impl TierRequestBody {
    /// Validate and convert into an engine request
    ///
    /// `num_tiers` is clamped into `1..=max_tiers`; a missing value takes
    /// the configured default.
    pub fn into_request(self, tiers: &TierConfig) -> ApiResult<TierRequest> {
        let target = self.target.trim().to_string();
        if target.is_empty() {
            return Err(ApiError::BadRequest("target must not be empty".to_string()));
        }

        let format = match self.format.as_deref() {
            Some(token) => token
                .parse::<ScoringFormat>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?,
            None => ScoringFormat::default(),
        };

        if let Some(bad) = self
            .entities
            .iter()
            .find(|e| !(e.average_rank.is_finite() && e.average_rank > 0.0))
        {
            return Err(ApiError::BadRequest(format!(
                "entity {} has invalid averageRank {}",
                bad.id, bad.average_rank
            )));
        }

        // Tier numbers start at 1
        if let Some(bad) = self.entities.iter().find(|e| e.preset_tier == Some(0)) {
            return Err(ApiError::BadRequest(format!(
                "entity {} has invalid presetTier 0",
                bad.id
            )));
        }

        let requested = self.num_tiers.unwrap_or(tiers.default_tiers);
        let num_tiers = requested.clamp(1, tiers.max_tiers);
        if num_tiers != requested {
            tracing::debug!(requested, num_tiers, "Requested tier count clamped");
        }

        let options = match self.options {
            Some(options) => {
                validate_options(&options)?;
                options
            }
            None => TierOptions::from(tiers),
        };

        Ok(TierRequest::new(target, self.entities, num_tiers)
            .with_format(format)
            .with_options(options)
            .force_refresh(self.force_refresh))
    }
}

fn validate_options(options: &TierOptions) -> ApiResult<()> {
    if !(options.gap_threshold.is_finite() && options.gap_threshold >= 0.0) {
        return Err(ApiError::BadRequest(
            "options.gapThreshold must be a non-negative number".to_string(),
        ));
    }
    if options.max_iterations == 0 {
        return Err(ApiError::BadRequest(
            "options.maxIterations must be at least 1".to_string(),
        ));
    }
    if !(options.tolerance.is_finite() && options.tolerance >= 0.0) {
        return Err(ApiError::BadRequest(
            "options.tolerance must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

/// POST /tiers/by-category response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTiersResponse {
    pub categories: Vec<CategoryTiers>,
    pub format: ScoringFormat,
    pub num_tiers: usize,
    pub timestamp: DateTime<Utc>,
}

/// POST /tiers
///
/// Cached tier computation for one entity set.
pub async fn compute_tiers(
    State(state): State<AppState>,
    Json(body): Json<TierRequestBody>,
) -> ApiResult<Json<TierPayload>> {
    let request = body.into_request(&state.config.tiers)?;
    let payload = state.service.get_tiers(&request).await?;
    Ok(Json(payload))
}

/// POST /tiers/by-category
///
/// Independent tiers per category; one failing category does not fail the
/// batch.
pub async fn compute_tiers_by_category(
    State(state): State<AppState>,
    Json(body): Json<TierRequestBody>,
) -> ApiResult<Json<CategoryTiersResponse>> {
    let request = body.into_request(&state.config.tiers)?;
    let categories = state.service.get_tiers_by_category(&request);
    Ok(Json(CategoryTiersResponse {
        categories,
        format: request.format,
        num_tiers: request.num_tiers,
        timestamp: Utc::now(),
    }))
}

/// Build tier routes
pub fn tier_routes() -> Router<AppState> {
    Router::new()
        .route("/tiers", post(compute_tiers))
        .route("/tiers/by-category", post(compute_tiers_by_category))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(num_tiers: Option<usize>) -> TierRequestBody {
        TierRequestBody {
            target: "RB".to_string(),
            format: Some("half-ppr".to_string()),
            num_tiers,
            force_refresh: false,
            options: None,
            entities: vec![RankedEntity::new("a", "A", "RB", 1.5)],
        }
    }

    #[test]
    fn test_num_tiers_default_and_clamp() {
        let config = TierConfig::default();

        let request = body(None).into_request(&config).unwrap();
        assert_eq!(request.num_tiers, config.default_tiers);
        assert_eq!(request.format, ScoringFormat::Half);

        let request = body(Some(500)).into_request(&config).unwrap();
        assert_eq!(request.num_tiers, config.max_tiers);

        let request = body(Some(0)).into_request(&config).unwrap();
        assert_eq!(request.num_tiers, 1);
    }

    #[test]
    fn test_options_fall_back_to_config() {
        let config = TierConfig {
            gap_threshold: 7.5,
            ..Default::default()
        };
        let request = body(None).into_request(&config).unwrap();
        assert_eq!(request.options.gap_threshold, 7.5);
    }

    #[test]
    fn test_rejects_bad_input() {
        let config = TierConfig::default();

        let mut blank = body(None);
        blank.target = "  ".to_string();
        assert!(matches!(blank.into_request(&config), Err(ApiError::BadRequest(_))));

        let mut unknown = body(None);
        unknown.format = Some("superflex".to_string());
        assert!(matches!(unknown.into_request(&config), Err(ApiError::BadRequest(_))));

        let mut zero_rank = body(None);
        zero_rank.entities.push(RankedEntity::new("z", "Z", "WR", 0.0));
        assert!(matches!(zero_rank.into_request(&config), Err(ApiError::BadRequest(_))));

        let mut zero_preset = body(None);
        zero_preset
            .entities
            .push(RankedEntity::new("p", "P", "WR", 3.0).with_preset_tier(0));
        assert!(matches!(zero_preset.into_request(&config), Err(ApiError::BadRequest(_))));

        let mut bad_options = body(None);
        bad_options.options = Some(TierOptions {
            max_iterations: 0,
            ..Default::default()
        });
        assert!(matches!(bad_options.into_request(&config), Err(ApiError::BadRequest(_))));
    }
}
