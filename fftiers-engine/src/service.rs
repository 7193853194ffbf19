//! Tier Service
//!
//! Cache-aware facade over the orchestrator. Callers build a
//! [`TierRequest`]; the service returns a [`TierPayload`] carrying the tiers
//! and run metadata (algorithm, timestamp, execution time, cache hit).
//!
//! A forced refresh skips the cache read but still writes the fresh result
//! so later callers benefit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{cache_key, TierCache};
use crate::error::TierResult;
use crate::orchestrator::{CategoryTiers, TierOrchestrator};
use crate::types::{Algorithm, RankedEntity, ScoringFormat, TierGroup, TierOptions};

/// Metadata `source` for a freshly computed result
pub const SOURCE_COMPUTED: &str = "computed";
/// Metadata `source` for a result served from the cache
pub const SOURCE_CACHE: &str = "cache";

/// Run metadata attached to every tier result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierMetadata {
    pub algorithm: Algorithm,
    /// When the tiers were computed (unchanged on cache hits)
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub execution_time_ms: f64,
    pub from_cache: bool,
    pub player_count: usize,
    pub num_tiers: usize,
    pub format: ScoringFormat,
}

/// Tiers plus metadata, the unit stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierPayload {
    pub tiers: Vec<TierGroup>,
    pub metadata: TierMetadata,
}

/// A tiering request after caller-side validation
#[derive(Debug, Clone)]
pub struct TierRequest {
    /// Entity-set identity, e.g. "ALL" or a position
    pub target: String,
    pub format: ScoringFormat,
    pub num_tiers: usize,
    pub force_refresh: bool,
    pub options: TierOptions,
    pub entities: Vec<RankedEntity>,
}

impl TierRequest {
    pub fn new(target: impl Into<String>, entities: Vec<RankedEntity>, num_tiers: usize) -> Self {
        Self {
            target: target.into(),
            format: ScoringFormat::default(),
            num_tiers,
            force_refresh: false,
            options: TierOptions::default(),
            entities,
        }
    }

    pub fn with_format(mut self, format: ScoringFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_options(mut self, options: TierOptions) -> Self {
        self.options = options;
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn cache_key(&self) -> String {
        cache_key(
            &self.target,
            self.format,
            self.num_tiers,
            &self.options,
            &self.entities,
        )
    }
}

/// Cache-aware tier computation
#[derive(Clone)]
pub struct TierService {
    cache: Arc<TierCache>,
    ttl: Duration,
}

impl TierService {
    pub fn new(cache: Arc<TierCache>) -> Self {
        let ttl = cache.ttl();
        Self { cache, ttl }
    }

    pub fn cache(&self) -> &Arc<TierCache> {
        &self.cache
    }

    /// Tiers for `request`, from the cache when possible
    ///
    /// # Errors
    /// Only when every strategy fails; a cache miss is never an error.
    pub async fn get_tiers(&self, request: &TierRequest) -> TierResult<TierPayload> {
        let key = request.cache_key();

        if request.force_refresh {
            tracing::debug!(key = %key, "Forced refresh, skipping cache read");
        } else if let Some(mut payload) = self.cache.get(&key).await {
            payload.metadata.from_cache = true;
            payload.metadata.source = SOURCE_CACHE.to_string();
            return Ok(payload);
        }

        let payload = self.compute(request)?;
        self.cache.set(key, payload.clone(), self.ttl).await;
        Ok(payload)
    }

    /// Per-category tiers; batch results are not cached
    pub fn get_tiers_by_category(&self, request: &TierRequest) -> Vec<CategoryTiers> {
        TierOrchestrator::new(&request.options).compute_by_category(
            &request.entities,
            request.num_tiers,
            request.format,
        )
    }

    /// Compute and cache every request regardless of existing entries
    ///
    /// Returns the number of requests that were cached.
    pub async fn prewarm(&self, requests: &[TierRequest]) -> usize {
        let mut warmed = 0;
        for request in requests {
            match self.compute(request) {
                Ok(payload) => {
                    self.cache.set(request.cache_key(), payload, self.ttl).await;
                    warmed += 1;
                }
                Err(e) => {
                    tracing::warn!(request_target = %request.target, error = %e, "Pre-warm failed");
                }
            }
        }
        tracing::info!(requested = requests.len(), warmed, "Tier cache pre-warmed");
        warmed
    }

    fn compute(&self, request: &TierRequest) -> TierResult<TierPayload> {
        let started = Instant::now();
        let outcome = TierOrchestrator::new(&request.options).compute_tiers(
            &request.entities,
            request.num_tiers,
            request.format,
        )?;
        let execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        tracing::debug!(
            request_target = %request.target,
            algorithm = %outcome.algorithm,
            execution_time_ms,
            "Tier computation finished"
        );

        Ok(TierPayload {
            metadata: TierMetadata {
                algorithm: outcome.algorithm,
                timestamp: Utc::now(),
                source: SOURCE_COMPUTED.to_string(),
                execution_time_ms,
                from_cache: false,
                player_count: request.entities.len(),
                num_tiers: outcome.tiers.len(),
                format: request.format,
            },
            tiers: outcome.tiers,
        })
    }
}
