//! Tier Orchestrator
//!
//! Single entry point that always produces a usable tier list:
//!
//! 0. Empty input → empty tier list
//! 1. Any entity with a nonzero `preset_tier` → group by the upstream tiers
//! 2. Otherwise run each strategy in order (GMM, value-drop, rank-gap) and
//!    return the first success; each failure is logged with its reason
//!
//! No strategy is retried and exactly one strategy's output is returned.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{TierError, TierResult};
use crate::strategies::{
    build_group, GaussianMixtureStrategy, RankGapStrategy, TierStrategy, ValueDropStrategy,
};
use crate::types::{Algorithm, RankedEntity, ScoringFormat, TierGroup, TierOptions};

/// What the caller handed in, decided once at the entry point
#[derive(Debug, Clone, PartialEq)]
pub enum ClusteringInput {
    /// Upstream source already assigned tiers
    Preset { entities: Vec<RankedEntity> },
    /// Tiers must be computed
    Compute { entities: Vec<RankedEntity>, k: usize },
}

impl ClusteringInput {
    /// Tier numbers start at 1, so a `preset_tier` of 0 counts as unset
    pub fn classify(entities: &[RankedEntity], k: usize) -> Self {
        if entities.iter().any(|e| preset_tier(e).is_some()) {
            ClusteringInput::Preset {
                entities: entities.to_vec(),
            }
        } else {
            ClusteringInput::Compute {
                entities: entities.to_vec(),
                k,
            }
        }
    }
}

/// Tiers plus the strategy that served them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierOutcome {
    pub tiers: Vec<TierGroup>,
    pub algorithm: Algorithm,
}

/// One category's share of a batch computation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTiers {
    pub category: String,
    pub tiers: Vec<TierGroup>,
    pub algorithm: Algorithm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ordered list of strategies tried until one succeeds
pub struct TierOrchestrator {
    strategies: Vec<Box<dyn TierStrategy>>,
}

impl Default for TierOrchestrator {
    fn default() -> Self {
        Self::new(&TierOptions::default())
    }
}

impl TierOrchestrator {
    /// Standard chain: GMM, then value-drop, then rank-gap
    pub fn new(options: &TierOptions) -> Self {
        Self::with_strategies(vec![
            Box::new(GaussianMixtureStrategy::new(
                options.max_iterations,
                options.tolerance,
            )),
            Box::new(ValueDropStrategy::new(options.min_tier_size_floor)),
            Box::new(RankGapStrategy::new(options.gap_threshold)),
        ])
    }

    /// Custom chain, tried in the given order
    pub fn with_strategies(strategies: Vec<Box<dyn TierStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn algorithms(&self) -> Vec<Algorithm> {
        self.strategies.iter().map(|s| s.algorithm()).collect()
    }

    /// Compute tiers for `entities`
    ///
    /// # Errors
    /// `AllStrategiesFailed` only when every strategy in the chain fails,
    /// which the standard chain never does for non-empty input.
    pub fn compute_tiers(
        &self,
        entities: &[RankedEntity],
        number_of_tiers: usize,
        format: ScoringFormat,
    ) -> TierResult<TierOutcome> {
        if entities.is_empty() {
            tracing::debug!("No entities supplied, returning empty tier list");
            return Ok(TierOutcome {
                tiers: Vec::new(),
                algorithm: Algorithm::None,
            });
        }

        match ClusteringInput::classify(entities, number_of_tiers) {
            ClusteringInput::Preset { entities } => Ok(TierOutcome {
                tiers: group_by_preset(entities),
                algorithm: Algorithm::Preset,
            }),
            ClusteringInput::Compute { entities, k } => self.run_strategies(&entities, k, format),
        }
    }

    fn run_strategies(
        &self,
        entities: &[RankedEntity],
        k: usize,
        format: ScoringFormat,
    ) -> TierResult<TierOutcome> {
        let mut failures = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let algorithm = strategy.algorithm();
            match strategy.cluster(entities, k, format) {
                Ok(tiers) if !tiers.is_empty() => {
                    tracing::info!(
                        algorithm = %algorithm,
                        entities = entities.len(),
                        requested = k,
                        tiers = tiers.len(),
                        fallbacks = failures.len(),
                        "Tiers computed"
                    );
                    return Ok(TierOutcome { tiers, algorithm });
                }
                Ok(_) => {
                    tracing::warn!(
                        algorithm = %algorithm,
                        "Strategy produced no tiers, falling back"
                    );
                    failures.push(format!("{}: no tiers produced", algorithm));
                }
                Err(e) => {
                    tracing::warn!(
                        algorithm = %algorithm,
                        error = %e,
                        "Strategy failed, falling back"
                    );
                    failures.push(format!("{}: {}", algorithm, e));
                }
            }
        }

        tracing::error!(failures = ?failures, "Every tier strategy failed");
        Err(TierError::AllStrategiesFailed(failures.join("; ")))
    }

    /// Compute tiers independently for each category
    ///
    /// A category whose computation fails is reported with
    /// `Algorithm::Error` and no tiers; the rest of the batch is unaffected.
    pub fn compute_by_category(
        &self,
        entities: &[RankedEntity],
        number_of_tiers: usize,
        format: ScoringFormat,
    ) -> Vec<CategoryTiers> {
        let mut by_category: BTreeMap<&str, Vec<RankedEntity>> = BTreeMap::new();
        for entity in entities {
            by_category
                .entry(entity.category.as_str())
                .or_default()
                .push(entity.clone());
        }

        by_category
            .into_iter()
            .map(|(category, members)| {
                match self.compute_tiers(&members, number_of_tiers, format) {
                    Ok(outcome) => CategoryTiers {
                        category: category.to_string(),
                        tiers: outcome.tiers,
                        algorithm: outcome.algorithm,
                        error: None,
                    },
                    Err(e) => {
                        tracing::error!(category, error = %e, "Category tiering failed");
                        CategoryTiers {
                            category: category.to_string(),
                            tiers: Vec::new(),
                            algorithm: Algorithm::Error,
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .collect()
    }
}

fn preset_tier(entity: &RankedEntity) -> Option<u32> {
    entity.preset_tier.filter(|&tier| tier > 0)
}

/// Group by upstream tier number, ascending
///
/// Entities without a preset tier (or with tier 0) land in one extra tier
/// after the highest preset tier so every input entity is still returned.
fn group_by_preset(entities: Vec<RankedEntity>) -> Vec<TierGroup> {
    let max_preset = entities.iter().filter_map(preset_tier).max().unwrap_or(0);
    let mut by_tier: BTreeMap<u32, Vec<RankedEntity>> = BTreeMap::new();
    let mut unassigned = 0usize;

    for entity in entities {
        let tier = match preset_tier(&entity) {
            Some(tier) => tier,
            None => {
                unassigned += 1;
                max_preset + 1
            }
        };
        by_tier.entry(tier).or_default().push(entity);
    }

    if unassigned > 0 {
        tracing::warn!(
            unassigned,
            tier = max_preset + 1,
            "Entities without a preset tier grouped after the last preset tier"
        );
    }

    by_tier
        .into_iter()
        .map(|(tier, members)| build_group(tier, members, Algorithm::Preset, None))
        .collect()
}
