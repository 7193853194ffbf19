//! Rank-gap tiering, the last-resort strategy

use super::{build_group, TierStrategy};
use crate::error::TierResult;
use crate::types::{sorted_by_rank, Algorithm, RankedEntity, ScoringFormat, TierGroup};

pub const DEFAULT_GAP_THRESHOLD: f64 = 3.0;

/// Opens a new tier whenever consecutive ranks differ by more than
/// `gap_threshold`, up to `k` tiers; everything after the last cut stays in
/// the final tier. Tied ranks always share a tier. Uses nothing but
/// `average_rank` and never fails.
#[derive(Debug, Clone)]
pub struct RankGapStrategy {
    gap_threshold: f64,
}

impl Default for RankGapStrategy {
    fn default() -> Self {
        Self {
            gap_threshold: DEFAULT_GAP_THRESHOLD,
        }
    }
}

impl RankGapStrategy {
    pub fn new(gap_threshold: f64) -> Self {
        Self { gap_threshold }
    }
}

impl TierStrategy for RankGapStrategy {
    fn algorithm(&self) -> Algorithm {
        Algorithm::RankGap
    }

    fn cluster(
        &self,
        entities: &[RankedEntity],
        k: usize,
        _format: ScoringFormat,
    ) -> TierResult<Vec<TierGroup>> {
        let max_tiers = k.max(1);
        let mut tiers: Vec<Vec<RankedEntity>> = Vec::new();
        let mut current: Vec<RankedEntity> = Vec::new();

        for entity in sorted_by_rank(entities) {
            if let Some(previous) = current.last() {
                let gap = entity.average_rank - previous.average_rank;
                if gap > 0.0 && gap > self.gap_threshold && tiers.len() + 1 < max_tiers {
                    tiers.push(std::mem::take(&mut current));
                }
            }
            current.push(entity);
        }
        if !current.is_empty() {
            tiers.push(current);
        }

        tracing::debug!(
            entities = entities.len(),
            gap_threshold = self.gap_threshold,
            tiers = tiers.len(),
            "Rank-gap tiering complete"
        );

        Ok(tiers
            .into_iter()
            .enumerate()
            .map(|(i, members)| build_group(i as u32 + 1, members, Algorithm::RankGap, None))
            .collect())
    }
}
