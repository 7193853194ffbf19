//! Gaussian mixture tiering

use super::{build_group, separates_ranks, slice_at_boundaries, TierStrategy};
use crate::error::TierResult;
use crate::gmm::{GaussianMixtureModel, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
use crate::types::{sorted_by_rank, Algorithm, RankedEntity, ScoringFormat, TierGroup};

/// Tiers entities by fitting a k-component GMM to their ranks
///
/// The mixture decides how many entities each tier holds; tiers are then
/// cut from the rank-sorted list in ascending-mean order so every tier is
/// a contiguous rank range. Components left empty by the fit are dropped
/// and the remaining tiers renumbered from 1. A cut that would fall inside
/// a run of tied ranks is dropped, merging the two tiers.
#[derive(Debug, Clone)]
pub struct GaussianMixtureStrategy {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for GaussianMixtureStrategy {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl GaussianMixtureStrategy {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
        }
    }
}

impl TierStrategy for GaussianMixtureStrategy {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Gmm
    }

    fn cluster(
        &self,
        entities: &[RankedEntity],
        k: usize,
        _format: ScoringFormat,
    ) -> TierResult<Vec<TierGroup>> {
        let sorted = sorted_by_rank(entities);
        let samples: Vec<f64> = sorted.iter().map(|e| e.average_rank).collect();

        let mut gmm = GaussianMixtureModel::new(k)
            .with_max_iterations(self.max_iterations)
            .with_tolerance(self.tolerance);
        gmm.fit(&samples)?;
        let labels = gmm.predict(&samples)?;

        let mut counts = vec![0usize; k];
        for &label in &labels {
            counts[label] += 1;
        }

        // Cumulative tier ends; empty components repeat the previous end
        let mut boundaries: Vec<usize> = counts
            .iter()
            .scan(0usize, |end, &count| {
                *end += count;
                Some(*end)
            })
            .filter(|&end| separates_ranks(&sorted, end))
            .collect();
        boundaries.dedup();

        let groups: Vec<TierGroup> = slice_at_boundaries(sorted, &boundaries, Algorithm::Gmm)
            .into_iter()
            .enumerate()
            .map(|(i, members)| build_group(i as u32 + 1, members, Algorithm::Gmm, None))
            .collect();

        tracing::debug!(
            entities = entities.len(),
            requested = k,
            produced = groups.len(),
            iterations = gmm.iterations_run(),
            converged = gmm.converged(),
            "GMM tiering complete"
        );

        Ok(groups)
    }
}
