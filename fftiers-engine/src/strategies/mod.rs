//! Clustering strategies
//!
//! Every strategy implements [`TierStrategy`] so the orchestrator can hold
//! an ordered list of them and try each in turn.
//!
//! # Strategies
//! 1. [`GaussianMixtureStrategy`] - EM-fitted mixture over ranks
//! 2. [`ValueDropStrategy`] - cuts at the steepest drops in derived value
//! 3. [`RankGapStrategy`] - cuts at large rank gaps; never fails

mod gaussian;
mod rank_gap;
mod value_drop;

pub use gaussian::GaussianMixtureStrategy;
pub use rank_gap::RankGapStrategy;
pub use value_drop::{entity_value, ValueDropStrategy};

use crate::error::TierResult;
use crate::labels::tier_presentation;
use crate::types::{Algorithm, RankedEntity, ScoringFormat, TierGroup};

/// A way of splitting ranked entities into tiers
///
/// Implementations receive a non-empty entity slice in any order and
/// return contiguous tiers over ascending rank, tier 1 first.
pub trait TierStrategy: Send + Sync {
    /// Tag recorded on every group this strategy produces
    fn algorithm(&self) -> Algorithm;

    /// Split `entities` into at most `k` tiers
    ///
    /// # Errors
    /// Any error makes the orchestrator fall through to the next strategy.
    fn cluster(
        &self,
        entities: &[RankedEntity],
        k: usize,
        format: ScoringFormat,
    ) -> TierResult<Vec<TierGroup>>;
}

/// Assemble a labeled tier group
///
/// Sorts members by rank, stamps their `tier`, and computes the rank
/// statistics. Labels and colors come from the tier index alone.
pub(crate) fn build_group(
    tier_index: u32,
    mut members: Vec<RankedEntity>,
    algorithm: Algorithm,
    avg_value: Option<f64>,
) -> TierGroup {
    members.sort_by(|a, b| a.average_rank.total_cmp(&b.average_rank));
    for member in members.iter_mut() {
        member.tier = Some(tier_index);
    }

    let count = members.len().max(1) as f64;
    let min_rank = members.first().map(|m| m.average_rank).unwrap_or(0.0);
    let max_rank = members.last().map(|m| m.average_rank).unwrap_or(0.0);
    let avg_rank = members.iter().map(|m| m.average_rank).sum::<f64>() / count;
    let (color, label) = tier_presentation(tier_index);

    TierGroup {
        tier_index,
        members,
        color,
        label,
        min_rank,
        max_rank,
        avg_rank,
        avg_value,
        algorithm,
    }
}

/// Whether a cut before `sorted[position]` falls between two distinct ranks
///
/// Cutting inside a run of tied ranks would give adjacent tiers equal
/// average ranks, so such positions are never boundaries.
pub(crate) fn separates_ranks(sorted: &[RankedEntity], position: usize) -> bool {
    position > 0
        && position < sorted.len()
        && sorted[position].average_rank > sorted[position - 1].average_rank
}

/// Slice rank-sorted entities at ascending `boundaries` into labeled groups
///
/// A boundary `b` starts a new tier at `sorted[b]`.
pub(crate) fn slice_at_boundaries(
    sorted: Vec<RankedEntity>,
    boundaries: &[usize],
    algorithm: Algorithm,
) -> Vec<Vec<RankedEntity>> {
    let mut tiers = Vec::with_capacity(boundaries.len() + 1);
    let mut remaining = sorted;
    let mut offset = 0;
    for &boundary in boundaries {
        let tail = remaining.split_off(boundary - offset);
        tiers.push(remaining);
        remaining = tail;
        offset = boundary;
    }
    tiers.push(remaining);

    tracing::trace!(
        algorithm = %algorithm,
        tiers = tiers.len(),
        "Sliced entities into tiers"
    );
    tiers
}
