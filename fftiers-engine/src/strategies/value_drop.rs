//! Value-drop tiering
//!
//! # Algorithm
//! 1. Derive a scalar value per entity from rank, position scarcity, scoring
//!    format, projection, and consistency.
//! 2. Compute the value drop between consecutive entities (sorted by rank).
//! 3. Take the k-1 largest positive drops as tier boundaries, skipping any
//!    candidate within `min_tier_size` positions of an accepted boundary and
//!    any candidate between two entities of equal rank.
//! 4. Slice the sorted list at the boundaries.
//!
//! `k` above the entity count is clamped to the entity count.

use super::{build_group, separates_ranks, slice_at_boundaries, TierStrategy};
use crate::error::{TierError, TierResult};
use crate::types::{sorted_by_rank, Algorithm, RankedEntity, ScoringFormat, TierGroup};

/// Consistency discount never drops value below this fraction
const MIN_CONSISTENCY_FACTOR: f64 = 0.5;

/// Position scarcity weighting
fn category_multiplier(category: &str) -> f64 {
    match category.trim().to_ascii_uppercase().as_str() {
        "RB" => 1.15,
        "TE" => 1.1,
        "WR" => 1.0,
        "QB" => 0.9,
        "DST" | "DEF" | "D/ST" => 0.6,
        "K" => 0.5,
        _ => 1.0,
    }
}

/// Reception-scoring adjustment; only RB and WR are affected
fn format_multiplier(category: &str, format: ScoringFormat) -> f64 {
    match (category.trim().to_ascii_uppercase().as_str(), format) {
        ("WR", ScoringFormat::Ppr) => 1.1,
        ("WR", ScoringFormat::Half) => 1.05,
        ("RB", ScoringFormat::Ppr) => 1.05,
        ("RB", ScoringFormat::Half) => 1.025,
        _ => 1.0,
    }
}

/// `max(1 - variability/100, 0.5)`; entities without variability keep full value
fn consistency_factor(variability: Option<f64>) -> f64 {
    match variability {
        Some(v) => (1.0 - v.max(0.0) / 100.0).max(MIN_CONSISTENCY_FACTOR),
        None => 1.0,
    }
}

/// Derived draft value of one entity
///
/// Non-positive ranks produce a non-finite value.
pub fn entity_value(entity: &RankedEntity, format: ScoringFormat) -> f64 {
    let mut value = 100.0 / entity.average_rank.sqrt();
    value *= category_multiplier(&entity.category);
    value *= format_multiplier(&entity.category, format);
    if let Some(projected) = entity.projected_value {
        value += projected / 100.0;
    }
    value * consistency_factor(entity.variability)
}

/// Tiers entities at the steepest drops of [`entity_value`]
#[derive(Debug, Clone)]
pub struct ValueDropStrategy {
    min_tier_size_floor: usize,
}

impl Default for ValueDropStrategy {
    fn default() -> Self {
        Self {
            min_tier_size_floor: 2,
        }
    }
}

impl ValueDropStrategy {
    pub fn new(min_tier_size_floor: usize) -> Self {
        Self {
            min_tier_size_floor,
        }
    }

    /// `max(floor, n / 2k)`
    fn min_tier_size(&self, n: usize, k: usize) -> usize {
        self.min_tier_size_floor.max(n / k.saturating_mul(2).max(1))
    }

    /// Boundary positions: `b` starts a new tier at `sorted[b]`
    ///
    /// `values[i]` is the value of `sorted[i]`; `k` is at most `sorted.len()`.
    fn select_boundaries(&self, sorted: &[RankedEntity], values: &[f64], k: usize) -> Vec<usize> {
        let min_tier_size = self.min_tier_size(values.len(), k);

        let mut drops: Vec<(usize, f64)> = values
            .windows(2)
            .enumerate()
            .map(|(i, pair)| (i + 1, pair[0] - pair[1]))
            .collect();
        // Largest drop first; earlier position wins ties
        drops.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut boundaries: Vec<usize> = Vec::with_capacity(k.saturating_sub(1));
        for (position, drop) in drops {
            if boundaries.len() + 1 >= k {
                break;
            }
            if drop <= 0.0 {
                break;
            }
            if !separates_ranks(sorted, position) {
                tracing::trace!(position, drop, "Boundary inside tied ranks, skipped");
                continue;
            }
            if boundaries
                .iter()
                .any(|&b| b.abs_diff(position) < min_tier_size)
            {
                tracing::trace!(position, drop, min_tier_size, "Boundary too close, skipped");
                continue;
            }
            boundaries.push(position);
        }

        boundaries.sort_unstable();
        boundaries
    }
}

impl TierStrategy for ValueDropStrategy {
    fn algorithm(&self) -> Algorithm {
        Algorithm::ValueDrop
    }

    fn cluster(
        &self,
        entities: &[RankedEntity],
        k: usize,
        format: ScoringFormat,
    ) -> TierResult<Vec<TierGroup>> {
        if k == 0 {
            return Err(TierError::InvalidTierCount(0));
        }
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let k = k.min(entities.len());

        let sorted = sorted_by_rank(entities);
        let values: Vec<f64> = sorted.iter().map(|e| entity_value(e, format)).collect();
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(TierError::NonFiniteValue(format!(
                "value of '{}' (rank {})",
                sorted[i].id, sorted[i].average_rank
            )));
        }

        let boundaries = self.select_boundaries(&sorted, &values, k);
        tracing::debug!(
            entities = sorted.len(),
            requested = k,
            boundaries = ?boundaries,
            "Value-drop boundaries selected"
        );

        let value_slices = slice_values(&values, &boundaries);
        let tiers = slice_at_boundaries(sorted, &boundaries, Algorithm::ValueDrop);

        Ok(tiers
            .into_iter()
            .zip(value_slices)
            .enumerate()
            .map(|(i, (members, tier_values))| {
                let avg_value = tier_values.iter().sum::<f64>() / tier_values.len() as f64;
                build_group(i as u32 + 1, members, Algorithm::ValueDrop, Some(avg_value))
            })
            .collect())
    }
}

fn slice_values<'a>(values: &'a [f64], boundaries: &[usize]) -> Vec<&'a [f64]> {
    let mut slices = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 0;
    for &boundary in boundaries {
        slices.push(&values[start..boundary]);
        start = boundary;
    }
    slices.push(&values[start..]);
    slices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wr(id: &str, rank: f64) -> RankedEntity {
        RankedEntity::new(id, id, "WR", rank)
    }

    #[test]
    fn test_value_formula() {
        let base = wr("a", 4.0);
        assert!((entity_value(&base, ScoringFormat::Standard) - 50.0).abs() < 1e-9);
        assert!((entity_value(&base, ScoringFormat::Ppr) - 55.0).abs() < 1e-9);

        let projected = wr("b", 4.0).with_projected_value(200.0);
        assert!((entity_value(&projected, ScoringFormat::Standard) - 52.0).abs() < 1e-9);

        let volatile = wr("c", 4.0).with_variability(20.0);
        assert!((entity_value(&volatile, ScoringFormat::Standard) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_consistency_floor() {
        assert_eq!(consistency_factor(Some(90.0)), 0.5);
        assert_eq!(consistency_factor(Some(0.0)), 1.0);
        assert_eq!(consistency_factor(Some(-10.0)), 1.0);
        assert_eq!(consistency_factor(None), 1.0);
    }

    #[test]
    fn test_format_only_affects_rb_and_wr() {
        let te = RankedEntity::new("t", "t", "TE", 9.0);
        assert_eq!(
            entity_value(&te, ScoringFormat::Ppr),
            entity_value(&te, ScoringFormat::Standard)
        );
    }

    #[test]
    fn test_non_positive_rank_fails() {
        let err = ValueDropStrategy::default()
            .cluster(&[wr("a", 0.0), wr("b", 1.0)], 2, ScoringFormat::Standard)
            .unwrap_err();
        assert!(matches!(err, TierError::NonFiniteValue(_)));
    }

    #[test]
    fn test_cuts_at_largest_drops() {
        let entities: Vec<RankedEntity> = [1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 30.0, 31.0]
            .iter()
            .enumerate()
            .map(|(i, &r)| wr(&format!("p{}", i), r))
            .collect();
        let groups = ValueDropStrategy::default()
            .cluster(&entities, 3, ScoringFormat::Standard)
            .unwrap();

        let sizes: Vec<usize> = groups.iter().map(|g| g.members.len()).collect();
        // Largest drops: rank 1→2 (29.3) and rank 3→10 (26.1)
        assert_eq!(sizes, vec![1, 2, 5]);
        assert!(groups.iter().all(|g| g.avg_value.is_some()));
        assert!(groups[0].avg_value > groups[1].avg_value);
    }

    #[test]
    fn test_nearby_boundary_rejected() {
        let strategy = ValueDropStrategy::new(2);
        let sorted: Vec<RankedEntity> = (1..=8).map(|r| wr(&r.to_string(), r as f64)).collect();
        // Drops at positions 1 and 2 are both large; 2 sits within 2 of 1
        let values = [100.0, 60.0, 30.0, 29.0, 28.0, 27.0, 26.0, 10.0];
        let boundaries = strategy.select_boundaries(&sorted, &values, 3);
        assert_eq!(boundaries, vec![1, 7]);
    }

    #[test]
    fn test_tied_ranks_never_split() {
        // RB outvalues WR at the same rank, so the steepest drop sits inside the tie
        let entities = vec![
            RankedEntity::new("rb", "RB", "RB", 5.0),
            RankedEntity::new("wr", "WR", "WR", 5.0),
        ];
        let groups = ValueDropStrategy::default()
            .cluster(&entities, 2, ScoringFormat::Standard)
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 2);
    }

    #[test]
    fn test_huge_k_is_clamped() {
        let entities: Vec<RankedEntity> = [1.0, 2.0, 8.0, 9.0, 25.0]
            .iter()
            .enumerate()
            .map(|(i, &r)| wr(&format!("p{}", i), r))
            .collect();
        let huge = ValueDropStrategy::default()
            .cluster(&entities, usize::MAX, ScoringFormat::Standard)
            .unwrap();
        let exact = ValueDropStrategy::default()
            .cluster(&entities, entities.len(), ScoringFormat::Standard)
            .unwrap();
        assert_eq!(huge, exact);
    }

    #[test]
    fn test_k_above_n_tolerated() {
        let groups = ValueDropStrategy::default()
            .cluster(&[wr("a", 1.0), wr("b", 5.0)], 6, ScoringFormat::Standard)
            .unwrap();
        assert_eq!(groups.iter().map(|g| g.members.len()).sum::<usize>(), 2);
        assert!(groups.len() <= 2);
    }

    #[test]
    fn test_single_tier_has_no_boundaries() {
        let groups = ValueDropStrategy::default()
            .cluster(&[wr("a", 1.0), wr("b", 2.0), wr("c", 3.0)], 1, ScoringFormat::Standard)
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 3);
    }
}
