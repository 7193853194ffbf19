//! Shared Types and Data Contracts
//!
//! Input (`RankedEntity`), output (`TierGroup`), and the knobs that shape a
//! computation (`ScoringFormat`, `TierOptions`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TierError;

// ============================================================================
// Input
// ============================================================================

/// A ranked player to be tiered
///
/// `average_rank` is the clustering signal and is never modified. The only
/// field written by the engine is `tier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntity {
    pub id: String,
    pub name: String,
    /// Team
    #[serde(default)]
    pub group: String,
    /// Position (QB, RB, WR, TE, K, DST)
    #[serde(default)]
    pub category: String,
    pub average_rank: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected_value: Option<f64>,
    /// Standard deviation across expert sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variability: Option<f64>,
    /// Tier decided upstream by the ranking source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_tier: Option<u32>,
    /// Output: tier index stamped by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<u32>,
}

impl RankedEntity {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        average_rank: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group: String::new(),
            category: category.into(),
            average_rank,
            projected_value: None,
            variability: None,
            preset_tier: None,
            tier: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_projected_value(mut self, projected_value: f64) -> Self {
        self.projected_value = Some(projected_value);
        self
    }

    pub fn with_variability(mut self, variability: f64) -> Self {
        self.variability = Some(variability);
        self
    }

    pub fn with_preset_tier(mut self, tier: u32) -> Self {
        self.preset_tier = Some(tier);
        self
    }
}

/// Clone and stable-sort entities by ascending rank
pub fn sorted_by_rank(entities: &[RankedEntity]) -> Vec<RankedEntity> {
    let mut sorted = entities.to_vec();
    sorted.sort_by(|a, b| a.average_rank.total_cmp(&b.average_rank));
    sorted
}

// ============================================================================
// Output
// ============================================================================

/// Strategy that produced a tier result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Empty input, nothing computed
    None,
    /// Tiers supplied upstream
    Preset,
    /// Gaussian mixture model
    Gmm,
    ValueDrop,
    RankGap,
    /// Reserved for a failed member of a batch computation
    Error,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::None => "none",
            Algorithm::Preset => "preset",
            Algorithm::Gmm => "gmm",
            Algorithm::ValueDrop => "value-drop",
            Algorithm::RankGap => "rank-gap",
            Algorithm::Error => "error",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tier of the output, members ordered by ascending rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierGroup {
    /// 1-based, 1 = best
    pub tier_index: u32,
    pub members: Vec<RankedEntity>,
    pub color: String,
    pub label: String,
    pub min_rank: f64,
    pub max_rank: f64,
    pub avg_rank: f64,
    /// Present only for value-drop tiers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_value: Option<f64>,
    pub algorithm: Algorithm,
}

// ============================================================================
// Computation knobs
// ============================================================================

/// Scoring format of the league
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringFormat {
    #[default]
    #[serde(alias = "std")]
    Standard,
    /// Half point per reception
    #[serde(alias = "half-ppr", alias = "half_ppr")]
    Half,
    /// Full point per reception
    #[serde(alias = "full", alias = "full-ppr")]
    Ppr,
}

impl ScoringFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringFormat::Standard => "standard",
            ScoringFormat::Half => "half",
            ScoringFormat::Ppr => "ppr",
        }
    }
}

impl fmt::Display for ScoringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringFormat {
    type Err = TierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "std" => Ok(ScoringFormat::Standard),
            "half" | "half-ppr" | "half_ppr" | "0.5" => Ok(ScoringFormat::Half),
            "ppr" | "full" | "full-ppr" => Ok(ScoringFormat::Ppr),
            other => Err(TierError::UnknownFormat(other.to_string())),
        }
    }
}

/// Algorithm options; part of every cache key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TierOptions {
    /// Rank gap that opens a new tier in the rank-gap strategy
    pub gap_threshold: f64,
    /// Lower bound on the value-drop minimum tier size
    pub min_tier_size_floor: usize,
    /// EM iteration ceiling
    pub max_iterations: usize,
    /// EM log-likelihood convergence tolerance
    pub tolerance: f64,
}

impl Default for TierOptions {
    fn default() -> Self {
        Self {
            gap_threshold: 3.0,
            min_tier_size_floor: 2,
            max_iterations: crate::gmm::DEFAULT_MAX_ITERATIONS,
            tolerance: crate::gmm::DEFAULT_TOLERANCE,
        }
    }
}

impl TierOptions {
    /// Deterministic text form used inside cache keys
    pub fn cache_fragment(&self) -> String {
        format!(
            "gap={}|floor={}|iter={}|tol={:e}",
            self.gap_threshold, self.min_tier_size_floor, self.max_iterations, self.tolerance
        )
    }
}

impl From<&fftiers_common::config::TierConfig> for TierOptions {
    fn from(config: &fftiers_common::config::TierConfig) -> Self {
        Self {
            gap_threshold: config.gap_threshold,
            min_tier_size_floor: config.min_tier_size_floor,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_format_tokens() {
        assert_eq!("PPR".parse::<ScoringFormat>().unwrap(), ScoringFormat::Ppr);
        assert_eq!("half-ppr".parse::<ScoringFormat>().unwrap(), ScoringFormat::Half);
        assert_eq!("std".parse::<ScoringFormat>().unwrap(), ScoringFormat::Standard);
        assert!("superflex".parse::<ScoringFormat>().is_err());
    }

    #[test]
    fn test_scoring_format_serde_aliases() {
        let format: ScoringFormat = serde_json::from_str("\"half_ppr\"").unwrap();
        assert_eq!(format, ScoringFormat::Half);
        assert_eq!(serde_json::to_string(&ScoringFormat::Ppr).unwrap(), "\"ppr\"");
    }

    #[test]
    fn test_algorithm_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&Algorithm::ValueDrop).unwrap(), "\"value-drop\"");
        assert_eq!(Algorithm::RankGap.to_string(), "rank-gap");
    }

    #[test]
    fn test_sorted_by_rank_is_stable_for_ties() {
        let entities = vec![
            RankedEntity::new("b", "B", "RB", 2.0),
            RankedEntity::new("a1", "A1", "RB", 1.0),
            RankedEntity::new("a2", "A2", "WR", 1.0),
        ];
        let sorted = sorted_by_rank(&entities);
        let ids: Vec<&str> = sorted.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "b"]);
    }

    #[test]
    fn test_entity_json_is_camel_case() {
        let json = r#"{"id":"1","name":"X","category":"QB","averageRank":4.5,"presetTier":2}"#;
        let entity: RankedEntity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.average_rank, 4.5);
        assert_eq!(entity.preset_tier, Some(2));
        assert_eq!(entity.group, "");
    }

    #[test]
    fn test_options_cache_fragment_is_stable() {
        let options = TierOptions::default();
        assert_eq!(options.cache_fragment(), TierOptions::default().cache_fragment());
        let wider = TierOptions {
            gap_threshold: 5.0,
            ..Default::default()
        };
        assert_ne!(options.cache_fragment(), wider.cache_fragment());
    }
}
