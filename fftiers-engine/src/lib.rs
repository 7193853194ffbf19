//! # fftiers Tier Clustering Engine
//!
//! Turns a flat list of ranked players into labeled value tiers.
//!
//! # Architecture
//! - [`gmm`]: 1-D Gaussian mixture fitted with Expectation-Maximization
//! - [`strategies`]: the clustering strategies behind one [`TierStrategy`] trait
//!   (Gaussian mixture, value-drop, rank-gap)
//! - [`orchestrator`]: preset detection plus ordered strategy fallback
//! - [`labels`]: tier index to label/color
//! - [`cache`]: TTL cache of computed results with periodic sweeping
//! - [`service`]: cache-aware facade used by callers
//!
//! Data flows one way: entities → orchestrator → strategy → tier groups →
//! labels → cache → caller.

pub mod cache;
pub mod error;
pub mod gmm;
pub mod labels;
pub mod orchestrator;
pub mod service;
pub mod strategies;
pub mod types;

pub use cache::{CacheStats, TierCache};
pub use error::{TierError, TierResult};
pub use orchestrator::{CategoryTiers, ClusteringInput, TierOrchestrator, TierOutcome};
pub use service::{TierMetadata, TierPayload, TierRequest, TierService};
pub use strategies::TierStrategy;
pub use types::{Algorithm, RankedEntity, ScoringFormat, TierGroup, TierOptions};
