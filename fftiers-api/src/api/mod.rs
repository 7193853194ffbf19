//! HTTP API handlers for fftiers-api

pub mod cache;
pub mod health;
pub mod tiers;

pub use cache::cache_routes;
pub use health::health_routes;
pub use tiers::{tier_routes, TierRequestBody};
