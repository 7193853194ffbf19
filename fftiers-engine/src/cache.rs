//! Tier Cache
//!
//! In-memory TTL cache of computed tier results.
//!
//! # Lifecycle
//! - Entry created on first computation for a key
//! - Read-only until `expires_at`; an expired entry reads as a miss
//! - Replaced wholesale by `set` (forced refresh overwrites)
//! - Removed by `invalidate`, `clear`, or the periodic `sweep`
//!
//! # Concurrency
//! The map sits behind an async `RwLock`. There is no per-key single-flight:
//! two concurrent misses on the same key both compute and the last `set`
//! wins. `sweep` never holds the write lock for the whole pass.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::service::TierPayload;
use crate::types::{RankedEntity, ScoringFormat, TierOptions};

/// Default entry lifetime (10 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);
/// Default interval between sweeps (5 minutes)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);
/// Longest lifetime an entry can get; larger TTLs are capped to this
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Cached tier result with its expiry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub payload: TierPayload,
    pub created_at: DateTime<Utc>,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Snapshot of cache occupancy and traffic
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    /// Expired but not yet swept
    pub expired: usize,
    pub hits: u64,
    pub misses: u64,
    pub ttl_secs: u64,
}

/// TTL cache of tier results
pub struct TierCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for TierCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl TierCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Default TTL applied by callers that do not pick their own
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached payload for `key`, or `None` if absent or expired
    pub async fn get(&self, key: &str) -> Option<TierPayload> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Tier cache hit");
                Some(entry.payload.clone())
            }
            Some(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Tier cache entry expired");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Tier cache miss");
                None
            }
        }
    }

    /// Store `payload` under `key`, replacing any existing entry
    pub async fn set(&self, key: impl Into<String>, payload: TierPayload, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();
        let entry = CacheEntry {
            key: key.clone(),
            payload,
            created_at: Utc::now(),
            expires_at: now + ttl.min(MAX_TTL),
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Remove one entry; returns whether it existed
    pub async fn invalidate(&self, key: &str) -> bool {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            info!(key, "Tier cache entry invalidated");
        }
        removed
    }

    /// Remove every entry; returns how many were removed
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        info!(count, "Tier cache cleared");
        count
    }

    /// Remove expired entries; returns how many were removed
    ///
    /// Expired keys are collected under the read lock, then removed one at a
    /// time so readers and writers interleave with the sweep. An entry
    /// refreshed between the two phases is kept.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = {
            let entries = self.entries.read().await;
            entries
                .values()
                .filter(|e| e.is_expired(now))
                .map(|e| e.key.clone())
                .collect()
        };

        let mut removed = 0;
        for key in expired {
            let mut entries = self.entries.write().await;
            if entries.get(&key).is_some_and(|e| e.is_expired(now)) {
                entries.remove(&key);
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Swept expired tier cache entries");
        } else {
            debug!("Tier cache sweep found nothing to remove");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.read().await;
        CacheStats {
            entries: entries.len(),
            expired: entries.values().filter(|e| e.is_expired(now)).count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ttl_secs: self.ttl.as_secs(),
        }
    }

    /// Spawn the periodic sweep task
    ///
    /// Runs until `shutdown` is cancelled. The first sweep happens one
    /// full interval after spawning.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        sweep_interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        info!(
            "Starting tier cache sweeper (interval: {}s)",
            sweep_interval.as_secs()
        );

        tokio::spawn(async move {
            let mut timer = interval(sweep_interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First tick completes immediately
            timer.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Tier cache sweeper stopped");
                        break;
                    }
                    _ = timer.tick() => {
                        self.sweep().await;
                    }
                }
            }
        })
    }
}

/// Deterministic cache key for a tier request
///
/// `tiers:{target}:{format}:k{k}:{options}:{fingerprint}` where the
/// fingerprint hashes the entity set independent of input order.
pub fn cache_key(
    target: &str,
    format: ScoringFormat,
    k: usize,
    options: &TierOptions,
    entities: &[RankedEntity],
) -> String {
    format!(
        "tiers:{}:{}:k{}:{}:{}",
        target,
        format,
        k,
        options.cache_fragment(),
        entity_fingerprint(entities)
    )
}

/// First 16 hex digits of a SHA-256 over the sorted entity signals
pub fn entity_fingerprint(entities: &[RankedEntity]) -> String {
    let mut rows: Vec<String> = entities
        .iter()
        .map(|e| {
            format!(
                "{}|{}|{}|{:?}|{:?}|{:?}",
                e.id, e.category, e.average_rank, e.projected_value, e.variability, e.preset_tier
            )
        })
        .collect();
    rows.sort();

    let mut hasher = Sha256::new();
    for row in &rows {
        hasher.update(row.as_bytes());
        hasher.update(b"\n");
    }
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::TierMetadata;
    use crate::types::Algorithm;

    fn payload(player_count: usize) -> TierPayload {
        TierPayload {
            tiers: Vec::new(),
            metadata: TierMetadata {
                algorithm: Algorithm::RankGap,
                timestamp: Utc::now(),
                source: "computed".to_string(),
                execution_time_ms: 0.5,
                from_cache: false,
                player_count,
                num_tiers: 0,
                format: ScoringFormat::Standard,
            },
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = TierCache::default();
        cache.set("a", payload(3), DEFAULT_TTL).await;
        assert_eq!(cache.get("a").await.unwrap().metadata.player_count, 3);
        assert!(cache.get("b").await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.ttl_secs, 600);
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss() {
        let cache = TierCache::default();
        cache.set("a", payload(1), Duration::ZERO).await;
        assert!(cache.get("a").await.is_none());
        assert_eq!(cache.stats().await.expired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = TierCache::default();
        cache.set("a", payload(1), DEFAULT_TTL).await;

        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(cache.get("a").await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("a").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_capped() {
        let cache = TierCache::default();
        cache.set("a", payload(1), Duration::MAX).await;
        assert!(cache.get("a").await.is_some());

        tokio::time::advance(MAX_TTL + Duration::from_secs(1)).await;
        assert!(cache.get("a").await.is_none());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = TierCache::default();
        cache.set("a", payload(1), DEFAULT_TTL).await;
        cache.set("a", payload(2), DEFAULT_TTL).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("a").await.unwrap().metadata.player_count, 2);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = TierCache::default();
        cache.set("a", payload(1), DEFAULT_TTL).await;
        cache.set("b", payload(1), DEFAULT_TTL).await;

        assert!(cache.invalidate("a").await);
        assert!(!cache.invalidate("a").await);
        assert_eq!(cache.keys().await, vec!["b".to_string()]);

        assert_eq!(cache.clear().await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let cache = TierCache::default();
        cache.set("stale", payload(1), Duration::ZERO).await;
        cache.set("fresh", payload(1), DEFAULT_TTL).await;

        assert_eq!(cache.sweep().await, 1);
        assert_eq!(cache.keys().await, vec!["fresh".to_string()]);
        assert_eq!(cache.sweep().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_runs_and_stops() {
        let cache = Arc::new(TierCache::default());
        cache.set("stale", payload(1), Duration::ZERO).await;

        let shutdown = CancellationToken::new();
        let handle = cache
            .clone()
            .spawn_sweeper(Duration::from_secs(300), shutdown.clone());

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert!(cache.is_empty().await);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn test_fingerprint_ignores_order() {
        let a = RankedEntity::new("1", "A", "RB", 1.0);
        let b = RankedEntity::new("2", "B", "WR", 2.0);
        assert_eq!(
            entity_fingerprint(&[a.clone(), b.clone()]),
            entity_fingerprint(&[b.clone(), a.clone()])
        );

        let moved = RankedEntity::new("2", "B", "WR", 3.0);
        assert_ne!(entity_fingerprint(&[a.clone(), b]), entity_fingerprint(&[a, moved]));
    }

    #[test]
    fn test_cache_key_includes_format_and_k() {
        let entities = vec![RankedEntity::new("1", "A", "RB", 1.0)];
        let options = TierOptions::default();
        let ppr = cache_key("RB", ScoringFormat::Ppr, 5, &options, &entities);
        let standard = cache_key("RB", ScoringFormat::Standard, 5, &options, &entities);
        let k6 = cache_key("RB", ScoringFormat::Ppr, 6, &options, &entities);
        assert!(ppr.starts_with("tiers:RB:ppr:k5:"));
        assert_ne!(ppr, standard);
        assert_ne!(ppr, k6);
    }
}
