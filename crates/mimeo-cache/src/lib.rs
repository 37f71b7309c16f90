//! # mimeo-cache
//!
//! In-memory TTL cache implementing the [`StyleCache`] contract from
//! `mimeo-core`.
//!
//! Three data classes carry distinct default TTLs (style profile 1 h,
//! evolution score 5 min, archetype list 24 h); snapshot-analysis results
//! default to 24 h but the TTL is overridable per call. Invalidation on
//! write is mandatory at every write site: a cache hit must never outlive
//! a write to the same logical entity. Hit/miss counts are observable for
//! tuning and resettable on demand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::trace;
use uuid::Uuid;

use mimeo_core::defaults::{
    TTL_ARCHETYPES_SECS, TTL_EVOLUTION_SCORE_SECS, TTL_SNAPSHOT_ANALYSIS_SECS,
    TTL_STYLE_PROFILE_SECS,
};
use mimeo_core::StyleCache;

// =============================================================================
// KEYS AND DATA CLASSES
// =============================================================================

/// Cached data classes with their default TTLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataClass {
    StyleProfile,
    EvolutionScore,
    ArchetypeList,
    SnapshotAnalysis,
}

impl DataClass {
    pub fn default_ttl(self) -> Duration {
        let secs = match self {
            DataClass::StyleProfile => TTL_STYLE_PROFILE_SECS,
            DataClass::EvolutionScore => TTL_EVOLUTION_SCORE_SECS,
            DataClass::ArchetypeList => TTL_ARCHETYPES_SECS,
            DataClass::SnapshotAnalysis => TTL_SNAPSHOT_ANALYSIS_SECS,
        };
        Duration::from_secs(secs)
    }
}

/// Key for a user's cached style profile.
pub fn profile_key(user_id: Uuid) -> String {
    format!("user:{user_id}:style_profile")
}

/// Key for a user's cached evolution score.
pub fn evolution_key(user_id: Uuid) -> String {
    format!("user:{user_id}:evolution_score")
}

/// Key for the global archetype list.
pub fn archetypes_key() -> String {
    "archetypes".to_string()
}

/// Key for a named snapshot-analysis result.
pub fn snapshot_key(user_id: Uuid, name: &str) -> String {
    format!("user:{user_id}:snapshot:{name}")
}

/// Prefix covering every cached entry for one user, for bulk invalidation
/// at write sites.
pub fn user_prefix(user_id: Uuid) -> String {
    format!("user:{user_id}:")
}

// =============================================================================
// CACHE
// =============================================================================

/// Observable hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

struct Entry {
    value: JsonValue,
    expires_at: Instant,
}

/// In-memory TTL cache. Expired entries count as misses and are evicted
/// lazily on read; `purge_expired` sweeps the rest.
#[derive(Default)]
pub struct TtlCache {
    entries: RwLock<HashMap<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value using its data class's default TTL.
    pub async fn set_class(&self, key: &str, value: JsonValue, class: DataClass) {
        self.set(key, value, class.default_ttl()).await;
    }

    /// Current hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Reset hit/miss counters to zero.
    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Drop every expired entry. Returns the number removed.
    pub async fn purge_expired(&self) -> u64 {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        (before - entries.len()) as u64
    }

    /// Number of live entries (expired-but-unswept entries included).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl StyleCache for TtlCache {
    async fn get(&self, key: &str) -> Option<JsonValue> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    trace!(key, "Cache hit");
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }
        // Expired at read time. Re-check under the write lock: a
        // concurrent set may have refreshed the key since the read lock
        // was dropped, and that value must not be evicted.
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key, "Cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key, "Cache entry expired");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: JsonValue, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    async fn invalidate(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    async fn invalidate_prefix(&self, prefix: &str) -> u64 {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        (before - entries.len()) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_hit_and_miss_counting() {
        let cache = TtlCache::new();
        cache
            .set("k1", json!({"a": 1}), Duration::from_secs(60))
            .await;

        assert_eq!(cache.get("k1").await, Some(json!({"a": 1})));
        assert_eq!(cache.get("absent").await, None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);

        cache.reset_stats();
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = TtlCache::new();
        cache.set("k", json!(1), Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("k").await, None);
        assert_eq!(cache.stats().misses, 1);
        // Lazy eviction removed the entry.
        assert!(cache.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_expired_eviction_never_drops_concurrent_refresh() {
        let cache = Arc::new(TtlCache::new());
        for _ in 0..100 {
            // Seed an already-expired entry, then race a read against a
            // refresh of the same key.
            cache.set("k", json!(0), Duration::ZERO).await;
            let reader = {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get("k").await })
            };
            let writer = {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache.set("k", json!(1), Duration::from_secs(60)).await
                })
            };
            reader.await.unwrap();
            writer.await.unwrap();

            // Whatever the interleaving, the fresh value survives.
            assert_eq!(cache.get("k").await, Some(json!(1)));
        }
    }

    #[tokio::test]
    async fn test_invalidate_single_key() {
        let cache = TtlCache::new();
        cache.set("k", json!(1), Duration::from_secs(60)).await;

        assert!(cache.invalidate("k").await);
        assert!(!cache.invalidate("k").await);
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_invalidate_prefix_scopes_to_one_user() {
        let cache = TtlCache::new();
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();
        cache
            .set(&profile_key(user_a), json!("a"), Duration::from_secs(60))
            .await;
        cache
            .set(&evolution_key(user_a), json!(0.5), Duration::from_secs(60))
            .await;
        cache
            .set(&profile_key(user_b), json!("b"), Duration::from_secs(60))
            .await;

        let dropped = cache.invalidate_prefix(&user_prefix(user_a)).await;
        assert_eq!(dropped, 2);
        assert_eq!(cache.get(&profile_key(user_a)).await, None);
        assert_eq!(cache.get(&profile_key(user_b)).await, Some(json!("b")));
    }

    #[tokio::test]
    async fn test_purge_expired_sweeps() {
        let cache = TtlCache::new();
        cache.set("short", json!(1), Duration::from_millis(5)).await;
        cache.set("long", json!(2), Duration::from_secs(60)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[test]
    fn test_data_class_default_ttls() {
        assert_eq!(
            DataClass::StyleProfile.default_ttl(),
            Duration::from_secs(3_600)
        );
        assert_eq!(
            DataClass::EvolutionScore.default_ttl(),
            Duration::from_secs(300)
        );
        assert_eq!(
            DataClass::ArchetypeList.default_ttl(),
            Duration::from_secs(86_400)
        );
        assert_eq!(
            DataClass::SnapshotAnalysis.default_ttl(),
            Duration::from_secs(86_400)
        );
    }

    #[test]
    fn test_key_builders_share_user_prefix() {
        let user = Uuid::new_v4();
        let prefix = user_prefix(user);
        assert!(profile_key(user).starts_with(&prefix));
        assert!(evolution_key(user).starts_with(&prefix));
        assert!(snapshot_key(user, "march").starts_with(&prefix));
        assert!(!archetypes_key().starts_with(&prefix));
    }
}
