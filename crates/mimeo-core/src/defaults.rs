//! Centralized default constants for mimeo.
//!
//! **This module is the single source of truth** for all shared default
//! values. Other crates reference these constants instead of defining
//! their own magic numbers.

// =============================================================================
// STORAGE CAPS
// =============================================================================

/// Maximum retained edit-metadata records per user. Pruning keeps the most
/// recent entries by edit timestamp and unsets the rest.
pub const MAX_EDIT_METADATA: usize = 50;

/// Maximum profile version snapshots per user (FIFO eviction from the front).
pub const MAX_PROFILE_VERSIONS: usize = 10;

/// Maximum entries in a profile's common/banned phrase lists.
pub const MAX_PHRASE_LIST: usize = 20;

/// Maximum sample posts retained on a profile.
pub const MAX_SAMPLE_POSTS: usize = 10;

/// Maximum phrases/formatting labels/word substitutions kept when folding a
/// thread's per-part deltas into one aggregated record.
pub const MAX_THREAD_LIST_ENTRIES: usize = 10;

// =============================================================================
// QUERIES
// =============================================================================

/// Default page size for recent-edit queries.
pub const RECENT_EDITS_LIMIT: usize = 20;

/// Default number of recent edits folded by pattern aggregation.
pub const AGGREGATION_LIMIT: usize = 50;

// =============================================================================
// LEARNING ENGINE
// =============================================================================

/// Maximum extractor attempts (1 immediate + 3 backed-off retries).
pub const EXTRACTOR_MAX_ATTEMPTS: u32 = 4;

/// Base backoff delay in milliseconds; doubles per retry (1s, 2s, 4s).
pub const EXTRACTOR_BACKOFF_BASE_MS: u64 = 1_000;

/// Maximum retries for a failed learning job before it is marked failed.
pub const JOB_MAX_RETRIES: u32 = 3;

/// Default polling interval for the learning worker (milliseconds).
pub const JOB_POLL_INTERVAL_MS: u64 = 500;

/// Worker event broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Edit-count slack past the cap before the engine prunes lazily. Pruning
/// on every write would pay the full scan per edit; the cap is still
/// enforced within this window.
pub const EDIT_PRUNE_SLACK: usize = 5;

/// Maximum read-modify-write retries on an optimistic-concurrency conflict.
pub const CAS_MAX_RETRIES: u32 = 5;

// =============================================================================
// CACHE TTLS
// =============================================================================

/// Style profile cache TTL (1 hour).
pub const TTL_STYLE_PROFILE_SECS: u64 = 3_600;

/// Evolution score cache TTL (5 minutes).
pub const TTL_EVOLUTION_SCORE_SECS: u64 = 300;

/// Archetype list cache TTL (24 hours).
pub const TTL_ARCHETYPES_SECS: u64 = 86_400;

/// Snapshot-analysis result cache TTL (24 hours, overridable per call).
pub const TTL_SNAPSHOT_ANALYSIS_SECS: u64 = 86_400;
