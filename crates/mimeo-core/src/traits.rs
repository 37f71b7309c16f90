//! Core traits for mimeo abstractions.
//!
//! These traits define the seams to the external collaborators — the
//! document store, the LLM-backed delta extractor, and the cache —
//! enabling pluggable backends and testability.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// CONTENT REPOSITORY
// =============================================================================

/// Repository for content records and their embedded edit metadata.
///
/// Query shapes follow the document-store contract: find-by-user with a
/// field-exists filter, sort by nested timestamp descending, limit,
/// update-many-by-id, unset-single-field.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Insert a new content record.
    async fn insert(&self, content: Content) -> Result<Uuid>;

    /// Fetch a content record by id. Fails with `ContentNotFound` on miss.
    async fn fetch(&self, id: Uuid) -> Result<Content>;

    /// All content for the user carrying edit metadata, unordered.
    async fn find_with_edit_metadata(&self, user_id: Uuid) -> Result<Vec<Content>>;

    /// Content with edit metadata for the user, ordered by
    /// `edit_metadata.edit_timestamp` descending, up to `limit`.
    /// When `include_processed` is false, only `learning_processed == false`
    /// records are returned.
    async fn find_recent_edits(
        &self,
        user_id: Uuid,
        limit: usize,
        include_processed: bool,
    ) -> Result<Vec<Content>>;

    /// Attach (or replace) edit metadata on a content record.
    async fn set_edit_metadata(&self, content_id: Uuid, meta: EditMetadata) -> Result<()>;

    /// Unset the edit-metadata field, leaving the content record intact.
    async fn unset_edit_metadata(&self, content_id: Uuid) -> Result<()>;

    /// Set `learning_processed = true` on the given ids. Returns the number
    /// of records actually updated; ids without edit metadata are skipped.
    async fn mark_learning_processed(&self, content_ids: &[Uuid]) -> Result<u64>;

    /// Count of content records for the user carrying edit metadata.
    async fn count_with_edit_metadata(&self, user_id: Uuid) -> Result<u64>;
}

// =============================================================================
// USER REPOSITORY
// =============================================================================

/// Repository for user records (live profile + version history).
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user record.
    async fn insert(&self, user: User) -> Result<Uuid>;

    /// Fetch a user by id. Fails with `UserNotFound` on miss.
    async fn fetch(&self, user_id: Uuid) -> Result<User>;

    /// Fetch a user by id, returning None on miss.
    async fn try_get(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Compare-and-swap update keyed on `User.revision`.
    ///
    /// Persists `user` with its revision incremented if and only if the
    /// stored revision still equals `user.revision`; otherwise fails with
    /// `Error::Conflict` and the caller retries the whole read-modify-write.
    async fn update(&self, user: User) -> Result<()>;
}

// =============================================================================
// LEARNING JOB REPOSITORY
// =============================================================================

/// Repository for queued feedback-learning jobs.
#[async_trait]
pub trait LearningJobRepository: Send + Sync {
    /// Queue a job. The job must be in `Pending` state.
    async fn queue(&self, job: LearningJob) -> Result<Uuid>;

    /// Fetch a job by id.
    async fn get(&self, job_id: Uuid) -> Result<Option<LearningJob>>;

    /// Claim the oldest pending job, transitioning it to `Processing`.
    async fn claim_next(&self) -> Result<Option<LearningJob>>;

    /// Mark a job completed.
    async fn complete(&self, job_id: Uuid) -> Result<()>;

    /// Record a failure. Resets the job to `Pending` with `attempts + 1`
    /// while attempts remain under `max_retries`, otherwise marks it
    /// `Failed` with the error message. Jobs are never silently dropped.
    async fn fail(&self, job_id: Uuid, error: &str, max_retries: u32) -> Result<()>;

    /// Number of jobs currently pending.
    async fn pending_count(&self) -> Result<u64>;
}

// =============================================================================
// DELTA EXTRACTOR
// =============================================================================

/// Black-box boundary to the LLM call that extracts a structured style
/// delta from an (original, edited) text pair.
///
/// Implementations may fail transiently (`Error::Extraction`) or
/// terminally (`Error::Validation`); retry policy belongs to the caller.
#[async_trait]
pub trait DeltaExtractor: Send + Sync {
    async fn extract_delta(&self, original: &str, edited: &str) -> Result<StyleDelta>;
}

// =============================================================================
// CACHE
// =============================================================================

/// Read-through/write-through cache contract consumed by the core.
///
/// A cache hit must never outlive a write to the same logical entity: every
/// write site invalidates the affected keys explicitly.
#[async_trait]
pub trait StyleCache: Send + Sync {
    /// Look up a key. Expired entries count as misses.
    async fn get(&self, key: &str) -> Option<JsonValue>;

    /// Store a value with the given time-to-live.
    async fn set(&self, key: &str, value: JsonValue, ttl: Duration);

    /// Drop a single key. Returns whether an entry existed.
    async fn invalidate(&self, key: &str) -> bool;

    /// Drop every key with the given prefix. Returns the number dropped.
    async fn invalidate_prefix(&self, prefix: &str) -> u64;
}
