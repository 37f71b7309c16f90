//! Feedback learning engine: glue between an edit event and the stores.
//!
//! When a user edits generated content the engine captures the
//! (original, edited) pair, extracts a style delta, persists it as edit
//! metadata, and queues a learning job. Job processing aggregates recent
//! deltas and feeds them back into the user's live style profile behind a
//! pre-update version snapshot, then invalidates that user's cache
//! entries.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use mimeo_cache::user_prefix;
use mimeo_core::defaults::{EDIT_PRUNE_SLACK, MAX_EDIT_METADATA, MAX_PHRASE_LIST};
use mimeo_core::{
    dedup_first_occurrence, AggregatedEditPatterns, ContentRepository, DeltaExtractor,
    EditMetadata, JobMetadata, LearningJob, LearningJobRepository, ProfileSource, Result,
    StyleCache, StyleProfile, UserRepository, VersionSource,
};
use mimeo_store::{EditMetadataStore, ProfileVersioningService};

/// Orchestrates feedback learning for content edits.
///
/// Explicitly constructed and dependency-injected; hold it in an `Arc`
/// and share it between the application layer and the worker.
pub struct FeedbackLearningEngine {
    contents: Arc<dyn ContentRepository>,
    jobs: Arc<dyn LearningJobRepository>,
    cache: Arc<dyn StyleCache>,
    edits: EditMetadataStore,
    versioning: ProfileVersioningService,
}

impl FeedbackLearningEngine {
    pub fn new(
        contents: Arc<dyn ContentRepository>,
        users: Arc<dyn UserRepository>,
        jobs: Arc<dyn LearningJobRepository>,
        extractor: Arc<dyn DeltaExtractor>,
        cache: Arc<dyn StyleCache>,
    ) -> Self {
        Self {
            edits: EditMetadataStore::new(contents.clone(), extractor),
            versioning: ProfileVersioningService::new(users),
            contents,
            jobs,
            cache,
        }
    }

    /// The edit metadata store this engine writes through.
    pub fn edits(&self) -> &EditMetadataStore {
        &self.edits
    }

    /// The profile versioning service this engine snapshots through.
    pub fn versioning(&self) -> &ProfileVersioningService {
        &self.versioning
    }

    /// Capture a single-part edit: extracts the delta between the stored
    /// body and `edited_text`, persists edit metadata, and queues a
    /// learning job.
    #[instrument(skip(self, edited_text), fields(op = "record_edit"))]
    pub async fn record_edit(&self, content_id: Uuid, edited_text: &str) -> Result<Uuid> {
        let content = self.contents.fetch(content_id).await?;
        let delta = self
            .edits
            .extractor()
            .extract_delta(&content.body, edited_text)
            .await?;
        let meta = EditMetadata::new(delta, content.body.clone(), edited_text.to_string());
        self.contents.set_edit_metadata(content_id, meta).await?;
        self.queue_learning_job(content_id, content.user_id).await
    }

    /// Capture a thread edit: pairs each edited part with its stored
    /// original by position, folds the per-part deltas into one edit
    /// metadata record, and queues a learning job.
    #[instrument(skip(self, edited_parts), fields(op = "record_thread_edit"))]
    pub async fn record_thread_edit(
        &self,
        content_id: Uuid,
        edited_parts: &[String],
    ) -> Result<Uuid> {
        let content = self.contents.fetch(content_id).await?;
        self.edits
            .store_thread_edit_metadata(content_id, edited_parts, &content.parts)
            .await?;
        self.queue_learning_job(content_id, content.user_id).await
    }

    /// Queue a learning job for an edited content record. The job is
    /// created in `Pending` state with zero attempts; thread content is
    /// stamped with `is_thread` and its part count.
    pub async fn queue_learning_job(&self, content_id: Uuid, user_id: Uuid) -> Result<Uuid> {
        let content = self.contents.fetch(content_id).await?;
        let metadata = JobMetadata {
            is_thread: content.is_thread,
            tweet_count: content.is_thread.then(|| content.parts.len() as u32),
        };
        let job_id = self
            .jobs
            .queue(LearningJob::new(content_id, user_id, metadata))
            .await?;
        info!(%content_id, %user_id, job_id = %job_id, "Queued learning job");
        Ok(job_id)
    }

    /// Process one claimed learning job: aggregate the user's unprocessed
    /// edits into the live style profile behind a pre-update snapshot,
    /// mark those edits processed, prune lazily, and invalidate the
    /// user's cache entries.
    #[instrument(skip(self, job), fields(op = "process_job", job_id = %job.id))]
    pub async fn process_job(&self, job: &LearningJob) -> Result<()> {
        let user_id = job.user_id;

        let unprocessed = self.edits.unprocessed_edits(user_id, None).await?;
        if unprocessed.is_empty() {
            debug!(%user_id, "No unprocessed edits, nothing to learn");
            return Ok(());
        }

        let patterns = self.edits.aggregate_edit_patterns(user_id, None).await?;
        self.apply_patterns_to_profile(user_id, &patterns).await?;

        let ids: Vec<Uuid> = unprocessed.iter().map(|c| c.id).collect();
        self.edits.mark_edits_processed(&ids).await?;

        // Lazy prune: pay the scan only once the backlog exceeds the cap
        // by a slack margin.
        let count = self.edits.edit_count(user_id).await?;
        if count as usize > MAX_EDIT_METADATA + EDIT_PRUNE_SLACK {
            self.edits.prune_old_edit_metadata(user_id).await?;
        }

        self.cache.invalidate_prefix(&user_prefix(user_id)).await;
        info!(%user_id, edit_count = ids.len(), "Learning job applied");
        Ok(())
    }

    /// Fold aggregated patterns into the user's live profile behind a
    /// feedback-tagged snapshot. Skipped when the user has no profile yet.
    async fn apply_patterns_to_profile(
        &self,
        user_id: Uuid,
        patterns: &AggregatedEditPatterns,
    ) -> Result<()> {
        let user = match self.versioning.users().try_get(user_id).await? {
            Some(u) => u,
            None => {
                debug!(%user_id, "Unknown user, skipping profile update");
                return Ok(());
            }
        };
        let profile = match user.style_profile {
            Some(p) => p,
            None => {
                debug!(%user_id, "No style profile yet, skipping profile update");
                return Ok(());
            }
        };

        let handle = self
            .versioning
            .begin_update(user_id, VersionSource::Feedback)
            .await?;
        let updated = apply_patterns(profile, patterns);
        self.versioning.commit_update(handle, updated).await
    }
}

/// Merge aggregated edit patterns into a profile.
///
/// Frequently added phrases join `common_phrases` and frequently removed
/// ones join `banned_phrases`, both capped at [`MAX_PHRASE_LIST`] with
/// existing entries winning; the learning-iteration counter advances and
/// the profile is marked feedback-sourced.
pub fn apply_patterns(mut profile: StyleProfile, patterns: &AggregatedEditPatterns) -> StyleProfile {
    let mut common = profile.common_phrases;
    common.extend(patterns.common_phrases_added.iter().map(|(p, _)| p.clone()));
    common = dedup_first_occurrence(common);
    common.truncate(MAX_PHRASE_LIST);
    profile.common_phrases = common;

    let mut banned = profile.banned_phrases;
    banned.extend(patterns.common_phrases_removed.iter().map(|(p, _)| p.clone()));
    banned = dedup_first_occurrence(banned);
    banned.truncate(MAX_PHRASE_LIST);
    profile.banned_phrases = banned;

    profile.learning_iterations += 1;
    profile.profile_source = ProfileSource::Feedback;
    profile
}
