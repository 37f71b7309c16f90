//! In-memory document-store backend.
//!
//! Implements the repository traits over maps behind async locks. This is
//! the reference backend the stores run against in tests and embedded
//! deployments; a real deployment substitutes a document-database client
//! behind the same traits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use mimeo_core::{
    Content, EditMetadata, Error, JobStatus, LearningJob, Result, User,
    ContentRepository, LearningJobRepository, UserRepository,
};

/// Shared in-memory backend implementing all three repositories.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    contents: Arc<RwLock<HashMap<Uuid, Content>>>,
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    jobs: Arc<RwLock<HashMap<Uuid, LearningJob>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentRepository for MemoryBackend {
    async fn insert(&self, content: Content) -> Result<Uuid> {
        let id = content.id;
        self.contents.write().await.insert(id, content);
        Ok(id)
    }

    async fn fetch(&self, id: Uuid) -> Result<Content> {
        self.contents
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(Error::ContentNotFound(id))
    }

    async fn find_with_edit_metadata(&self, user_id: Uuid) -> Result<Vec<Content>> {
        Ok(self
            .contents
            .read()
            .await
            .values()
            .filter(|c| c.user_id == user_id && c.edit_metadata.is_some())
            .cloned()
            .collect())
    }

    async fn find_recent_edits(
        &self,
        user_id: Uuid,
        limit: usize,
        include_processed: bool,
    ) -> Result<Vec<Content>> {
        let mut edits: Vec<Content> = self
            .contents
            .read()
            .await
            .values()
            .filter(|c| {
                c.user_id == user_id
                    && c.edit_metadata
                        .as_ref()
                        .map(|m| include_processed || !m.learning_processed)
                        .unwrap_or(false)
            })
            .cloned()
            .collect();

        // Most recent first; stable within one call.
        edits.sort_by(|a, b| {
            let ta = a.edit_metadata.as_ref().map(|m| m.edit_timestamp);
            let tb = b.edit_metadata.as_ref().map(|m| m.edit_timestamp);
            tb.cmp(&ta)
        });
        edits.truncate(limit);
        Ok(edits)
    }

    async fn set_edit_metadata(&self, content_id: Uuid, meta: EditMetadata) -> Result<()> {
        let mut contents = self.contents.write().await;
        let content = contents
            .get_mut(&content_id)
            .ok_or(Error::ContentNotFound(content_id))?;
        content.edit_metadata = Some(meta);
        Ok(())
    }

    async fn unset_edit_metadata(&self, content_id: Uuid) -> Result<()> {
        let mut contents = self.contents.write().await;
        let content = contents
            .get_mut(&content_id)
            .ok_or(Error::ContentNotFound(content_id))?;
        content.edit_metadata = None;
        Ok(())
    }

    async fn mark_learning_processed(&self, content_ids: &[Uuid]) -> Result<u64> {
        let mut contents = self.contents.write().await;
        let mut updated = 0;
        for id in content_ids {
            if let Some(meta) = contents.get_mut(id).and_then(|c| c.edit_metadata.as_mut()) {
                if !meta.learning_processed {
                    meta.learning_processed = true;
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    async fn count_with_edit_metadata(&self, user_id: Uuid) -> Result<u64> {
        Ok(self
            .contents
            .read()
            .await
            .values()
            .filter(|c| c.user_id == user_id && c.edit_metadata.is_some())
            .count() as u64)
    }
}

#[async_trait]
impl UserRepository for MemoryBackend {
    async fn insert(&self, user: User) -> Result<Uuid> {
        let id = user.id;
        self.users.write().await.insert(id, user);
        Ok(id)
    }

    async fn fetch(&self, user_id: Uuid) -> Result<User> {
        self.users
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or(Error::UserNotFound(user_id))
    }

    async fn try_get(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn update(&self, mut user: User) -> Result<()> {
        let mut users = self.users.write().await;
        let stored = users
            .get(&user.id)
            .ok_or(Error::UserNotFound(user.id))?;
        if stored.revision != user.revision {
            return Err(Error::Conflict(format!(
                "user {} revision {} does not match stored {}",
                user.id, user.revision, stored.revision
            )));
        }
        user.revision += 1;
        users.insert(user.id, user);
        Ok(())
    }
}

#[async_trait]
impl LearningJobRepository for MemoryBackend {
    async fn queue(&self, job: LearningJob) -> Result<Uuid> {
        if job.status != JobStatus::Pending {
            return Err(Error::Job(format!(
                "job {} queued in non-pending state",
                job.id
            )));
        }
        let id = job.id;
        self.jobs.write().await.insert(id, job);
        Ok(id)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<LearningJob>> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }

    async fn claim_next(&self) -> Result<Option<LearningJob>> {
        let mut jobs = self.jobs.write().await;
        // Oldest pending first; id is the tie-break for stability.
        let next_id = jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| (j.created_at, j.id))
            .map(|j| j.id);
        if let Some(job) = next_id.and_then(|id| jobs.get_mut(&id)) {
            job.status = JobStatus::Processing;
            return Ok(Some(job.clone()));
        }
        Ok(None)
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| Error::Job(format!("unknown job {}", job_id)))?;
        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str, max_retries: u32) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| Error::Job(format!("unknown job {}", job_id)))?;
        job.error_message = Some(error.to_string());
        if job.attempts < max_retries {
            job.attempts += 1;
            job.status = JobStatus::Pending;
        } else {
            job.status = JobStatus::Failed;
            job.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn pending_count(&self) -> Result<u64> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimeo_core::{JobMetadata, StyleDelta};

    #[tokio::test]
    async fn test_fetch_missing_content_is_not_found() {
        let backend = MemoryBackend::new();
        let err = ContentRepository::fetch(&backend, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ContentNotFound(_)));
    }

    #[tokio::test]
    async fn test_unset_preserves_content_record() {
        let backend = MemoryBackend::new();
        let user_id = Uuid::new_v4();
        let mut content = Content::new(user_id, "draft");
        content.edit_metadata = Some(EditMetadata::new(
            StyleDelta::default(),
            "draft".into(),
            "edited draft".into(),
        ));
        let id = ContentRepository::insert(&backend, content).await.unwrap();

        backend.unset_edit_metadata(id).await.unwrap();

        let fetched = ContentRepository::fetch(&backend, id).await.unwrap();
        assert!(fetched.edit_metadata.is_none());
        assert_eq!(fetched.body, "draft");
    }

    #[tokio::test]
    async fn test_mark_processed_touches_only_flag() {
        let backend = MemoryBackend::new();
        let user_id = Uuid::new_v4();
        let mut content = Content::new(user_id, "draft");
        content.edit_metadata = Some(EditMetadata::new(
            StyleDelta::default(),
            "a".into(),
            "b".into(),
        ));
        let before = content.edit_metadata.clone().unwrap();
        let id = ContentRepository::insert(&backend, content).await.unwrap();

        let updated = backend.mark_learning_processed(&[id]).await.unwrap();
        assert_eq!(updated, 1);

        let after = ContentRepository::fetch(&backend, id)
            .await
            .unwrap()
            .edit_metadata
            .unwrap();
        assert!(after.learning_processed);
        assert_eq!(after.edit_timestamp, before.edit_timestamp);
        assert_eq!(after.delta, before.delta);

        // Second call is a no-op.
        let updated = backend.mark_learning_processed(&[id]).await.unwrap();
        assert_eq!(updated, 0);
    }

    #[tokio::test]
    async fn test_user_update_cas_conflict() {
        let backend = MemoryBackend::new();
        let user = User::new(Uuid::new_v4());
        let id = UserRepository::insert(&backend, user).await.unwrap();

        let copy_a = UserRepository::fetch(&backend, id).await.unwrap();
        let copy_b = UserRepository::fetch(&backend, id).await.unwrap();

        backend.update(copy_a).await.unwrap();
        let err = backend.update(copy_b).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Re-fetching picks up the new revision and succeeds.
        let fresh = UserRepository::fetch(&backend, id).await.unwrap();
        backend.update(fresh).await.unwrap();
    }

    #[tokio::test]
    async fn test_job_claim_retry_then_fail() {
        let backend = MemoryBackend::new();
        let job = LearningJob::new(Uuid::new_v4(), Uuid::new_v4(), JobMetadata::default());
        let id = backend.queue(job).await.unwrap();

        let claimed = backend.claim_next().await.unwrap().unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.status, JobStatus::Processing);

        backend.fail(id, "extractor down", 1).await.unwrap();
        let job = backend.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 1);

        backend.claim_next().await.unwrap().unwrap();
        backend.fail(id, "extractor still down", 1).await.unwrap();
        let job = backend.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("extractor still down"));
    }

    #[tokio::test]
    async fn test_queue_rejects_non_pending_job() {
        let backend = MemoryBackend::new();
        let mut job = LearningJob::new(Uuid::new_v4(), Uuid::new_v4(), JobMetadata::default());
        job.status = JobStatus::Completed;
        assert!(backend.queue(job).await.is_err());
    }
}
