//! Profile version history and rollback against the in-memory backend.

mod helpers;

use std::sync::Arc;

use uuid::Uuid;

use helpers::{sample_profile, ConflictingUserRepository};
use mimeo_core::defaults::{CAS_MAX_RETRIES, MAX_PROFILE_VERSIONS};
use mimeo_core::{Error, User, UserRepository, VersionSource};
use mimeo_store::{MemoryBackend, ProfileVersioningService};

async fn seed_user(backend: &MemoryBackend, with_profile: bool) -> Uuid {
    let mut user = User::new(Uuid::new_v4());
    if with_profile {
        user.style_profile = Some(sample_profile());
    }
    UserRepository::insert(backend, user).await.unwrap()
}

#[tokio::test]
async fn test_history_capped_at_ten_most_recent() {
    let backend = MemoryBackend::new();
    let service = ProfileVersioningService::new(Arc::new(backend.clone()));
    let user_id = seed_user(&backend, true).await;

    for i in 0..12u64 {
        // Stamp each snapshot with a distinct iteration count so the
        // eviction order is observable.
        let mut user = UserRepository::fetch(&backend, user_id).await.unwrap();
        user.style_profile.as_mut().unwrap().learning_iterations = i;
        backend.update(user).await.unwrap();
        assert!(service
            .create_version_snapshot(user_id, VersionSource::Manual)
            .await
            .unwrap());
    }

    let history = service.version_history(user_id).await.unwrap();
    assert_eq!(history.len(), MAX_PROFILE_VERSIONS);
    // Oldest two were evicted from the front.
    assert_eq!(history[0].learning_iterations, 2);
    assert_eq!(history[9].learning_iterations, 11);
}

#[tokio::test]
async fn test_snapshot_without_profile_is_noop() {
    let backend = MemoryBackend::new();
    let service = ProfileVersioningService::new(Arc::new(backend.clone()));
    let user_id = seed_user(&backend, false).await;

    let created = service
        .create_version_snapshot(user_id, VersionSource::Manual)
        .await
        .unwrap();
    assert!(!created);
    assert!(service.version_history(user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rollback_round_trip() {
    let backend = MemoryBackend::new();
    let service = ProfileVersioningService::new(Arc::new(backend.clone()));
    let user_id = seed_user(&backend, true).await;

    // Snapshot formality 5, then raise it to 8 through a two-phase update.
    let handle = service
        .begin_update(user_id, VersionSource::Manual)
        .await
        .unwrap();
    let mut updated = sample_profile();
    updated.tone.formality = 8;
    service.commit_update(handle, updated).await.unwrap();

    // Rollback to the snapshot restores formality 5.
    let restored = service
        .rollback_to_version(user_id, 0)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.tone.formality, 5);
    let live = UserRepository::fetch(&backend, user_id)
        .await
        .unwrap()
        .style_profile
        .unwrap();
    assert_eq!(live.tone.formality, 5);

    // The rollback itself snapshotted the formality-8 state, so it is
    // undoable: rolling back to the latest version restores 8.
    let history = service.version_history(user_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].source, VersionSource::Rollback);
    assert_eq!(history[1].profile.tone.formality, 8);

    let restored = service
        .rollback_to_version(user_id, -1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.tone.formality, 8);
}

#[tokio::test]
async fn test_rollback_is_nondestructive_to_history() {
    let backend = MemoryBackend::new();
    let service = ProfileVersioningService::new(Arc::new(backend.clone()));
    let user_id = seed_user(&backend, true).await;

    service
        .create_version_snapshot(user_id, VersionSource::Manual)
        .await
        .unwrap();
    let before = service.version_history(user_id).await.unwrap();

    service.rollback_to_version(user_id, 0).await.unwrap();

    let after = service.version_history(user_id).await.unwrap();
    // The original snapshot is still there, plus the rollback snapshot.
    assert_eq!(after[0], before[0]);
    assert_eq!(after.len(), before.len() + 1);
}

#[tokio::test]
async fn test_rollback_empty_history_returns_none() {
    let backend = MemoryBackend::new();
    let service = ProfileVersioningService::new(Arc::new(backend.clone()));
    let user_id = seed_user(&backend, true).await;

    assert!(service
        .rollback_to_version(user_id, 0)
        .await
        .unwrap()
        .is_none());
    assert!(service
        .rollback_to_version(user_id, -1)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_rollback_out_of_range_is_validation_error() {
    let backend = MemoryBackend::new();
    let service = ProfileVersioningService::new(Arc::new(backend.clone()));
    let user_id = seed_user(&backend, true).await;
    service
        .create_version_snapshot(user_id, VersionSource::Manual)
        .await
        .unwrap();

    let err = service.rollback_to_version(user_id, 3).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let err = service.rollback_to_version(user_id, -2).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_version_read_by_negative_index() {
    let backend = MemoryBackend::new();
    let service = ProfileVersioningService::new(Arc::new(backend.clone()));
    let user_id = seed_user(&backend, true).await;

    for _ in 0..3 {
        service
            .create_version_snapshot(user_id, VersionSource::Feedback)
            .await
            .unwrap();
    }

    let latest = service.version(user_id, -1).await.unwrap().unwrap();
    let history = service.version_history(user_id).await.unwrap();
    assert_eq!(latest, history[2]);

    // Reads never raise on a bad index.
    assert!(service.version(user_id, 9).await.unwrap().is_none());
}

#[tokio::test]
async fn test_prune_and_clear_history() {
    let backend = MemoryBackend::new();
    let service = ProfileVersioningService::new(Arc::new(backend.clone()));
    let user_id = seed_user(&backend, true).await;

    for _ in 0..6 {
        service
            .create_version_snapshot(user_id, VersionSource::Manual)
            .await
            .unwrap();
    }

    let dropped = service.prune_versions(user_id, Some(4)).await.unwrap();
    assert_eq!(dropped, 2);
    assert_eq!(service.version_history(user_id).await.unwrap().len(), 4);

    let cleared = service.clear_version_history(user_id).await.unwrap();
    assert_eq!(cleared, 4);
    assert!(service.version_history(user_id).await.unwrap().is_empty());

    // Absent users report zero rather than an error.
    assert_eq!(service.prune_versions(Uuid::new_v4(), None).await.unwrap(), 0);
    assert_eq!(
        service.clear_version_history(Uuid::new_v4()).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_snapshot_retries_past_revision_conflicts() {
    let backend = MemoryBackend::new();
    let user_id = seed_user(&backend, true).await;
    let users = Arc::new(ConflictingUserRepository::new(
        Arc::new(backend.clone()),
        2,
    ));
    let service = ProfileVersioningService::new(users.clone());

    // Two injected conflicts, then the read-modify-write lands.
    assert!(service
        .create_version_snapshot(user_id, VersionSource::Manual)
        .await
        .unwrap());
    assert_eq!(users.update_calls(), 3);
    assert_eq!(service.version_history(user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_snapshot_gives_up_after_bounded_conflict_retries() {
    let backend = MemoryBackend::new();
    let user_id = seed_user(&backend, true).await;
    let users = Arc::new(ConflictingUserRepository::new(
        Arc::new(backend.clone()),
        CAS_MAX_RETRIES + 1,
    ));
    let service = ProfileVersioningService::new(users.clone());

    let err = service
        .create_version_snapshot(user_id, VersionSource::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(users.update_calls(), CAS_MAX_RETRIES + 1);

    // Nothing landed.
    assert!(service.version_history(user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_begin_update_unknown_user_fails_fast() {
    let backend = MemoryBackend::new();
    let service = ProfileVersioningService::new(Arc::new(backend.clone()));

    let err = service
        .begin_update(Uuid::new_v4(), VersionSource::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UserNotFound(_)));
}

#[tokio::test]
async fn test_commit_update_sets_first_profile() {
    let backend = MemoryBackend::new();
    let service = ProfileVersioningService::new(Arc::new(backend.clone()));
    let user_id = seed_user(&backend, false).await;

    // No profile yet: begin snapshots nothing but the update still lands.
    let handle = service
        .begin_update(user_id, VersionSource::Manual)
        .await
        .unwrap();
    service.commit_update(handle, sample_profile()).await.unwrap();

    let user = UserRepository::fetch(&backend, user_id).await.unwrap();
    assert!(user.style_profile.is_some());
    assert!(user.profile_versions.is_empty());
}
