//! Profile version store: bounded, ordered history of style-profile
//! snapshots with rollback.
//!
//! The per-user version list is a bounded ring buffer: append at the back,
//! evict from the front at capacity. Ordering is insertion order, never
//! re-sorted on read. Version indices are only valid for the lifetime of
//! one read — any mutating call invalidates previously fetched indices, so
//! callers re-fetch via [`ProfileVersioningService::version_history`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use mimeo_core::defaults::{CAS_MAX_RETRIES, MAX_PROFILE_VERSIONS};
use mimeo_core::{
    Error, ProfileVersion, Result, StyleProfile, User, UserRepository, VersionSource,
};

/// Single-use token proving a pre-update snapshot was taken.
///
/// Obtained from [`ProfileVersioningService::begin_update`] and consumed by
/// [`ProfileVersioningService::commit_update`], so snapshot-before-mutate
/// holds structurally instead of by call-site convention.
#[must_use = "an update handle must be committed"]
#[derive(Debug)]
pub struct UpdateHandle {
    user_id: Uuid,
}

/// Service maintaining each user's profile version history.
pub struct ProfileVersioningService {
    users: Arc<dyn UserRepository>,
}

impl ProfileVersioningService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// The user repository this service persists through.
    pub fn users(&self) -> &Arc<dyn UserRepository> {
        &self.users
    }

    /// Snapshot the user's current profile into the version history.
    ///
    /// No-op returning false when the user has no current profile. The
    /// snapshot captures pre-update state, so call this before mutating
    /// the live profile (or use [`begin_update`] which does it for you).
    ///
    /// [`begin_update`]: Self::begin_update
    #[instrument(skip(self), fields(op = "create_version_snapshot"))]
    pub async fn create_version_snapshot(
        &self,
        user_id: Uuid,
        source: VersionSource,
    ) -> Result<bool> {
        self.with_user(user_id, |user| {
            let profile = match user.style_profile.as_ref() {
                Some(p) => p,
                None => return Ok(false),
            };
            push_version(user, ProfileVersion::capture(profile, source));
            Ok(true)
        })
        .await
    }

    /// Restore the profile stored at `index` (negative counts from the
    /// most recent, -1 = latest).
    ///
    /// Returns `Ok(None)` when the user has no versions at all; a
    /// non-empty history with an out-of-range index is a validation error.
    /// If a current profile exists it is snapshotted with
    /// `VersionSource::Rollback` first, so the rollback itself is undoable.
    #[instrument(skip(self), fields(op = "rollback_to_version", version_index = index))]
    pub async fn rollback_to_version(
        &self,
        user_id: Uuid,
        index: i64,
    ) -> Result<Option<StyleProfile>> {
        let restored = self
            .with_user(user_id, |user| {
                if user.profile_versions.is_empty() {
                    return Ok(None);
                }
                let idx = resolve_index(index, user.profile_versions.len())?;
                let mut restored = user.profile_versions[idx].profile.clone();

                if let Some(current) = user.style_profile.as_ref() {
                    let snapshot = ProfileVersion::capture(current, VersionSource::Rollback);
                    push_version(user, snapshot);
                }

                restored.last_updated = Utc::now();
                user.style_profile = Some(restored.clone());
                Ok(Some(restored))
            })
            .await?;

        if restored.is_some() {
            info!(%user_id, version_index = index, "Rolled back style profile");
        }
        Ok(restored)
    }

    /// The user's version history, oldest first. Empty when the user is
    /// absent or has no versions.
    pub async fn version_history(&self, user_id: Uuid) -> Result<Vec<ProfileVersion>> {
        Ok(self
            .users
            .try_get(user_id)
            .await?
            .map(|u| u.profile_versions)
            .unwrap_or_default())
    }

    /// Read one version by index (same resolution as rollback); None when
    /// out of range rather than an error.
    pub async fn version(&self, user_id: Uuid, index: i64) -> Result<Option<ProfileVersion>> {
        let versions = self.version_history(user_id).await?;
        if versions.is_empty() {
            return Ok(None);
        }
        match resolve_index(index, versions.len()) {
            Ok(idx) => Ok(versions.into_iter().nth(idx)),
            Err(_) => Ok(None),
        }
    }

    /// Trim the history to the `max_versions` most recent entries.
    /// Returns the number dropped; 0 when already at or under the cap.
    #[instrument(skip(self), fields(op = "prune_versions"))]
    pub async fn prune_versions(&self, user_id: Uuid, max_versions: Option<usize>) -> Result<u64> {
        let cap = max_versions.unwrap_or(MAX_PROFILE_VERSIONS);
        if self.users.try_get(user_id).await?.is_none() {
            return Ok(0);
        }
        self.with_user(user_id, |user| {
            let len = user.profile_versions.len();
            if len <= cap {
                return Ok(0);
            }
            let dropped = len - cap;
            user.profile_versions.drain(..dropped);
            Ok(dropped as u64)
        })
        .await
    }

    /// Empty the version history, returning the prior length.
    #[instrument(skip(self), fields(op = "clear_version_history"))]
    pub async fn clear_version_history(&self, user_id: Uuid) -> Result<u64> {
        if self.users.try_get(user_id).await?.is_none() {
            return Ok(0);
        }
        self.with_user(user_id, |user| {
            let deleted = user.profile_versions.len() as u64;
            user.profile_versions.clear();
            Ok(deleted)
        })
        .await
    }

    /// Begin a profile update: snapshots the current profile (when one
    /// exists) tagged with `source`, and returns the handle
    /// [`commit_update`] requires.
    ///
    /// [`commit_update`]: Self::commit_update
    pub async fn begin_update(&self, user_id: Uuid, source: VersionSource) -> Result<UpdateHandle> {
        // Verify the user exists up front so commit cannot be the first
        // point of failure.
        self.users.fetch(user_id).await?;
        self.create_version_snapshot(user_id, source).await?;
        Ok(UpdateHandle { user_id })
    }

    /// Replace the live profile, consuming the handle from
    /// [`begin_update`]. Refreshes `last_updated`.
    ///
    /// [`begin_update`]: Self::begin_update
    pub async fn commit_update(&self, handle: UpdateHandle, mut profile: StyleProfile) -> Result<()> {
        profile.last_updated = Utc::now();
        self.with_user(handle.user_id, move |user| {
            user.style_profile = Some(profile.clone());
            Ok(())
        })
        .await
    }

    /// Read-modify-write with bounded retry on optimistic-concurrency
    /// conflicts.
    async fn with_user<T, F>(&self, user_id: Uuid, mut apply: F) -> Result<T>
    where
        F: FnMut(&mut User) -> Result<T>,
    {
        let mut attempt = 0u32;
        loop {
            let mut user = self.users.fetch(user_id).await?;
            let out = apply(&mut user)?;
            match self.users.update(user).await {
                Ok(()) => return Ok(out),
                Err(Error::Conflict(msg)) if attempt < CAS_MAX_RETRIES => {
                    attempt += 1;
                    debug!(%user_id, attempt, error = %msg, "Revision conflict, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Append a snapshot and trim the front past the cap. The list stays
/// oldest-first, length <= [`MAX_PROFILE_VERSIONS`].
fn push_version(user: &mut User, version: ProfileVersion) {
    user.profile_versions.push(version);
    let len = user.profile_versions.len();
    if len > MAX_PROFILE_VERSIONS {
        user.profile_versions.drain(..len - MAX_PROFILE_VERSIONS);
    }
}

/// Resolve a possibly-negative index against a non-empty history.
fn resolve_index(index: i64, len: usize) -> Result<usize> {
    let resolved = if index < 0 { len as i64 + index } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(Error::Validation(format!(
            "invalid version index: {} (history length {})",
            index, len
        )));
    }
    Ok(resolved as usize)
}
