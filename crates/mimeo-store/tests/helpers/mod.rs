//! Shared fixtures for store integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use mimeo_core::{
    DeltaExtractor, Error, ProfileSource, Result, StyleDelta, StyleProfile, ToneSettings, User,
    UserRepository, VocabularyLevel, VoiceType,
};

/// Extractor returning pre-scripted deltas keyed by edited text.
///
/// Unscripted calls return the default delta; edited texts listed as
/// failing return a transient extraction error.
#[derive(Default)]
pub struct ScriptedExtractor {
    scripted: Mutex<HashMap<String, StyleDelta>>,
    failing: Mutex<HashSet<String>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, edited: impl Into<String>, delta: StyleDelta) -> Self {
        self.scripted.lock().unwrap().insert(edited.into(), delta);
        self
    }

    pub fn fail_on(self, edited: impl Into<String>) -> Self {
        self.failing.lock().unwrap().insert(edited.into());
        self
    }
}

#[async_trait]
impl DeltaExtractor for ScriptedExtractor {
    async fn extract_delta(&self, _original: &str, edited: &str) -> Result<StyleDelta> {
        if self.failing.lock().unwrap().contains(edited) {
            return Err(Error::Extraction("scripted failure".into()));
        }
        Ok(self
            .scripted
            .lock()
            .unwrap()
            .get(edited)
            .cloned()
            .unwrap_or_default())
    }
}

/// User repository wrapper that fails the first `conflicts` update calls
/// with a revision conflict, then delegates.
pub struct ConflictingUserRepository {
    inner: Arc<dyn UserRepository>,
    conflicts_remaining: AtomicU32,
    update_calls: AtomicU32,
}

impl ConflictingUserRepository {
    pub fn new(inner: Arc<dyn UserRepository>, conflicts: u32) -> Self {
        Self {
            inner,
            conflicts_remaining: AtomicU32::new(conflicts),
            update_calls: AtomicU32::new(0),
        }
    }

    /// Number of update calls observed, injected conflicts included.
    pub fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepository for ConflictingUserRepository {
    async fn insert(&self, user: User) -> Result<Uuid> {
        self.inner.insert(user).await
    }

    async fn fetch(&self, user_id: Uuid) -> Result<User> {
        self.inner.fetch(user_id).await
    }

    async fn try_get(&self, user_id: Uuid) -> Result<Option<User>> {
        self.inner.try_get(user_id).await
    }

    async fn update(&self, user: User) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.conflicts_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Conflict(format!(
                "user {} revision raced by another writer",
                user.id
            )));
        }
        self.inner.update(user).await
    }
}

/// A plain profile fixture with all-default tone.
pub fn sample_profile() -> StyleProfile {
    StyleProfile {
        voice_type: VoiceType::Casual,
        tone: ToneSettings::default(),
        writing_traits: vec!["concise".to_string()],
        structure_preferences: Vec::new(),
        vocabulary_level: VocabularyLevel::Medium,
        common_phrases: Vec::new(),
        banned_phrases: Vec::new(),
        sample_posts: Vec::new(),
        learning_iterations: 0,
        last_updated: Utc::now(),
        profile_source: ProfileSource::Manual,
    }
}
