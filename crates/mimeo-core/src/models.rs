//! Core data models for mimeo.
//!
//! These types are shared across all mimeo crates and represent the
//! core domain entities: style deltas, edit metadata, style profiles,
//! profile version snapshots, and learning jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// STYLE DELTA
// =============================================================================

/// Sentinel value for "no tone change detected".
pub const NO_TONE_CHANGE: &str = "no change";

/// Emoji usage change between an original and an edited text.
///
/// `net_change` is established at construction and always equals
/// `added - removed`; it is stored, not re-derived lazily.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiChanges {
    pub added: u32,
    pub removed: u32,
    pub net_change: i64,
}

impl EmojiChanges {
    /// Build with the net-change invariant established.
    pub fn new(added: u32, removed: u32) -> Self {
        Self {
            added,
            removed,
            net_change: added as i64 - removed as i64,
        }
    }

    /// Fold another change set in, preserving the invariant.
    pub fn accumulate(&mut self, other: &EmojiChanges) {
        self.added += other.added;
        self.removed += other.removed;
        self.net_change = self.added as i64 - self.removed as i64;
    }
}

/// Document-structure changes observed in one edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureChanges {
    pub paragraphs_added: u32,
    pub paragraphs_removed: u32,
    pub bullets_added: bool,
    /// Ordered sequence of free-text formatting change labels.
    pub formatting_changes: Vec<String>,
}

/// A single word substitution observed in one edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSubstitution {
    pub from: String,
    pub to: String,
}

/// Vocabulary-level changes observed in one edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyChanges {
    pub words_substituted: Vec<WordSubstitution>,
    /// -1 simpler, 0 unchanged, +1 more complex.
    pub complexity_shift: i8,
}

/// Structured diff between an AI-generated text and its human-edited version.
///
/// The atomic unit of observed style change. Produced by a [`DeltaExtractor`]
/// implementation; mimeo never computes deltas itself.
///
/// [`DeltaExtractor`]: crate::traits::DeltaExtractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDelta {
    /// Change in average sentence length (words/sentence), signed.
    pub sentence_length_delta: f64,
    pub emoji_changes: EmojiChanges,
    pub structure_changes: StructureChanges,
    /// Free-text tone label; [`NO_TONE_CHANGE`] means none detected.
    pub tone_shift: String,
    pub vocabulary_changes: VocabularyChanges,
    /// Deduplicated, first-occurrence order.
    pub phrases_added: Vec<String>,
    /// Deduplicated, first-occurrence order.
    pub phrases_removed: Vec<String>,
}

impl Default for StyleDelta {
    fn default() -> Self {
        Self {
            sentence_length_delta: 0.0,
            emoji_changes: EmojiChanges::default(),
            structure_changes: StructureChanges::default(),
            tone_shift: NO_TONE_CHANGE.to_string(),
            vocabulary_changes: VocabularyChanges::default(),
            phrases_added: Vec::new(),
            phrases_removed: Vec::new(),
        }
    }
}

/// Deduplicate a string sequence, keeping first-occurrence order.
pub fn dedup_first_occurrence(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.clone()) {
            out.push(item);
        }
    }
    out
}

// =============================================================================
// EDIT METADATA
// =============================================================================

/// A [`StyleDelta`] plus bookkeeping, attached 1:1 to a [`Content`] record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditMetadata {
    pub delta: StyleDelta,
    pub original_text: String,
    pub edited_text: String,
    pub original_length: usize,
    pub edited_length: usize,
    /// Assigned at write time. Not guaranteed monotone across concurrent
    /// writers; recency queries order strictly by this field.
    pub edit_timestamp: DateTime<Utc>,
    /// Flips to true only via the explicit mark-as-processed operation.
    pub learning_processed: bool,
}

impl EditMetadata {
    /// Build edit metadata at write time. Lengths are derived from the
    /// texts so the length invariant holds by construction.
    pub fn new(delta: StyleDelta, original_text: String, edited_text: String) -> Self {
        Self {
            original_length: original_text.len(),
            edited_length: edited_text.len(),
            original_text,
            edited_text,
            delta,
            edit_timestamp: Utc::now(),
            learning_processed: false,
        }
    }
}

// =============================================================================
// STYLE PROFILE
// =============================================================================

/// High-level voice classification for a user's writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceType {
    Educational,
    Storytelling,
    Opinionated,
    Analytical,
    Casual,
    Professional,
}

/// Tone dimensions, each an integer in [1, 10]. Always fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneSettings {
    pub formality: i32,
    pub enthusiasm: i32,
    pub directness: i32,
    pub humor: i32,
    pub emotionality: i32,
}

impl ToneSettings {
    /// Build with every dimension clamped into [1, 10].
    pub fn new(formality: i32, enthusiasm: i32, directness: i32, humor: i32, emotionality: i32) -> Self {
        Self {
            formality: formality.clamp(1, 10),
            enthusiasm: enthusiasm.clamp(1, 10),
            directness: directness.clamp(1, 10),
            humor: humor.clamp(1, 10),
            emotionality: emotionality.clamp(1, 10),
        }
    }

    /// Re-clamp every dimension into range after a direct field mutation.
    pub fn clamp_in_place(&mut self) {
        self.formality = self.formality.clamp(1, 10);
        self.enthusiasm = self.enthusiasm.clamp(1, 10);
        self.directness = self.directness.clamp(1, 10);
        self.humor = self.humor.clamp(1, 10);
        self.emotionality = self.emotionality.clamp(1, 10);
    }
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self::new(5, 5, 5, 5, 5)
    }
}

/// Vocabulary complexity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyLevel {
    Simple,
    Medium,
    Advanced,
}

/// Where the current profile state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSource {
    Manual,
    File,
    Feedback,
    Archetype,
}

/// Synthesized description of a user's writing voice.
///
/// Created on first voice analysis, mutated by feedback aggregation or
/// manual edit, never hard-deleted — only superseded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    pub voice_type: VoiceType,
    pub tone: ToneSettings,
    pub writing_traits: Vec<String>,
    pub structure_preferences: Vec<String>,
    pub vocabulary_level: VocabularyLevel,
    /// Set semantics, bounded to [`MAX_PHRASE_LIST`] entries.
    ///
    /// [`MAX_PHRASE_LIST`]: crate::defaults::MAX_PHRASE_LIST
    pub common_phrases: Vec<String>,
    pub banned_phrases: Vec<String>,
    /// Bounded to [`MAX_SAMPLE_POSTS`] entries.
    ///
    /// [`MAX_SAMPLE_POSTS`]: crate::defaults::MAX_SAMPLE_POSTS
    pub sample_posts: Vec<String>,
    /// Monotonically non-decreasing counter of applied updates.
    pub learning_iterations: u64,
    pub last_updated: DateTime<Utc>,
    pub profile_source: ProfileSource,
}

impl StyleProfile {
    /// Apply a typed manual override to this profile.
    pub fn apply_override(&mut self, value: ProfileOverride) {
        match value {
            ProfileOverride::Tone(t) => {
                if let Some(v) = t.formality {
                    self.tone.formality = v;
                }
                if let Some(v) = t.enthusiasm {
                    self.tone.enthusiasm = v;
                }
                if let Some(v) = t.directness {
                    self.tone.directness = v;
                }
                if let Some(v) = t.humor {
                    self.tone.humor = v;
                }
                if let Some(v) = t.emotionality {
                    self.tone.emotionality = v;
                }
                self.tone.clamp_in_place();
            }
            ProfileOverride::Traits { writing_traits } => {
                self.writing_traits = dedup_first_occurrence(writing_traits);
            }
            ProfileOverride::Structure { structure_preferences } => {
                self.structure_preferences = dedup_first_occurrence(structure_preferences);
            }
        }
        self.last_updated = Utc::now();
        self.profile_source = ProfileSource::Manual;
    }
}

/// Partial tone override; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneOverride {
    pub formality: Option<i32>,
    pub enthusiasm: Option<i32>,
    pub directness: Option<i32>,
    pub humor: Option<i32>,
    pub emotionality: Option<i32>,
}

/// Tagged union over the known manual-override shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileOverride {
    Tone(ToneOverride),
    Traits { writing_traits: Vec<String> },
    Structure { structure_preferences: Vec<String> },
}

// =============================================================================
// PROFILE VERSIONS
// =============================================================================

/// Provenance tag for a profile version snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    Manual,
    Feedback,
    Archetype,
    Rollback,
}

/// Immutable snapshot of a [`StyleProfile`] at one point in time.
///
/// Captures pre-update state: snapshots are taken immediately before any
/// mutation to the live profile. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileVersion {
    pub profile: StyleProfile,
    pub timestamp: DateTime<Utc>,
    pub source: VersionSource,
    pub learning_iterations: u64,
}

impl ProfileVersion {
    /// Snapshot the given profile now. The profile is cloned structurally
    /// so every field type, dates included, survives the copy exactly.
    pub fn capture(profile: &StyleProfile, source: VersionSource) -> Self {
        Self {
            learning_iterations: profile.learning_iterations,
            profile: profile.clone(),
            timestamp: Utc::now(),
            source,
        }
    }
}

// =============================================================================
// CONTENT AND USER RECORDS
// =============================================================================

/// A piece of generated content owned by a user, optionally carrying edit
/// metadata once the user has edited it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: Uuid,
    pub user_id: Uuid,
    /// The generated (or edited) text body.
    pub body: String,
    /// True for multi-part ("thread") content.
    pub is_thread: bool,
    /// Original per-part texts for thread content; empty otherwise.
    pub parts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_metadata: Option<EditMetadata>,
    pub created_at: DateTime<Utc>,
}

impl Content {
    /// Create a single-part content record.
    pub fn new(user_id: Uuid, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            body: body.into(),
            is_thread: false,
            parts: Vec::new(),
            edit_metadata: None,
            created_at: Utc::now(),
        }
    }

    /// Create a thread content record from position-ordered parts.
    pub fn new_thread(user_id: Uuid, parts: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            body: parts.join("\n"),
            is_thread: true,
            parts,
            edit_metadata: None,
            created_at: Utc::now(),
        }
    }
}

/// A user record holding the live style profile and its version history.
///
/// `revision` is an optimistic-concurrency token: every successful update
/// increments it, and writers retry the whole read-modify-write on conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_profile: Option<StyleProfile>,
    pub profile_versions: Vec<ProfileVersion>,
    pub revision: u64,
}

impl User {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            style_profile: None,
            profile_versions: Vec::new(),
            revision: 0,
        }
    }
}

// =============================================================================
// LEARNING JOBS
// =============================================================================

/// Lifecycle state of a learning job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Job metadata stamped at queue time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub is_thread: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet_count: Option<u32>,
}

/// A queued feedback-learning job for one content edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningJob {
    pub id: Uuid,
    pub content_id: Uuid,
    pub user_id: Uuid,
    pub status: JobStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub metadata: JobMetadata,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl LearningJob {
    /// Create a job in `Pending` state with zero attempts.
    pub fn new(content_id: Uuid, user_id: Uuid, metadata: JobMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_id,
            user_id,
            status: JobStatus::Pending,
            attempts: 0,
            error_message: None,
            metadata,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

// =============================================================================
// AGGREGATION RESULTS
// =============================================================================

/// Summed structure-change counters across a set of edits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureChangeFrequency {
    pub paragraphs_added: u64,
    pub paragraphs_removed: u64,
    pub edits_with_bullets: u64,
}

/// Aggregate view over a user's recent edits.
///
/// `Default` is the well-defined all-zero/empty result for users with no
/// edits; aggregation on empty input returns it rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEditPatterns {
    pub total_edits: u64,
    pub avg_sentence_length_delta: f64,
    pub total_emoji_changes: EmojiChanges,
    /// Tone shifts (excluding "no change"), frequency-sorted descending.
    pub common_tone_shifts: Vec<(String, u64)>,
    /// Phrases counted once per edit they appear in, frequency-sorted.
    pub common_phrases_added: Vec<(String, u64)>,
    pub common_phrases_removed: Vec<(String, u64)>,
    pub structure_change_frequency: StructureChangeFrequency,
}
