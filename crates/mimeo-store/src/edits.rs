//! Edit metadata store: durable, capped, queryable storage of per-edit
//! style deltas.
//!
//! Edit metadata lives embedded on its parent content record; pruning
//! unsets the field and never deletes the content, so generation history
//! is preserved.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use mimeo_core::defaults::{
    AGGREGATION_LIMIT, MAX_EDIT_METADATA, MAX_THREAD_LIST_ENTRIES, RECENT_EDITS_LIMIT,
};
use mimeo_core::{
    dedup_first_occurrence, AggregatedEditPatterns, Content, ContentRepository, DeltaExtractor,
    EditMetadata, Result, StructureChanges, StyleDelta, VocabularyChanges, NO_TONE_CHANGE,
};

/// Store for per-edit style deltas attached to content records.
pub struct EditMetadataStore {
    contents: Arc<dyn ContentRepository>,
    extractor: Arc<dyn DeltaExtractor>,
}

impl EditMetadataStore {
    pub fn new(contents: Arc<dyn ContentRepository>, extractor: Arc<dyn DeltaExtractor>) -> Self {
        Self { contents, extractor }
    }

    /// The extractor this store folds deltas through.
    pub fn extractor(&self) -> &Arc<dyn DeltaExtractor> {
        &self.extractor
    }

    /// Enforce the per-user edit-metadata cap.
    ///
    /// Keeps the [`MAX_EDIT_METADATA`] most recent edits by
    /// `edit_timestamp` and unsets the field on the remainder. Returns the
    /// number of records unset; 0 when at or under the cap. Safe to call
    /// repeatedly — a second pass over an already-pruned set is a no-op.
    #[instrument(skip(self), fields(op = "prune_old_edit_metadata"))]
    pub async fn prune_old_edit_metadata(&self, user_id: Uuid) -> Result<u64> {
        let mut edited = self.contents.find_with_edit_metadata(user_id).await?;
        if edited.len() <= MAX_EDIT_METADATA {
            return Ok(0);
        }

        // Most recent first; the sort is stable so ties keep one order for
        // the whole call.
        edited.sort_by(|a, b| {
            let ta = a.edit_metadata.as_ref().map(|m| m.edit_timestamp);
            let tb = b.edit_metadata.as_ref().map(|m| m.edit_timestamp);
            tb.cmp(&ta)
        });

        let mut pruned = 0u64;
        for content in edited.iter().skip(MAX_EDIT_METADATA) {
            self.contents.unset_edit_metadata(content.id).await?;
            pruned += 1;
        }

        info!(%user_id, pruned_count = pruned, "Pruned edit metadata past cap");
        Ok(pruned)
    }

    /// Content with edit metadata for the user, most recent first.
    pub async fn recent_edits(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
        include_processed: bool,
    ) -> Result<Vec<Content>> {
        self.contents
            .find_recent_edits(user_id, limit.unwrap_or(RECENT_EDITS_LIMIT), include_processed)
            .await
    }

    /// Recent edits not yet consumed by learning.
    pub async fn unprocessed_edits(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<Content>> {
        self.recent_edits(user_id, limit, false).await
    }

    /// Mark the given content records' edits as consumed by learning.
    /// Touches only the `learning_processed` flag.
    pub async fn mark_edits_processed(&self, content_ids: &[Uuid]) -> Result<u64> {
        self.contents.mark_learning_processed(content_ids).await
    }

    /// Count of content records for the user carrying edit metadata.
    pub async fn edit_count(&self, user_id: Uuid) -> Result<u64> {
        self.contents.count_with_edit_metadata(user_id).await
    }

    /// Fold up to `limit` recent edits into an aggregate pattern view.
    ///
    /// Returns the all-zero/empty [`AggregatedEditPatterns`] when the user
    /// has no edits; never an error for that case.
    #[instrument(skip(self), fields(op = "aggregate_edit_patterns"))]
    pub async fn aggregate_edit_patterns(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> Result<AggregatedEditPatterns> {
        let edits = self
            .contents
            .find_recent_edits(user_id, limit.unwrap_or(AGGREGATION_LIMIT), true)
            .await?;
        if edits.is_empty() {
            return Ok(AggregatedEditPatterns::default());
        }

        let mut patterns = AggregatedEditPatterns::default();
        let mut sentence_delta_sum = 0.0;
        let mut tone_counter = FrequencyCounter::new();
        let mut added_counter = FrequencyCounter::new();
        let mut removed_counter = FrequencyCounter::new();

        for content in &edits {
            let meta = match content.edit_metadata.as_ref() {
                Some(m) => m,
                None => continue,
            };
            patterns.total_edits += 1;
            sentence_delta_sum += meta.delta.sentence_length_delta;
            patterns
                .total_emoji_changes
                .accumulate(&meta.delta.emoji_changes);

            if meta.delta.tone_shift != NO_TONE_CHANGE {
                tone_counter.add(&meta.delta.tone_shift);
            }
            // Delta phrase lists are deduplicated per edit, so each phrase
            // counts once per edit it appears in.
            for phrase in &meta.delta.phrases_added {
                added_counter.add(phrase);
            }
            for phrase in &meta.delta.phrases_removed {
                removed_counter.add(phrase);
            }

            let freq = &mut patterns.structure_change_frequency;
            freq.paragraphs_added += meta.delta.structure_changes.paragraphs_added as u64;
            freq.paragraphs_removed += meta.delta.structure_changes.paragraphs_removed as u64;
            if meta.delta.structure_changes.bullets_added {
                freq.edits_with_bullets += 1;
            }
        }

        if patterns.total_edits > 0 {
            patterns.avg_sentence_length_delta = sentence_delta_sum / patterns.total_edits as f64;
        }
        patterns.common_tone_shifts = tone_counter.into_sorted();
        patterns.common_phrases_added = added_counter.into_sorted();
        patterns.common_phrases_removed = removed_counter.into_sorted();

        debug!(%user_id, edit_count = patterns.total_edits, "Aggregated edit patterns");
        Ok(patterns)
    }

    /// Extract and fold per-part deltas for multi-part ("thread") content
    /// into one aggregated edit-metadata record on the parent content.
    ///
    /// Each edited part is paired with its original by position. A part
    /// with no matching original, or whose extraction fails, is skipped
    /// with a warning; the whole operation fails only when `content_id`
    /// does not resolve. The single write happens at the end, so a failed
    /// call leaves no partial state.
    #[instrument(skip(self, edited_parts, original_parts), fields(op = "store_thread_edit_metadata"))]
    pub async fn store_thread_edit_metadata(
        &self,
        content_id: Uuid,
        edited_parts: &[String],
        original_parts: &[String],
    ) -> Result<EditMetadata> {
        // Resolve the parent first; a bad id fails atomically.
        self.contents.fetch(content_id).await?;

        let extractions = join_all(edited_parts.iter().enumerate().map(|(i, edited)| {
            let original = original_parts.get(i);
            async move {
                match original {
                    Some(original) => Some(self.extractor.extract_delta(original, edited).await),
                    None => {
                        warn!(%content_id, part_index = i, "No original for edited part, skipping");
                        None
                    }
                }
            }
        }))
        .await;

        // join_all preserves position order, so the fold below is
        // deterministic regardless of extraction completion order.
        let mut deltas = Vec::new();
        for (i, outcome) in extractions.into_iter().enumerate() {
            match outcome {
                Some(Ok(delta)) => deltas.push(delta),
                Some(Err(e)) => {
                    warn!(%content_id, part_index = i, error = %e, "Part extraction failed, skipping");
                }
                None => {}
            }
        }

        let delta = fold_thread_deltas(&deltas);
        let meta = EditMetadata::new(
            delta,
            original_parts.join("\n"),
            edited_parts.join("\n"),
        );
        self.contents.set_edit_metadata(content_id, meta.clone()).await?;
        Ok(meta)
    }
}

/// Fold position-ordered per-part deltas into one thread-level delta.
///
/// Averages sentence-length delta and complexity shift, sums emoji and
/// paragraph counts, takes the mode of non-"no change" tone shifts, and
/// unions phrase/formatting/substitution lists truncated to
/// [`MAX_THREAD_LIST_ENTRIES`].
fn fold_thread_deltas(deltas: &[StyleDelta]) -> StyleDelta {
    if deltas.is_empty() {
        return StyleDelta::default();
    }
    let n = deltas.len() as f64;

    let mut folded = StyleDelta::default();
    let mut complexity_sum = 0i64;
    let mut tone_counter = FrequencyCounter::new();
    let mut structure = StructureChanges::default();
    let mut vocabulary = VocabularyChanges::default();
    let mut phrases_added = Vec::new();
    let mut phrases_removed = Vec::new();
    let mut formatting = Vec::new();

    for delta in deltas {
        folded.sentence_length_delta += delta.sentence_length_delta;
        folded.emoji_changes.accumulate(&delta.emoji_changes);
        complexity_sum += delta.vocabulary_changes.complexity_shift as i64;
        if delta.tone_shift != NO_TONE_CHANGE {
            tone_counter.add(&delta.tone_shift);
        }
        structure.paragraphs_added += delta.structure_changes.paragraphs_added;
        structure.paragraphs_removed += delta.structure_changes.paragraphs_removed;
        structure.bullets_added |= delta.structure_changes.bullets_added;
        formatting.extend(delta.structure_changes.formatting_changes.iter().cloned());
        phrases_added.extend(delta.phrases_added.iter().cloned());
        phrases_removed.extend(delta.phrases_removed.iter().cloned());
        vocabulary
            .words_substituted
            .extend(delta.vocabulary_changes.words_substituted.iter().cloned());
    }

    folded.sentence_length_delta /= n;
    vocabulary.complexity_shift =
        ((complexity_sum as f64 / n).round() as i8).clamp(-1, 1);
    vocabulary.words_substituted.truncate(MAX_THREAD_LIST_ENTRIES);

    folded.tone_shift = tone_counter
        .mode()
        .unwrap_or_else(|| NO_TONE_CHANGE.to_string());

    structure.formatting_changes = truncated_union(formatting);
    folded.structure_changes = structure;
    folded.vocabulary_changes = vocabulary;
    folded.phrases_added = truncated_union(phrases_added);
    folded.phrases_removed = truncated_union(phrases_removed);
    folded
}

fn truncated_union(items: Vec<String>) -> Vec<String> {
    let mut out = dedup_first_occurrence(items);
    out.truncate(MAX_THREAD_LIST_ENTRIES);
    out
}

/// Frequency counter that keeps first-occurrence order for ties.
struct FrequencyCounter {
    counts: HashMap<String, u64>,
    order: Vec<String>,
}

impl FrequencyCounter {
    fn new() -> Self {
        Self {
            counts: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn add(&mut self, key: &str) {
        match self.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(key.to_string(), 1);
                self.order.push(key.to_string());
            }
        }
    }

    /// Entries sorted by count descending; ties keep first-occurrence order.
    fn into_sorted(self) -> Vec<(String, u64)> {
        let counts = self.counts;
        let mut out: Vec<(String, u64)> = self
            .order
            .into_iter()
            .map(|k| {
                let count = counts[&k];
                (k, count)
            })
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1));
        out
    }

    /// Most frequent entry, first-occurrence order breaking ties.
    fn mode(self) -> Option<String> {
        self.into_sorted().into_iter().next().map(|(k, _)| k)
    }
}
