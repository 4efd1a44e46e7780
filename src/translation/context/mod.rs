/*!
 * Cross-variant context for contextual translation.
 *
 * Before a variant is translated, every other loaded variant of the same
 * package is captured as a `VariantSnapshot`. For each entry the
 * `ContextAssembler` then collects:
 *
 * - translations of the same key in other variants, in priority order
 * - translations of other keys whose source text is similar enough
 *
 * Snapshots are owned copies, so the variant being translated can be borrowed
 * mutably while its siblings serve as context.
 */

pub mod fuzzy;

use std::collections::HashMap;
use std::sync::Arc;

pub use fuzzy::{EditDistanceScorer, SimilarityScorer, TokenOverlapScorer};

/// Same-key translations taken from other variants
pub const MAX_HISTORY: usize = 3;

/// Similar-key translations per entry
pub const MAX_SIMILAR: usize = 2;

/// Scores must be strictly above this to count as similar
pub const SIMILARITY_THRESHOLD: f32 = 0.6;

/// Translation of the same key in another variant
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalTranslation {
    pub variant: String,
    pub raw: String,
    pub translation: String,
}

/// Translation of a different key with similar source text
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarTranslation {
    pub variant: String,
    pub key: String,
    pub raw: String,
    pub translation: String,
    pub score: f32,
}

/// Context for one (entry, language) pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryContext {
    pub history: Vec<HistoricalTranslation>,
    pub similar: Vec<SimilarTranslation>,
}

impl EntryContext {
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.similar.is_empty()
    }
}

/// One entry of a snapshot with its usable translations
#[derive(Debug, Clone)]
pub struct ContextRecord {
    pub key: String,
    pub raw: String,
    /// language -> translation, failed languages excluded
    pub translations: HashMap<String, String>,
}

/// Frozen view of one variant's entries
#[derive(Debug, Clone)]
pub struct VariantSnapshot {
    variant: String,
    records: Vec<ContextRecord>,
    index: HashMap<String, usize>,
}

impl VariantSnapshot {
    pub fn new(variant: impl Into<String>, records: Vec<ContextRecord>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.key.clone(), i))
            .collect();

        Self {
            variant: variant.into(),
            records,
            index,
        }
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn records(&self) -> &[ContextRecord] {
        &self.records
    }

    pub fn get(&self, key: &str) -> Option<&ContextRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }
}

/// Collects same-key and similar-key translations from sibling variants
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    scorer: Arc<dyn SimilarityScorer>,
    max_history: usize,
    max_similar: usize,
    threshold: f32,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(Arc::new(TokenOverlapScorer::default()))
    }
}

impl ContextAssembler {
    pub fn new(scorer: Arc<dyn SimilarityScorer>) -> Self {
        Self {
            scorer,
            max_history: MAX_HISTORY,
            max_similar: MAX_SIMILAR,
            threshold: SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_limits(mut self, max_history: usize, max_similar: usize) -> Self {
        self.max_history = max_history;
        self.max_similar = max_similar;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Build the context of one entry from `others`, given in priority order
    pub fn assemble(
        &self,
        key: &str,
        raw: &str,
        language: &str,
        others: &[VariantSnapshot],
    ) -> EntryContext {
        let history = others
            .iter()
            .filter_map(|snapshot| {
                let record = snapshot.get(key)?;
                let translation = record.translations.get(language)?;
                Some(HistoricalTranslation {
                    variant: snapshot.variant.clone(),
                    raw: record.raw.clone(),
                    translation: translation.clone(),
                })
            })
            .take(self.max_history)
            .collect();

        EntryContext {
            history,
            similar: self.similar(key, raw, language, others),
        }
    }

    fn similar(
        &self,
        key: &str,
        raw: &str,
        language: &str,
        others: &[VariantSnapshot],
    ) -> Vec<SimilarTranslation> {
        if self.max_similar == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<SimilarTranslation> = Vec::new();
        for snapshot in others {
            for record in &snapshot.records {
                if record.key == key {
                    continue;
                }
                let Some(translation) = record.translations.get(language) else {
                    continue;
                };
                // The same sentence shared by several variants is listed once
                if candidates.iter().any(|c| c.raw == record.raw) {
                    continue;
                }

                let score = self.scorer.score(raw, &record.raw);
                if score > self.threshold {
                    candidates.push(SimilarTranslation {
                        variant: snapshot.variant.clone(),
                        key: record.key.clone(),
                        raw: record.raw.clone(),
                        translation: translation.clone(),
                        score,
                    });
                }
            }
        }

        // Stable sort keeps priority order among equal scores
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(self.max_similar);
        candidates
    }
}

/// Context available to one variant's translate pass
#[derive(Debug, Clone, Default)]
pub struct AuxiliaryContext {
    assembler: ContextAssembler,
    snapshots: Vec<VariantSnapshot>,
}

impl AuxiliaryContext {
    /// Context with no sibling variants
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(assembler: ContextAssembler, snapshots: Vec<VariantSnapshot>) -> Self {
        Self { assembler, snapshots }
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[VariantSnapshot] {
        &self.snapshots
    }

    pub fn entry_context(&self, key: &str, raw: &str, language: &str) -> EntryContext {
        if self.snapshots.is_empty() {
            return EntryContext::default();
        }
        self.assembler.assemble(key, raw, language, &self.snapshots)
    }
}
