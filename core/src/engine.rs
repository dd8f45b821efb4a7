//! Swipe resolution pipeline.
//!
//! `SwipeEngine` wires the full path from raw touch samples to a ranked
//! suggestion list: feature extraction, the injected trajectory model,
//! per-language dictionary lookups, and detector-weighted ranking. The model
//! itself stays an opaque collaborator behind [`TrajectoryModel`], so the
//! engine never links an inference backend.

use crate::detector::LanguageDetector;
use crate::dictionary::{DictionaryLoader, DictionaryManager};
use crate::features::{self, FeaturePoint};
use crate::normalizer;
use crate::prefix_index::{LookupResult, NormalizedIndex};
use crate::ranker::{Candidate, CandidateSource, RankedSuggestion, SuggestionRanker};
use crate::Config;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

/// The neural trajectory decoder, consumed as an opaque service.
///
/// Takes the fixed-shape feature sequence plus its effective length and
/// returns candidate character sequences over the normalized alphabet,
/// ordered by descending confidence.
pub trait TrajectoryModel {
    fn predict(
        &self,
        features: &[FeaturePoint],
        valid_length: usize,
        max_candidates: usize,
    ) -> Vec<(String, f32)>;
}

/// End-to-end swipe resolver for one primary and an optional secondary
/// language.
pub struct SwipeEngine<M: TrajectoryModel, L: DictionaryLoader> {
    model: M,
    dictionaries: Arc<DictionaryManager<L>>,
    detector: LanguageDetector,
    ranker: SuggestionRanker,
    config: Config,
    primary_language: String,
    secondary_language: Option<String>,
    /// Reusable feature buffer for the latency-sensitive resolve path. One
    /// buffer per engine; engines are not shared across threads.
    scratch: RefCell<Vec<FeaturePoint>>,
}

impl<M: TrajectoryModel, L: DictionaryLoader> SwipeEngine<M, L> {
    /// Create an engine over a model and a dictionary loader. The primary
    /// language starts at the configured fallback until
    /// [`set_languages`](Self::set_languages) is called.
    pub fn new(model: M, loader: L, config: Config) -> Self {
        let dictionaries = Arc::new(DictionaryManager::new(loader, &config.fallback_language));
        let detector =
            LanguageDetector::with_limits(config.detector_window, config.detector_top_n);
        let ranker = SuggestionRanker::with_weights(
            config.ranker_weights(),
            config.secondary_penalty,
        );
        let primary_language = config.fallback_language.clone();
        Self {
            model,
            dictionaries,
            detector,
            ranker,
            config,
            primary_language,
            secondary_language: None,
            scratch: RefCell::new(Vec::new()),
        }
    }

    /// Switch the active language pair, loading what is missing and
    /// evicting what is no longer referenced.
    ///
    /// Returns whether the primary language's index is available; a missing
    /// secondary degrades to primary-only resolution.
    pub fn set_languages(&mut self, primary: &str, secondary: Option<&str>) -> bool {
        let primary_ok = self.dictionaries.load_index(primary);
        if !primary_ok {
            tracing::warn!(language = %primary, "primary dictionary unavailable");
        }
        if let Some(table) = self
            .dictionaries
            .load_unigrams(primary, self.detector.top_n())
        {
            self.detector.load_language(table);
        }

        if let Some(code) = secondary {
            if self.dictionaries.load_index(code) {
                if let Some(table) = self
                    .dictionaries
                    .load_unigrams(code, self.detector.top_n())
                {
                    self.detector.load_language(table);
                }
            } else {
                tracing::warn!(language = %code, "secondary dictionary unavailable");
            }
        }

        self.primary_language = primary.to_string();
        self.secondary_language = secondary.map(str::to_string);

        // Drop cached languages and detector tables the new pair no longer
        // references.
        let keep: Vec<&str> = [Some(primary), secondary]
            .into_iter()
            .flatten()
            .chain(std::iter::once(self.dictionaries.fallback_language()))
            .collect();
        let keep: Vec<String> = keep.iter().map(|s| s.to_string()).collect();
        for language in self.dictionaries.loaded_languages() {
            if !keep.contains(&language) {
                self.dictionaries.unload(&language);
            }
        }
        for language in self.detector.loaded_languages() {
            if language != primary && secondary != Some(language.as_str()) {
                self.detector.unload_language(&language);
            }
        }

        primary_ok
    }

    /// Resolve one completed swipe into ranked suggestions.
    ///
    /// `timestamps_ms` may be absent; the lower-fidelity synthetic-spacing
    /// path is used instead. Returns an empty list when no dictionary is
    /// loaded yet or the model produced nothing; neither is an error.
    pub fn resolve(
        &self,
        xs: &[f32],
        ys: &[f32],
        timestamps_ms: Option<&[f32]>,
        max_results: usize,
    ) -> Vec<RankedSuggestion> {
        let mut scratch = self.scratch.borrow_mut();
        match timestamps_ms {
            Some(ts) => features::calculate_features_into(xs, ys, ts, &mut scratch),
            None => *scratch = features::calculate_features_without_timestamps(xs, ys),
        }
        if scratch.is_empty() {
            return Vec::new();
        }
        let (padded, valid_length) =
            features::pad_or_truncate(&scratch, self.config.model_sequence_length);
        drop(scratch);

        let predictions =
            self.model
                .predict(&padded, valid_length, self.config.max_suggestions);
        if predictions.is_empty() {
            tracing::debug!("model produced no candidate sequences");
            return Vec::new();
        }

        // Best confidence per normalized sequence; predictions arrive in
        // descending confidence order.
        let mut confidences: HashMap<String, f32> = HashMap::new();
        for (sequence, confidence) in &predictions {
            confidences
                .entry(normalizer::normalize(sequence))
                .or_insert(*confidence);
        }

        let scores = self.detector.language_scores();
        let primary_context = scores
            .get(&self.primary_language)
            .copied()
            .unwrap_or(1.0);
        let secondary_context = self
            .secondary_language
            .as_ref()
            .and_then(|code| scores.get(code))
            .copied()
            .unwrap_or(1.0);

        let primary_candidates = match self.dictionaries.index(&self.primary_language) {
            Some(entry) => self.collect_candidates(
                &entry.index,
                CandidateSource::Main,
                &self.primary_language,
                &confidences,
                &predictions,
            ),
            None => Vec::new(),
        };
        let secondary_candidates = match &self.secondary_language {
            Some(code) => match self.dictionaries.index(code) {
                Some(entry) => self.collect_candidates(
                    &entry.index,
                    CandidateSource::Secondary,
                    code,
                    &confidences,
                    &predictions,
                ),
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        self.ranker.rank_and_merge(
            &primary_candidates,
            &secondary_candidates,
            primary_context,
            secondary_context,
            max_results,
        )
    }

    /// Exact lookups for every decoded sequence, plus prefix completions of
    /// the top sequence with their confidence boosted by prefix coverage.
    fn collect_candidates(
        &self,
        index: &NormalizedIndex,
        source: CandidateSource,
        language: &str,
        confidences: &HashMap<String, f32>,
        predictions: &[(String, f32)],
    ) -> Vec<Candidate> {
        let exact: Vec<LookupResult> = predictions
            .iter()
            .filter_map(|(sequence, _)| index.lookup(&normalizer::normalize(sequence)))
            .collect();
        let mut candidates = SuggestionRanker::candidates_from_lookup(
            &exact,
            source,
            language,
            Some(confidences),
        );

        if let Some((best_sequence, _)) = predictions.first() {
            let completions = index.words_with_prefix(best_sequence);
            let completions = &completions[..completions.len().min(self.config.max_suggestions)];
            let mut extra = SuggestionRanker::candidates_from_lookup(
                completions,
                source,
                language,
                Some(confidences),
            );
            self.ranker.apply_prefix_boost(&mut extra, best_sequence);
            candidates.extend(extra);
        }
        candidates
    }

    /// Report a committed word (suggestion tap or separator commit) to the
    /// language detector.
    pub fn commit(&self, word: &str) {
        self.detector.record_word(word);
    }

    /// Forget typing context, e.g. when focus moves to another field.
    pub fn clear_context(&self) {
        self.detector.clear_history();
    }

    pub fn primary_language(&self) -> &str {
        &self.primary_language
    }

    pub fn secondary_language(&self) -> Option<&str> {
        self.secondary_language.as_deref()
    }

    pub fn detector(&self) -> &LanguageDetector {
        &self.detector
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn dictionaries(&self) -> &Arc<DictionaryManager<L>> {
        &self.dictionaries
    }
}
