//! Multi-source suggestion ranking.
//!
//! Candidates arrive from several dictionaries (user-added words, the system
//! word list, the primary language, a secondary language) each carrying a
//! model confidence and a corpus frequency rank. The ranker fuses those
//! signals with the detector's language-context scores into one score per
//! candidate, deduplicates across dictionaries by normalized form, and
//! returns a single ordered list.

use crate::normalizer;
use crate::prefix_index::LookupResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Worst possible frequency rank; rank 0 is the most common word.
pub const MAX_FREQUENCY_RANK: u8 = u8::MAX;

/// Confidence assumed for dictionary words the model gave no score for.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Where a candidate came from. Ordering matters: user-chosen words outrank
/// system ones, and a secondary language ranks below the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateSource {
    /// Word the user explicitly added.
    Custom,
    /// System-level user word list.
    User,
    /// Primary-language dictionary.
    Main,
    /// Secondary-language dictionary.
    Secondary,
}

impl CandidateSource {
    /// Fixed priority multiplier, neutral at the primary dictionary.
    pub fn priority(self) -> f32 {
        match self {
            CandidateSource::Custom => 1.3,
            CandidateSource::User => 1.15,
            CandidateSource::Main => 1.0,
            CandidateSource::Secondary => 0.85,
        }
    }
}

/// A scoreable suggestion candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub word: String,
    pub normalized: String,
    pub frequency_rank: u8,
    pub source: CandidateSource,
    /// Model confidence in `[0, 1]`.
    pub nn_confidence: f32,
    pub language: String,
}

/// One entry of the final ordered suggestion list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSuggestion {
    pub word: String,
    pub score: f32,
    pub source: CandidateSource,
    pub language: String,
}

/// Relative weight of each scoring signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankerWeights {
    pub nn: f32,
    pub frequency: f32,
    pub context: f32,
}

impl Default for RankerWeights {
    fn default() -> Self {
        Self {
            nn: 0.6,
            frequency: 0.3,
            context: 0.1,
        }
    }
}

/// Scores and merges candidates into one ordered suggestion list.
#[derive(Debug, Clone)]
pub struct SuggestionRanker {
    weights: RankerWeights,
    /// Extra context discount for secondary-language candidates.
    secondary_penalty: f32,
}

impl Default for SuggestionRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl SuggestionRanker {
    pub fn new() -> Self {
        Self::with_weights(RankerWeights::default(), 0.5)
    }

    pub fn with_weights(weights: RankerWeights, secondary_penalty: f32) -> Self {
        Self {
            weights,
            secondary_penalty: secondary_penalty.clamp(0.1, 1.0),
        }
    }

    /// Score one candidate against a language-context weight.
    ///
    /// `score = (nn·W_nn + rankScore·W_freq + ctx·W_ctx) · sourcePriority`
    /// where `rankScore = 1 - rank/255` and secondary-language candidates
    /// have their context multiplied by the secondary penalty.
    pub fn score(&self, candidate: &Candidate, language_context: f32) -> f32 {
        let rank_score =
            1.0 - candidate.frequency_rank as f32 / MAX_FREQUENCY_RANK as f32;
        let mut context = language_context;
        if candidate.source == CandidateSource::Secondary {
            context *= self.secondary_penalty;
        }
        ((candidate.nn_confidence * self.weights.nn)
            + (rank_score * self.weights.frequency)
            + (context * self.weights.context))
            * candidate.source.priority()
    }

    /// Score primary and secondary candidate lists, merge, deduplicate by
    /// normalized form (keeping the highest-scoring entry), sort descending
    /// and truncate.
    ///
    /// Equal scores tie-break on the word itself so output order is stable.
    pub fn rank_and_merge(
        &self,
        primary: &[Candidate],
        secondary: &[Candidate],
        primary_context: f32,
        secondary_context: f32,
        max_results: usize,
    ) -> Vec<RankedSuggestion> {
        let mut best: HashMap<&str, RankedSuggestion> = HashMap::new();
        let scored = primary
            .iter()
            .map(|c| (c, primary_context))
            .chain(secondary.iter().map(|c| (c, secondary_context)));
        for (candidate, context) in scored {
            let score = self.score(candidate, context);
            match best.get(candidate.normalized.as_str()) {
                Some(existing) if existing.score >= score => {}
                _ => {
                    best.insert(
                        candidate.normalized.as_str(),
                        RankedSuggestion {
                            word: candidate.word.clone(),
                            score,
                            source: candidate.source,
                            language: candidate.language.clone(),
                        },
                    );
                }
            }
        }
        let mut ranked: Vec<RankedSuggestion> = best.into_values().collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.word.cmp(&b.word))
        });
        ranked.truncate(max_results);
        ranked
    }

    /// Rescale confidences by how much of each candidate the typed prefix
    /// already covers, rewarding shorter completions.
    pub fn apply_prefix_boost(&self, candidates: &mut [Candidate], typed_prefix: &str) {
        let prefix = normalizer::normalize(typed_prefix);
        let prefix_len = prefix.chars().count();
        if prefix_len == 0 {
            return;
        }
        for candidate in candidates.iter_mut() {
            let word_len = candidate.normalized.chars().count();
            if word_len == 0 {
                continue;
            }
            let coverage = (prefix_len as f32 / word_len as f32).min(1.0);
            candidate.nn_confidence *= 0.7 + 0.3 * coverage;
        }
    }

    /// Adapt index lookup results into candidates for one source/language.
    ///
    /// `confidences` maps normalized forms to model confidence; words the
    /// model never scored get [`DEFAULT_CONFIDENCE`].
    pub fn candidates_from_lookup(
        results: &[LookupResult],
        source: CandidateSource,
        language: &str,
        confidences: Option<&HashMap<String, f32>>,
    ) -> Vec<Candidate> {
        results
            .iter()
            .map(|result| Candidate {
                word: result.best_canonical.clone(),
                normalized: result.normalized.clone(),
                frequency_rank: result.best_frequency_rank,
                source,
                nn_confidence: confidences
                    .and_then(|map| map.get(&result.normalized).copied())
                    .unwrap_or(DEFAULT_CONFIDENCE),
                language: language.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        word: &str,
        rank: u8,
        source: CandidateSource,
        confidence: f32,
        language: &str,
    ) -> Candidate {
        Candidate {
            word: word.to_string(),
            normalized: normalizer::normalize(word),
            frequency_rank: rank,
            source,
            nn_confidence: confidence,
            language: language.to_string(),
        }
    }

    #[test]
    fn score_formula_components() {
        let ranker = SuggestionRanker::new();
        let main = candidate("the", 0, CandidateSource::Main, 1.0, "en");
        // 1.0*0.6 + 1.0*0.3 + 1.0*0.1, neutral priority
        assert!((ranker.score(&main, 1.0) - 1.0).abs() < 1e-6);

        let rare = candidate("rare", 255, CandidateSource::Main, 0.0, "en");
        assert!(ranker.score(&rare, 0.0).abs() < 1e-6);

        // custom source outranks main on identical signals
        let custom = candidate("the", 0, CandidateSource::Custom, 1.0, "en");
        assert!(ranker.score(&custom, 1.0) > ranker.score(&main, 1.0));
    }

    #[test]
    fn secondary_penalty_discounts_context_only() {
        let ranker = SuggestionRanker::with_weights(
            RankerWeights {
                nn: 0.0,
                frequency: 0.0,
                context: 1.0,
            },
            0.5,
        );
        let secondary = candidate("søn", 0, CandidateSource::Secondary, 0.9, "da");
        // context 0.8 halved, then secondary priority 0.85
        assert!((ranker.score(&secondary, 0.8) - 0.8 * 0.5 * 0.85).abs() < 1e-6);
    }

    #[test]
    fn dedup_keeps_highest_scoring_entry() {
        let ranker = SuggestionRanker::new();
        let primary = vec![candidate("son", 10, CandidateSource::Main, 0.9, "en")];
        let secondary = vec![candidate("søn", 5, CandidateSource::Secondary, 0.9, "da")];

        let ranked = ranker.rank_and_merge(&primary, &secondary, 0.7, 0.3, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].word, "son");
        assert_eq!(ranked[0].source, CandidateSource::Main);
    }

    #[test]
    fn results_sorted_and_truncated() {
        let ranker = SuggestionRanker::new();
        let primary = vec![
            candidate("common", 0, CandidateSource::Main, 0.9, "en"),
            candidate("middling", 100, CandidateSource::Main, 0.5, "en"),
            candidate("obscure", 250, CandidateSource::Main, 0.2, "en"),
        ];
        let ranked = ranker.rank_and_merge(&primary, &[], 1.0, 0.0, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].word, "common");
        assert_eq!(ranked[1].word, "middling");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn equal_scores_tie_break_on_word() {
        let ranker = SuggestionRanker::new();
        let primary = vec![
            candidate("beta", 10, CandidateSource::Main, 0.5, "en"),
            candidate("alpha", 10, CandidateSource::Main, 0.5, "en"),
        ];
        let ranked = ranker.rank_and_merge(&primary, &[], 1.0, 0.0, 10);
        assert_eq!(ranked[0].word, "alpha");
        assert_eq!(ranked[1].word, "beta");
    }

    #[test]
    fn prefix_boost_prefers_shorter_completions() {
        let ranker = SuggestionRanker::new();
        let mut candidates = vec![
            candidate("bon", 0, CandidateSource::Main, 1.0, "fr"),
            candidate("bonjour", 0, CandidateSource::Main, 1.0, "fr"),
        ];
        ranker.apply_prefix_boost(&mut candidates, "bon");

        // full coverage keeps the confidence, partial coverage scales down
        assert!((candidates[0].nn_confidence - 1.0).abs() < 1e-6);
        let partial = 0.7 + 0.3 * (3.0 / 7.0);
        assert!((candidates[1].nn_confidence - partial).abs() < 1e-6);

        // empty prefix leaves confidences untouched
        let mut untouched = vec![candidate("bon", 0, CandidateSource::Main, 0.4, "fr")];
        ranker.apply_prefix_boost(&mut untouched, "");
        assert!((untouched[0].nn_confidence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn lookup_adaptation_uses_confidence_map() {
        let results = vec![
            LookupResult {
                normalized: "cafe".to_string(),
                canonicals: vec!["café".to_string()],
                best_canonical: "café".to_string(),
                best_frequency_rank: 4,
            },
            LookupResult {
                normalized: "care".to_string(),
                canonicals: vec!["care".to_string()],
                best_canonical: "care".to_string(),
                best_frequency_rank: 9,
            },
        ];
        let mut confidences = HashMap::new();
        confidences.insert("cafe".to_string(), 0.93_f32);

        let candidates = SuggestionRanker::candidates_from_lookup(
            &results,
            CandidateSource::Main,
            "fr",
            Some(&confidences),
        );
        assert_eq!(candidates[0].word, "café");
        assert!((candidates[0].nn_confidence - 0.93).abs() < 1e-6);
        assert!((candidates[1].nn_confidence - DEFAULT_CONFIDENCE).abs() < 1e-6);
        assert_eq!(candidates[1].frequency_rank, 9);
    }
}
