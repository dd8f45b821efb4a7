//! Sliding-window language detection from recently committed words.
//!
//! Each loaded language carries a table of its most common words (rank =
//! position in a most-frequent-first word list). The detector keeps a small
//! window of the user's latest committed words and scores every language by
//! how strongly the window overlaps its table, weighted toward common words.
//! Scores are normalized to sum to 1 and drive the ranker's language-context
//! weight.
//!
//! Scores are memoized; every mutation of the window or the loaded-language
//! set invalidates the memo before any reader can observe it, so a reader
//! sees either the fully-prior or the fully-updated window, never a mix.

use crate::normalizer;
use ahash::AHashMap;
use std::collections::{HashMap, VecDeque};
use std::io::BufRead;
use std::sync::RwLock;

/// Committed words remembered for scoring.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// How many top-ranked words each language table keeps.
pub const DEFAULT_TOP_N: usize = 5000;

/// Frequency-ranked unigram table for one language. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct LanguageUnigrams {
    code: String,
    ranks: AHashMap<String, u32>,
    total_words: usize,
}

impl LanguageUnigrams {
    /// Parse a plain word list, one word per line, most frequent first.
    ///
    /// Lines are trimmed and lowercased; lines shorter than two characters
    /// are skipped. Rank is the zero-based position among kept lines, capped
    /// at `top_n`. Duplicate words are not filtered: a later occurrence
    /// overwrites the earlier rank slot, since the table is keyed by word.
    pub fn from_reader<R: BufRead>(code: &str, reader: R, top_n: usize) -> std::io::Result<Self> {
        let mut ranks = AHashMap::new();
        let mut kept = 0usize;
        for line in reader.lines() {
            if kept >= top_n {
                break;
            }
            let word = line?.trim().to_lowercase();
            if word.chars().count() < 2 {
                continue;
            }
            ranks.insert(word, kept as u32);
            kept += 1;
        }
        Ok(Self {
            code: code.to_string(),
            total_words: ranks.len(),
            ranks,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn rank(&self, word: &str) -> Option<u32> {
        self.ranks.get(word).copied()
    }

    pub fn total_words(&self) -> usize {
        self.total_words
    }
}

#[derive(Debug, Default)]
struct DetectorState {
    /// Load order is significant: equal scores resolve to the earliest
    /// loaded language.
    languages: Vec<LanguageUnigrams>,
    window: VecDeque<String>,
    cached_scores: Option<HashMap<String, f32>>,
}

/// Detects which loaded language the user is currently typing in.
///
/// All state lives behind one lock, so the detector can be shared by the
/// commit path and the ranking path without external synchronization.
#[derive(Debug)]
pub struct LanguageDetector {
    window_size: usize,
    top_n: usize,
    state: RwLock<DetectorState>,
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetector {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_WINDOW_SIZE, DEFAULT_TOP_N)
    }

    pub fn with_limits(window_size: usize, top_n: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            top_n: top_n.max(1),
            state: RwLock::new(DetectorState::default()),
        }
    }

    /// The top-N cap this detector scores against. Word lists should be
    /// loaded with the same cap.
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Register (or replace) a language table. Replacing keeps the original
    /// load position, so tie-breaking stays stable across reloads.
    pub fn load_language(&self, unigrams: LanguageUnigrams) {
        if let Ok(mut state) = self.state.write() {
            tracing::debug!(language = %unigrams.code, words = unigrams.total_words, "loading unigram table");
            match state.languages.iter_mut().find(|l| l.code == unigrams.code) {
                Some(existing) => *existing = unigrams,
                None => state.languages.push(unigrams),
            }
            state.cached_scores = None;
        }
    }

    /// Drop a language table. Returns whether it was present.
    pub fn unload_language(&self, code: &str) -> bool {
        if let Ok(mut state) = self.state.write() {
            let before = state.languages.len();
            state.languages.retain(|l| l.code != code);
            let removed = state.languages.len() != before;
            if removed {
                state.cached_scores = None;
            }
            removed
        } else {
            false
        }
    }

    /// Language codes in load order.
    pub fn loaded_languages(&self) -> Vec<String> {
        match self.state.read() {
            Ok(state) => state.languages.iter().map(|l| l.code.clone()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Feed one committed word into the window.
    ///
    /// The word is normalized first and dropped if it is shorter than two
    /// characters or contains anything but letters.
    pub fn record_word(&self, word: &str) {
        let normalized = normalizer::normalize(word);
        if normalized.chars().count() < 2 || !normalized.chars().all(|c| c.is_alphabetic()) {
            return;
        }
        if let Ok(mut state) = self.state.write() {
            state.window.push_back(normalized);
            while state.window.len() > self.window_size {
                state.window.pop_front();
            }
            state.cached_scores = None;
        }
    }

    /// Forget the window, e.g. when the user switches input fields.
    pub fn clear_history(&self) {
        if let Ok(mut state) = self.state.write() {
            state.window.clear();
            state.cached_scores = None;
        }
    }

    /// Number of words currently in the window.
    pub fn window_len(&self) -> usize {
        self.state.read().map(|s| s.window.len()).unwrap_or(0)
    }

    /// Per-language scores, normalized to sum to 1.
    ///
    /// A window word contributes `1 - rank/top_n` to every language that
    /// knows it. When nothing in the window matches any language (or the
    /// window is empty), scores fall back to a uniform distribution over the
    /// loaded languages; with no languages loaded the map is empty.
    pub fn language_scores(&self) -> HashMap<String, f32> {
        if let Ok(state) = self.state.read() {
            if let Some(cached) = &state.cached_scores {
                return cached.clone();
            }
        }
        if let Ok(mut state) = self.state.write() {
            if state.cached_scores.is_none() {
                let scores = Self::compute_scores(&state, self.top_n);
                state.cached_scores = Some(scores);
            }
            state.cached_scores.clone().unwrap_or_default()
        } else {
            HashMap::new()
        }
    }

    fn compute_scores(state: &DetectorState, top_n: usize) -> HashMap<String, f32> {
        if state.languages.is_empty() {
            return HashMap::new();
        }
        let mut sums: Vec<f32> = vec![0.0; state.languages.len()];
        for word in &state.window {
            for (i, language) in state.languages.iter().enumerate() {
                if let Some(rank) = language.rank(word) {
                    sums[i] += 1.0 - rank as f32 / top_n as f32;
                }
            }
        }
        let total: f32 = sums.iter().sum();
        let uniform = 1.0 / state.languages.len() as f32;
        state
            .languages
            .iter()
            .zip(sums)
            .map(|(language, sum)| {
                let score = if total > 0.0 { sum / total } else { uniform };
                (language.code.clone(), score)
            })
            .collect()
    }

    /// The highest-scoring loaded language.
    ///
    /// Equal scores resolve deterministically to the earliest loaded
    /// language.
    pub fn primary_language(&self) -> Option<String> {
        let scores = self.language_scores();
        let order = self.loaded_languages();
        let mut best: Option<(String, f32)> = None;
        for code in order {
            let score = scores.get(&code).copied().unwrap_or(0.0);
            match &best {
                Some((_, best_score)) if score <= *best_score => {}
                _ => best = Some((code, score)),
            }
        }
        best.map(|(code, _)| code)
    }

    /// Context score for one language, 0 when unknown.
    pub fn score_for(&self, code: &str) -> f32 {
        self.language_scores().get(code).copied().unwrap_or(0.0)
    }
}
