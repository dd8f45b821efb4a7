//! Accent-aware prefix index over a per-language dictionary.
//!
//! Every canonical (accented) spelling is stored under its normalized key, so
//! a bare-alphabet sequence from the trajectory model can resolve back to the
//! real dictionary form. Short prefixes (up to [`DEFAULT_PREFIX_DEPTH`]
//! characters) are indexed eagerly; longer probes reuse the deepest indexed
//! bucket and post-filter by full-string prefix match.
//!
//! Built once per dictionary load, then read-only; `add_word`/`remove_word`
//! exist for explicit user-dictionary edits and must not race with readers.

use crate::normalizer;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How many leading characters get their own prefix bucket.
///
/// A memory/speed tradeoff: deeper indexing costs memory for little pruning
/// gain, since buckets shrink fast after three characters.
pub const DEFAULT_PREFIX_DEPTH: usize = 3;

/// A canonical dictionary spelling with its frequency rank (0 = most common).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEntry {
    pub canonical: String,
    pub frequency_rank: u8,
}

/// All canonical forms sharing one normalized key, most common first.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupResult {
    pub normalized: String,
    /// Canonical spellings sorted by ascending frequency rank.
    pub canonicals: Vec<String>,
    pub best_canonical: String,
    pub best_frequency_rank: u8,
}

/// Normalized-key dictionary with a bounded-depth prefix index.
///
/// # Example
/// ```
/// use glide_core::prefix_index::NormalizedIndex;
///
/// let index = NormalizedIndex::build_from_list(&[("café".to_string(), 0)]);
/// let results = index.words_with_prefix("caf");
/// assert_eq!(results.len(), 1);
/// assert_eq!(results[0].normalized, "cafe");
/// assert_eq!(results[0].best_canonical, "café");
/// ```
#[derive(Debug, Clone)]
pub struct NormalizedIndex {
    /// normalized key -> canonical entries, sorted by ascending rank
    entries: AHashMap<String, Vec<CanonicalEntry>>,
    /// normalized prefix (1..=prefix_depth chars) -> normalized keys
    prefixes: AHashMap<String, HashSet<String>>,
    prefix_depth: usize,
    word_count: usize,
}

impl Default for NormalizedIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl NormalizedIndex {
    /// Create an empty index with the default prefix depth.
    pub fn new() -> Self {
        Self::with_prefix_depth(DEFAULT_PREFIX_DEPTH)
    }

    /// Create an empty index with a custom prefix depth (minimum 1).
    pub fn with_prefix_depth(prefix_depth: usize) -> Self {
        Self {
            entries: AHashMap::new(),
            prefixes: AHashMap::new(),
            prefix_depth: prefix_depth.max(1),
            word_count: 0,
        }
    }

    /// Bulk-load a `(canonical, rank)` list, sorting every bucket once at
    /// the end.
    pub fn build_from_list(words: &[(String, u8)]) -> Self {
        let mut index = Self::new();
        for (word, rank) in words {
            index.insert_entry(word, *rank, false);
        }
        for bucket in index.entries.values_mut() {
            Self::sort_bucket(bucket);
        }
        index
    }

    /// Add a single word, keeping its bucket sorted.
    ///
    /// Blank input is a no-op. Re-adding a canonical that is already present
    /// updates its rank in place.
    pub fn add_word(&mut self, canonical: &str, frequency_rank: u8) {
        self.insert_entry(canonical, frequency_rank, true);
    }

    fn insert_entry(&mut self, canonical: &str, rank: u8, sort: bool) {
        let canonical = canonical.trim();
        let normalized = normalizer::normalize(canonical);
        if normalized.is_empty() {
            return;
        }
        let mut added = false;
        {
            let bucket = self.entries.entry(normalized.clone()).or_default();
            if let Some(existing) = bucket.iter_mut().find(|e| e.canonical == canonical) {
                existing.frequency_rank = rank;
            } else {
                bucket.push(CanonicalEntry {
                    canonical: canonical.to_string(),
                    frequency_rank: rank,
                });
                added = true;
            }
            if sort {
                Self::sort_bucket(bucket);
            }
        }
        if added {
            self.word_count += 1;
        }
        self.register_prefixes(&normalized);
    }

    fn sort_bucket(bucket: &mut [CanonicalEntry]) {
        bucket.sort_by(|a, b| {
            a.frequency_rank
                .cmp(&b.frequency_rank)
                .then_with(|| a.canonical.cmp(&b.canonical))
        });
    }

    fn register_prefixes(&mut self, normalized: &str) {
        let chars: Vec<char> = normalized.chars().collect();
        for len in 1..=self.prefix_depth.min(chars.len()) {
            let prefix: String = chars[..len].iter().collect();
            self.prefixes
                .entry(prefix)
                .or_default()
                .insert(normalized.to_string());
        }
    }

    fn prune_prefixes(&mut self, normalized: &str) {
        let chars: Vec<char> = normalized.chars().collect();
        for len in 1..=self.prefix_depth.min(chars.len()) {
            let prefix: String = chars[..len].iter().collect();
            if let Some(keys) = self.prefixes.get_mut(&prefix) {
                keys.remove(normalized);
                if keys.is_empty() {
                    self.prefixes.remove(&prefix);
                }
            }
        }
    }

    /// Exact lookup by an already-normalized key.
    pub fn lookup(&self, normalized: &str) -> Option<LookupResult> {
        let bucket = self.entries.get(normalized)?;
        let best = bucket.first()?;
        Some(LookupResult {
            normalized: normalized.to_string(),
            canonicals: bucket.iter().map(|e| e.canonical.clone()).collect(),
            best_canonical: best.canonical.clone(),
            best_frequency_rank: best.frequency_rank,
        })
    }

    /// All entries whose normalized form starts with the normalized prefix,
    /// most common first.
    ///
    /// Probes longer than the indexed depth are truncated to the deepest
    /// bucket and post-filtered by `starts_with`.
    pub fn words_with_prefix(&self, prefix: &str) -> Vec<LookupResult> {
        let normalized = normalizer::normalize(prefix.trim());
        if normalized.is_empty() {
            return Vec::new();
        }
        let chars: Vec<char> = normalized.chars().collect();
        let probe: String = chars[..chars.len().min(self.prefix_depth)].iter().collect();
        let Some(keys) = self.prefixes.get(&probe) else {
            return Vec::new();
        };
        let mut results: Vec<LookupResult> = keys
            .iter()
            .filter(|key| key.starts_with(&normalized))
            .filter_map(|key| self.lookup(key))
            .collect();
        results.sort_by(|a, b| {
            a.best_frequency_rank
                .cmp(&b.best_frequency_rank)
                .then_with(|| a.normalized.cmp(&b.normalized))
        });
        results
    }

    /// Remove one canonical spelling. Returns whether anything was removed.
    ///
    /// When the last entry of a normalized key goes away, the key's prefix
    /// registrations are pruned with it.
    pub fn remove_word(&mut self, canonical: &str) -> bool {
        let canonical = canonical.trim();
        let normalized = normalizer::normalize(canonical);
        if normalized.is_empty() {
            return false;
        }
        let Some(bucket) = self.entries.get_mut(&normalized) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|e| e.canonical != canonical);
        let removed = before - bucket.len();
        if removed == 0 {
            return false;
        }
        self.word_count -= removed;
        if bucket.is_empty() {
            self.entries.remove(&normalized);
            self.prune_prefixes(&normalized);
        }
        true
    }

    /// Union another index into this one, penalizing every incoming rank.
    ///
    /// Used to fold a secondary language's dictionary in at reduced priority.
    /// Ranks saturate at 255; the total word count is recomputed as the sum
    /// of bucket sizes.
    pub fn merge(&mut self, other: &NormalizedIndex, frequency_penalty: u8) {
        for (normalized, bucket) in other.entries.iter() {
            let dest = self.entries.entry(normalized.clone()).or_default();
            for entry in bucket {
                let rank = entry.frequency_rank.saturating_add(frequency_penalty);
                match dest.iter_mut().find(|e| e.canonical == entry.canonical) {
                    // a spelling present in both dictionaries keeps its
                    // better rank
                    Some(existing) => {
                        existing.frequency_rank = existing.frequency_rank.min(rank);
                    }
                    None => dest.push(CanonicalEntry {
                        canonical: entry.canonical.clone(),
                        frequency_rank: rank,
                    }),
                }
            }
            Self::sort_bucket(dest);
            self.register_prefixes(normalized);
        }
        self.word_count = self.entries.values().map(|b| b.len()).sum();
    }

    /// Total number of canonical entries across all buckets.
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Number of distinct normalized keys.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn prefix_depth(&self) -> usize {
        self.prefix_depth
    }

    /// Iterate all `(canonical, rank)` pairs, in unspecified order.
    pub fn iter_entries(&self) -> impl Iterator<Item = (&str, u8)> + '_ {
        self.entries
            .values()
            .flatten()
            .map(|e| (e.canonical.as_str(), e.frequency_rank))
    }
}
