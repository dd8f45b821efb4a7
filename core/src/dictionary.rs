//! Multi-language dictionary cache and loading.
//!
//! The manager owns every loaded per-language structure: the legacy
//! vocabulary tries and the accent-aware normalized indices ("v2"). Loading
//! goes through a [`DictionaryLoader`] collaborator so the binary asset
//! format stays swappable; [`FileDictionaryLoader`] is the on-disk
//! implementation.
//!
//! Load failures never escape this module as errors: they are logged and
//! reported as `false`/`None`, and the cache is left untouched. A single
//! mutation lock serializes loads and evictions, while cached entries are
//! read through a separate `RwLock` map so lookups of already-loaded
//! languages never wait on a load in flight.

use crate::detector::LanguageUnigrams;
use crate::prefix_index::{CanonicalEntry, NormalizedIndex};
use crate::trie::VocabTrie;
use ahash::AHashMap;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

/// Fixed memory estimate per dictionary entry; accounting is approximate by
/// design, not a measurement.
pub const APPROX_BYTES_PER_ENTRY: usize = 64;

/// Source of per-language dictionary data.
///
/// Implementations report failure through `Result`; the manager converts
/// that into its boolean/absence surface.
pub trait DictionaryLoader: Send + Sync {
    /// Load the accent-aware index for a language.
    fn load_index(&self, language: &str) -> Result<NormalizedIndex>;

    /// Load the legacy vocabulary trie for a language.
    fn load_vocabulary(&self, language: &str) -> Result<VocabTrie>;

    /// Load the unigram table feeding the language detector.
    fn load_unigrams(&self, language: &str, top_n: usize) -> Result<LanguageUnigrams>;

    /// Probe whether the index asset exists, without loading it.
    fn index_exists(&self, language: &str) -> bool;
}

/// Loads dictionary assets from a directory:
/// `<lang>.dict` (bincode `Vec<CanonicalEntry>`), `<lang>.vocab` and
/// `<lang>.unigrams` (plain text, one word per line).
#[derive(Debug, Clone)]
pub struct FileDictionaryLoader {
    dir: PathBuf,
}

impl FileDictionaryLoader {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn index_path(&self, language: &str) -> PathBuf {
        self.dir.join(format!("{language}.dict"))
    }

    fn vocab_path(&self, language: &str) -> PathBuf {
        self.dir.join(format!("{language}.vocab"))
    }

    fn unigrams_path(&self, language: &str) -> PathBuf {
        self.dir.join(format!("{language}.unigrams"))
    }
}

impl DictionaryLoader for FileDictionaryLoader {
    fn load_index(&self, language: &str) -> Result<NormalizedIndex> {
        let path = self.index_path(language);
        let mut file =
            File::open(&path).with_context(|| format!("open {}", path.display()))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        let entries: Vec<CanonicalEntry> =
            bincode::deserialize(&buf).with_context(|| format!("decode {}", path.display()))?;
        let words: Vec<(String, u8)> = entries
            .into_iter()
            .map(|e| (e.canonical, e.frequency_rank))
            .collect();
        Ok(NormalizedIndex::build_from_list(&words))
    }

    fn load_vocabulary(&self, language: &str) -> Result<VocabTrie> {
        let path = self.vocab_path(language);
        let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        let mut trie = VocabTrie::new();
        for line in BufReader::new(file).lines() {
            let word = line.with_context(|| format!("read {}", path.display()))?;
            let word = word.trim();
            if !word.is_empty() {
                trie.insert(word);
            }
        }
        Ok(trie)
    }

    fn load_unigrams(&self, language: &str, top_n: usize) -> Result<LanguageUnigrams> {
        let path = self.unigrams_path(language);
        let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        LanguageUnigrams::from_reader(language, BufReader::new(file), top_n)
            .with_context(|| format!("read {}", path.display()))
    }

    fn index_exists(&self, language: &str) -> bool {
        self.index_path(language).is_file()
    }
}

/// A cached normalized index with its load metadata.
#[derive(Debug)]
pub struct LoadedIndex {
    pub index: NormalizedIndex,
    pub loaded_at: Instant,
    pub approx_bytes: usize,
}

/// A cached legacy vocabulary trie with its load metadata.
#[derive(Debug)]
pub struct LoadedVocabulary {
    pub trie: VocabTrie,
    pub loaded_at: Instant,
    pub approx_bytes: usize,
}

/// Concurrent-safe registry of per-language dictionaries.
pub struct DictionaryManager<L: DictionaryLoader> {
    loader: L,
    fallback_language: String,
    indices: RwLock<AHashMap<String, Arc<LoadedIndex>>>,
    vocabularies: RwLock<AHashMap<String, Arc<LoadedVocabulary>>>,
    /// Serializes all cache mutations (loads, evictions, word edits).
    mutate_lock: Mutex<()>,
}

impl<L: DictionaryLoader> DictionaryManager<L> {
    pub fn new(loader: L, fallback_language: &str) -> Self {
        Self {
            loader,
            fallback_language: fallback_language.to_string(),
            indices: RwLock::new(AHashMap::new()),
            vocabularies: RwLock::new(AHashMap::new()),
            mutate_lock: Mutex::new(()),
        }
    }

    pub fn fallback_language(&self) -> &str {
        &self.fallback_language
    }

    fn lock_mutations(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.mutate_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Load a language's normalized index, if not already cached.
    ///
    /// Idempotent: a cache hit short-circuits, and concurrent calls for the
    /// same language perform the load once. Returns whether the index is
    /// available afterwards.
    pub fn load_index(&self, language: &str) -> bool {
        if self.index(language).is_some() {
            tracing::debug!(%language, "index already cached");
            return true;
        }
        let _guard = self.lock_mutations();
        if self.index(language).is_some() {
            return true;
        }
        match self.loader.load_index(language) {
            Ok(index) => {
                let entry = Arc::new(LoadedIndex {
                    approx_bytes: index.word_count() * APPROX_BYTES_PER_ENTRY,
                    loaded_at: Instant::now(),
                    index,
                });
                tracing::debug!(%language, words = entry.index.word_count(), "loaded index");
                if let Ok(mut map) = self.indices.write() {
                    map.insert(language.to_string(), entry);
                    true
                } else {
                    false
                }
            }
            Err(error) => {
                tracing::warn!(%language, %error, "failed to load dictionary index");
                false
            }
        }
    }

    /// Load a language's legacy vocabulary trie, if not already cached.
    pub fn load_vocabulary(&self, language: &str) -> bool {
        if self.vocabulary(language).is_some() {
            tracing::debug!(%language, "vocabulary already cached");
            return true;
        }
        let _guard = self.lock_mutations();
        if self.vocabulary(language).is_some() {
            return true;
        }
        match self.loader.load_vocabulary(language) {
            Ok(trie) => {
                let entry = Arc::new(LoadedVocabulary {
                    approx_bytes: trie.word_count() * APPROX_BYTES_PER_ENTRY,
                    loaded_at: Instant::now(),
                    trie,
                });
                tracing::debug!(%language, words = entry.trie.word_count(), "loaded vocabulary");
                if let Ok(mut map) = self.vocabularies.write() {
                    map.insert(language.to_string(), entry);
                    true
                } else {
                    false
                }
            }
            Err(error) => {
                tracing::warn!(%language, %error, "failed to load vocabulary");
                false
            }
        }
    }

    /// The cached index for a language, without triggering a load.
    pub fn index(&self, language: &str) -> Option<Arc<LoadedIndex>> {
        self.indices
            .read()
            .ok()
            .and_then(|map| map.get(language).cloned())
    }

    /// The cached vocabulary for a language, without triggering a load.
    pub fn vocabulary(&self, language: &str) -> Option<Arc<LoadedVocabulary>> {
        self.vocabularies
            .read()
            .ok()
            .and_then(|map| map.get(language).cloned())
    }

    /// The index for a language, loading it on demand and falling back to
    /// the configured fallback language.
    ///
    /// Errors only when neither the requested nor the fallback language can
    /// be served.
    pub fn index_or_default(&self, language: &str) -> Result<Arc<LoadedIndex>> {
        if self.load_index(language) {
            if let Some(entry) = self.index(language) {
                return Ok(entry);
            }
        }
        if language != self.fallback_language {
            tracing::warn!(%language, fallback = %self.fallback_language, "falling back to default dictionary");
            if self.load_index(&self.fallback_language) {
                if let Some(entry) = self.index(&self.fallback_language) {
                    return Ok(entry);
                }
            }
        }
        anyhow::bail!(
            "no dictionary available for '{language}' or fallback '{}'",
            self.fallback_language
        )
    }

    /// Vocabulary counterpart of [`index_or_default`](Self::index_or_default).
    pub fn vocabulary_or_default(&self, language: &str) -> Result<Arc<LoadedVocabulary>> {
        if self.load_vocabulary(language) {
            if let Some(entry) = self.vocabulary(language) {
                return Ok(entry);
            }
        }
        if language != self.fallback_language {
            tracing::warn!(%language, fallback = %self.fallback_language, "falling back to default vocabulary");
            if self.load_vocabulary(&self.fallback_language) {
                if let Some(entry) = self.vocabulary(&self.fallback_language) {
                    return Ok(entry);
                }
            }
        }
        anyhow::bail!(
            "no vocabulary available for '{language}' or fallback '{}'",
            self.fallback_language
        )
    }

    /// Load a unigram table through the loader, reporting failure as `None`.
    pub fn load_unigrams(&self, language: &str, top_n: usize) -> Option<LanguageUnigrams> {
        match self.loader.load_unigrams(language, top_n) {
            Ok(table) => Some(table),
            Err(error) => {
                tracing::warn!(%language, %error, "failed to load unigram table");
                None
            }
        }
    }

    /// Probe whether a v2 index asset exists for a language, without
    /// loading it.
    pub fn has_v2_dictionary(&self, language: &str) -> bool {
        self.loader.index_exists(language)
    }

    /// Evict one language from both cache layers. Returns whether anything
    /// was evicted.
    pub fn unload(&self, language: &str) -> bool {
        let _guard = self.lock_mutations();
        let mut removed = false;
        if let Ok(mut map) = self.indices.write() {
            removed |= map.remove(language).is_some();
        }
        if let Ok(mut map) = self.vocabularies.write() {
            removed |= map.remove(language).is_some();
        }
        if removed {
            tracing::debug!(%language, "unloaded dictionary");
        }
        removed
    }

    /// Evict everything except `keep` and the fallback language, which must
    /// stay servable. Returns the number of languages evicted.
    pub fn unload_unused(&self, keep: &str) -> usize {
        let _guard = self.lock_mutations();
        let mut evicted = 0;
        if let Ok(mut map) = self.indices.write() {
            let before = map.len();
            map.retain(|code, _| code == keep || *code == self.fallback_language);
            evicted += before - map.len();
        }
        if let Ok(mut map) = self.vocabularies.write() {
            let before = map.len();
            map.retain(|code, _| code == keep || *code == self.fallback_language);
            evicted += before - map.len();
        }
        if evicted > 0 {
            tracing::debug!(%keep, evicted, "evicted unused dictionaries");
        }
        evicted
    }

    /// Add a word to a cached index via copy-on-write: the updated index is
    /// swapped in whole, so concurrent readers keep a consistent snapshot.
    /// Returns `false` when the language is not cached.
    pub fn add_word(&self, language: &str, canonical: &str, frequency_rank: u8) -> bool {
        let _guard = self.lock_mutations();
        let Some(current) = self.index(language) else {
            return false;
        };
        let mut index = current.index.clone();
        index.add_word(canonical, frequency_rank);
        self.swap_index(language, index);
        true
    }

    /// Remove a word from a cached index via copy-on-write. Returns whether
    /// the word was present.
    pub fn remove_word(&self, language: &str, canonical: &str) -> bool {
        let _guard = self.lock_mutations();
        let Some(current) = self.index(language) else {
            return false;
        };
        let mut index = current.index.clone();
        if !index.remove_word(canonical) {
            return false;
        }
        self.swap_index(language, index);
        true
    }

    fn swap_index(&self, language: &str, index: NormalizedIndex) {
        let entry = Arc::new(LoadedIndex {
            approx_bytes: index.word_count() * APPROX_BYTES_PER_ENTRY,
            loaded_at: Instant::now(),
            index,
        });
        if let Ok(mut map) = self.indices.write() {
            map.insert(language.to_string(), entry);
        }
    }

    /// Estimated memory held by all cached entries.
    pub fn approx_memory_bytes(&self) -> usize {
        let indices = self
            .indices
            .read()
            .map(|map| map.values().map(|e| e.approx_bytes).sum::<usize>())
            .unwrap_or(0);
        let vocabularies = self
            .vocabularies
            .read()
            .map(|map| map.values().map(|e| e.approx_bytes).sum::<usize>())
            .unwrap_or(0);
        indices + vocabularies
    }

    /// Language codes with a cached index, sorted.
    pub fn loaded_languages(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .indices
            .read()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        codes.sort();
        codes
    }
}

impl<L: DictionaryLoader + 'static> DictionaryManager<L> {
    /// Kick off a background load of a language's index without blocking
    /// the caller.
    pub fn preload(self: &Arc<Self>, language: &str) {
        let manager = Arc::clone(self);
        let language = language.to_string();
        std::thread::spawn(move || {
            manager.load_index(&language);
        });
    }
}
