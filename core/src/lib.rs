//! glide-core
//!
//! Swipe-to-text resolution and ranking shared by platform keyboard
//! frontends: feature extraction for the trajectory model, accent-aware
//! per-language dictionaries, statistical language detection, and
//! multi-source suggestion ranking.
//!
//! Public API:
//! - `SwipeEngine` - End-to-end swipe resolution pipeline
//! - `NormalizedIndex` - Accent-aware prefix dictionary
//! - `VocabTrie` - Prefix trie for beam pruning
//! - `LanguageDetector` - Sliding-window language scoring
//! - `DictionaryManager` - Cached multi-language dictionary registry
//! - `SuggestionRanker` - Confidence/frequency/context candidate fusion
//! - `Config` - Configuration and tuning knobs

use serde::{Deserialize, Serialize};

pub mod normalizer;

pub mod trie;
pub use trie::{TrieStats, VocabTrie};

pub mod prefix_index;
pub use prefix_index::{CanonicalEntry, LookupResult, NormalizedIndex};

pub mod detector;
pub use detector::{LanguageDetector, LanguageUnigrams};

pub mod dictionary;
pub use dictionary::{
    DictionaryLoader, DictionaryManager, FileDictionaryLoader, LoadedIndex, LoadedVocabulary,
};

pub mod ranker;
pub use ranker::{
    Candidate, CandidateSource, RankedSuggestion, RankerWeights, SuggestionRanker,
};

pub mod features;
pub use features::FeaturePoint;

pub mod engine;
pub use engine::{SwipeEngine, TrajectoryModel};

/// Tuning knobs for the resolution pipeline.
///
/// All fields are plain data so frontends can surface them in settings and
/// persist them as TOML.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Weight of the model confidence signal in candidate scores.
    pub nn_weight: f32,
    /// Weight of the corpus frequency signal.
    pub frequency_weight: f32,
    /// Weight of the language-context signal.
    pub context_weight: f32,

    /// Context discount for secondary-language candidates, clamped to
    /// [0.1, 1.0] at use.
    pub secondary_penalty: f32,

    /// Language served when a requested dictionary cannot be loaded.
    pub fallback_language: String,

    /// Committed words the language detector remembers.
    pub detector_window: usize,
    /// Unigram table size per language.
    pub detector_top_n: usize,

    /// Fixed input length of the trajectory model.
    pub model_sequence_length: usize,

    /// Default suggestion list length.
    pub max_suggestions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nn_weight: 0.6,
            frequency_weight: 0.3,
            context_weight: 0.1,
            secondary_penalty: 0.5,
            fallback_language: "en".to_string(),
            detector_window: detector::DEFAULT_WINDOW_SIZE,
            detector_top_n: detector::DEFAULT_TOP_N,
            model_sequence_length: 150,
            max_suggestions: 8,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// The ranker weight triple from this config.
    pub fn ranker_weights(&self) -> RankerWeights {
        RankerWeights {
            nn: self.nn_weight,
            frequency: self.frequency_weight,
            context: self.context_weight,
        }
    }
}
