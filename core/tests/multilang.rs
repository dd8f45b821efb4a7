//! Integration tests for multi-language dictionary management: on-disk
//! loading, fallback behavior, index merging, and memory bounding.

use glide_core::dictionary::APPROX_BYTES_PER_ENTRY;
use glide_core::{
    CanonicalEntry, DictionaryManager, FileDictionaryLoader, NormalizedIndex,
};
use std::fs;
use std::path::PathBuf;

fn asset_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("glide_multilang_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_dict(dir: &PathBuf, language: &str, words: &[(&str, u8)]) {
    let entries: Vec<CanonicalEntry> = words
        .iter()
        .map(|(word, rank)| CanonicalEntry {
            canonical: word.to_string(),
            frequency_rank: *rank,
        })
        .collect();
    fs::write(
        dir.join(format!("{language}.dict")),
        bincode::serialize(&entries).unwrap(),
    )
    .unwrap();
}

#[test]
fn loads_index_assets_from_disk() {
    let dir = asset_dir("load");
    write_dict(&dir, "fr", &[("café", 4), ("côte", 9), ("côté", 30)]);
    fs::write(dir.join("fr.vocab"), "café\ncôte\ncôté\n").unwrap();

    let manager = DictionaryManager::new(FileDictionaryLoader::new(&dir), "en");
    assert!(manager.has_v2_dictionary("fr"));
    assert!(!manager.has_v2_dictionary("en"));
    assert!(manager.load_index("fr"));
    assert!(manager.load_vocabulary("fr"));

    let index = manager.index("fr").unwrap();
    let hit = index.index.lookup("cote").unwrap();
    assert_eq!(hit.best_canonical, "côte");
    assert_eq!(hit.canonicals.len(), 2);

    let vocab = manager.vocabulary("fr").unwrap();
    assert!(vocab.trie.has_prefix("cô"));
    assert_eq!(vocab.trie.word_count(), 3);
}

#[test]
fn corrupt_asset_reports_failure_without_caching() {
    let dir = asset_dir("corrupt");
    fs::write(dir.join("fr.dict"), b"definitely not bincode").unwrap();

    let manager = DictionaryManager::new(FileDictionaryLoader::new(&dir), "en");
    assert!(manager.has_v2_dictionary("fr"));
    assert!(!manager.load_index("fr"));
    assert!(manager.index("fr").is_none());
}

#[test]
fn falls_back_to_default_language_on_disk() {
    let dir = asset_dir("fallback");
    write_dict(&dir, "en", &[("the", 0)]);

    let manager = DictionaryManager::new(FileDictionaryLoader::new(&dir), "en");
    let entry = manager.index_or_default("de").unwrap();
    assert!(entry.index.lookup("the").is_some());

    // nothing at all on disk is the only hard failure
    let empty = asset_dir("fallback_empty");
    let manager = DictionaryManager::new(FileDictionaryLoader::new(&empty), "en");
    assert!(manager.index_or_default("de").is_err());
}

#[test]
fn merged_secondary_dictionary_is_penalized() {
    let primary_words = vec![("son".to_string(), 0_u8), ("care".to_string(), 20_u8)];
    let secondary_words = vec![("søn".to_string(), 10_u8), ("kært".to_string(), 240_u8)];

    let mut primary = NormalizedIndex::build_from_list(&primary_words);
    let secondary = NormalizedIndex::build_from_list(&secondary_words);
    primary.merge(&secondary, 50);

    // every imported entry carries the +50 penalty, saturating at 255
    let ranks: std::collections::HashMap<&str, u8> = primary.iter_entries().collect();
    assert_eq!(ranks["søn"], 60);
    assert_eq!(ranks["kært"], 255);
    assert_eq!(ranks["son"], 0);

    // the shared normalized key still prefers the primary spelling
    let hit = primary.lookup("son").unwrap();
    assert_eq!(hit.best_canonical, "son");
    assert_eq!(primary.word_count(), 4);
}

#[test]
fn eviction_bounds_memory_estimate() {
    let dir = asset_dir("evict");
    write_dict(&dir, "en", &[("the", 0), ("and", 1)]);
    write_dict(&dir, "fr", &[("le", 0), ("la", 1), ("et", 2)]);
    write_dict(&dir, "de", &[("der", 0)]);

    let manager = DictionaryManager::new(FileDictionaryLoader::new(&dir), "en");
    manager.load_index("en");
    manager.load_index("fr");
    manager.load_index("de");
    assert_eq!(manager.approx_memory_bytes(), 6 * APPROX_BYTES_PER_ENTRY);

    assert_eq!(manager.unload_unused("fr"), 1); // "de" goes, fallback stays
    assert_eq!(manager.loaded_languages(), vec!["en", "fr"]);
    assert_eq!(manager.approx_memory_bytes(), 5 * APPROX_BYTES_PER_ENTRY);

    assert!(manager.unload("fr"));
    assert_eq!(manager.approx_memory_bytes(), 2 * APPROX_BYTES_PER_ENTRY);
}

#[test]
fn user_word_edits_are_visible_to_new_readers() {
    let dir = asset_dir("edits");
    write_dict(&dir, "en", &[("the", 0)]);

    let manager = DictionaryManager::new(FileDictionaryLoader::new(&dir), "en");
    manager.load_index("en");

    assert!(manager.add_word("en", "café", 3));
    let hit = manager.index("en").unwrap().index.lookup("cafe").unwrap();
    assert_eq!(hit.best_canonical, "café");

    assert!(manager.remove_word("en", "café"));
    assert!(manager.index("en").unwrap().index.lookup("cafe").is_none());
}
