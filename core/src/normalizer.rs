//! Accent folding for dictionary keys and model output.
//!
//! The trajectory model emits sequences over a plain a-z alphabet, while
//! dictionaries store real, possibly-accented spellings. This module folds
//! any word down to that shared 26-symbol form so the two sides can meet:
//! lowercase, a fixed substitution table for symbols with no canonical
//! decomposition (ß, ø, æ, ...), then NFD decomposition with combining
//! diacritical marks stripped.
//!
//! `normalize` is total, deterministic, and idempotent: running it twice
//! always yields the same string as running it once.

use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

/// Fold a single character into the normalized alphabet, appending to `out`.
///
/// Handles letters whose accent cannot be removed by canonical decomposition:
/// the German sharp-s, Nordic ø, Icelandic eth/thorn, the æ/œ ligatures,
/// Polish ł and the Turkish dotless ı.
fn fold_char(ch: char, out: &mut String) {
    match ch {
        'ß' => out.push_str("ss"),
        'ø' => out.push('o'),
        'ð' | 'đ' => out.push('d'),
        'þ' => out.push_str("th"),
        'æ' => out.push_str("ae"),
        'œ' => out.push_str("oe"),
        'ł' => out.push('l'),
        'ı' => out.push('i'),
        _ => out.push(ch),
    }
}

/// True for the combining diacritical marks block (U+0300..=U+036F).
fn is_combining_mark(ch: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&ch)
}

/// Normalize a word to its accent-free lowercase form.
///
/// # Example
/// ```
/// use glide_core::normalizer::normalize;
///
/// assert_eq!(normalize("Café"), "cafe");
/// assert_eq!(normalize("Straße"), "strasse");
/// assert_eq!(normalize("Ærø"), "aero");
/// ```
pub fn normalize(word: &str) -> String {
    let lowered = word.to_lowercase();
    let mut folded = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        fold_char(ch, &mut folded);
    }
    folded.nfd().filter(|ch| !is_combining_mark(*ch)).collect()
}

/// Whether a word differs from its normalized form (accents or casing).
pub fn has_accents(word: &str) -> bool {
    word != normalize(word)
}

/// Normalize, then re-apply the original capitalization pattern.
///
/// All-caps input stays all-caps, capitalized input stays capitalized,
/// anything else is returned fully lowercase. This keeps a user's case
/// choice intact across the normalization round-trip.
///
/// # Example
/// ```
/// use glide_core::normalizer::normalize_preserving_case;
///
/// assert_eq!(normalize_preserving_case("CAFÉ"), "CAFE");
/// assert_eq!(normalize_preserving_case("Café"), "Cafe");
/// assert_eq!(normalize_preserving_case("café"), "cafe");
/// ```
pub fn normalize_preserving_case(word: &str) -> String {
    let normalized = normalize(word);
    let has_letters = word.chars().any(|c| c.is_alphabetic());
    if has_letters && !word.chars().any(|c| c.is_lowercase()) {
        return normalized.to_uppercase();
    }
    if word.chars().next().is_some_and(|c| c.is_uppercase()) {
        let mut chars = normalized.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => normalized,
        };
    }
    normalized
}

/// Group a weighted word list by normalized key.
///
/// Each bucket is sorted by descending weight, so the first element is the
/// most common accented spelling for that key. Display code uses this to pick
/// the accented form to show when the model produced a bare-alphabet word.
pub fn build_accent_map(words: &[(String, u64)]) -> HashMap<String, Vec<String>> {
    let mut weighted: HashMap<String, Vec<(String, u64)>> = HashMap::new();
    for (word, weight) in words {
        let key = normalize(word);
        if key.is_empty() {
            continue;
        }
        weighted.entry(key).or_default().push((word.clone(), *weight));
    }
    weighted
        .into_iter()
        .map(|(key, mut bucket)| {
            bucket.sort_by(|a, b| b.1.cmp(&a.1));
            (key, bucket.into_iter().map(|(word, _)| word).collect())
        })
        .collect()
}
