//! Build per-language dictionary assets from a word frequency list.
//!
//! Input: a text file with one `word<TAB>weight` pair per line (weight
//! optional, higher means more frequent). Output, written to the target
//! directory:
//! - `<lang>.dict`     bincode `Vec<CanonicalEntry>` for the prefix index
//! - `<lang>.vocab`    plain word list for the vocabulary trie
//! - `<lang>.unigrams` most-frequent-first list for the language detector
//!
//! Frequency ranks are percentile-scaled into 0..=255 so dictionaries of any
//! size use the full rank range.

use anyhow::{bail, Context, Result};
use glide_core::CanonicalEntry;
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

fn parse_line(line: &str) -> Option<(String, u64)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let mut parts = line.split('\t');
    let word = parts.next()?.trim();
    if word.is_empty() {
        return None;
    }
    let weight = parts
        .next()
        .and_then(|w| w.trim().parse::<u64>().ok())
        .unwrap_or(0);
    Some((word.to_string(), weight))
}

fn percentile_rank(position: usize, total: usize) -> u8 {
    if total <= 1 {
        return 0;
    }
    ((position * 255) / (total - 1)) as u8
}

fn build<P: AsRef<Path>>(input: P, out_dir: P, language: &str) -> Result<()> {
    let input = input.as_ref();
    let out_dir = out_dir.as_ref();

    let file = File::open(input).with_context(|| format!("open {}", input.display()))?;
    let mut words: Vec<(String, u64)> = BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("read {}", input.display()))?
        .iter()
        .filter_map(|line| parse_line(line))
        .collect();
    if words.is_empty() {
        bail!("no usable entries in {}", input.display());
    }

    // most frequent first; ties stay in file order
    words.sort_by(|a, b| b.1.cmp(&a.1));

    create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;

    let total = words.len();
    let entries: Vec<CanonicalEntry> = words
        .iter()
        .enumerate()
        .map(|(position, (word, _))| CanonicalEntry {
            canonical: word.clone(),
            frequency_rank: percentile_rank(position, total),
        })
        .collect();
    let dict_path = out_dir.join(format!("{language}.dict"));
    let writer = BufWriter::new(
        File::create(&dict_path).with_context(|| format!("create {}", dict_path.display()))?,
    );
    bincode::serialize_into(writer, &entries).context("serialize dictionary")?;

    let vocab_path = out_dir.join(format!("{language}.vocab"));
    let mut vocab = BufWriter::new(
        File::create(&vocab_path).with_context(|| format!("create {}", vocab_path.display()))?,
    );
    for (word, _) in &words {
        writeln!(vocab, "{word}")?;
    }

    let unigrams_path = out_dir.join(format!("{language}.unigrams"));
    let mut unigrams = BufWriter::new(
        File::create(&unigrams_path)
            .with_context(|| format!("create {}", unigrams_path.display()))?,
    );
    for (word, _) in &words {
        writeln!(unigrams, "{}", glide_core::normalizer::normalize(word))?;
    }

    println!(
        "wrote {} entries for '{}' to {}",
        total,
        language,
        out_dir.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("usage: build_dict <wordlist.tsv> <out_dir> <language>");
        std::process::exit(2);
    }
    build(&args[1], &args[2], &args[3])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_weighted_and_bare_lines() {
        assert_eq!(parse_line("café\t120"), Some(("café".to_string(), 120)));
        assert_eq!(parse_line("word"), Some(("word".to_string(), 0)));
        assert_eq!(parse_line("# comment"), None);
        assert_eq!(parse_line("   "), None);
    }

    #[test]
    fn percentile_ranks_span_full_range() {
        assert_eq!(percentile_rank(0, 1000), 0);
        assert_eq!(percentile_rank(999, 1000), 255);
        assert_eq!(percentile_rank(0, 1), 0);
        assert!(percentile_rank(500, 1000) > 100);
    }

    #[test]
    fn build_writes_all_three_assets() {
        let dir = std::env::temp_dir().join(format!("build_dict_test_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("fr.tsv");
        std::fs::write(&input, "café\t90\nmaison\t50\nété\t70\n").unwrap();

        build(&input, &dir.join("out"), "fr").unwrap();

        let dict = std::fs::read(dir.join("out/fr.dict")).unwrap();
        let entries: Vec<CanonicalEntry> = bincode::deserialize(&dict).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].canonical, "café");
        assert_eq!(entries[0].frequency_rank, 0);
        assert_eq!(entries[2].canonical, "maison");
        assert_eq!(entries[2].frequency_rank, 255);

        let unigrams = std::fs::read_to_string(dir.join("out/fr.unigrams")).unwrap();
        assert_eq!(unigrams.lines().next(), Some("cafe"));
    }
}
