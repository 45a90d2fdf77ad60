//! N-gram keyword extraction.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

/// Longest phrase considered, in words.
pub const MAX_NGRAM: usize = 3;

/// Shorter keywords are noise.
const MIN_KEYWORD_CHARS: usize = 4;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
    "our", "out", "day", "get", "has", "him", "his", "how", "its", "may", "new", "now", "old",
    "see", "two", "way", "who", "boy", "did", "man", "men", "put", "say", "she", "too", "use",
    // Longer function words that would otherwise pass the length filter.
    "about", "also", "been", "from", "have", "here", "into", "just", "like", "more", "much",
    "only", "some", "than", "that", "their", "them", "then", "there", "they", "this", "very",
    "what", "when", "which", "will", "with", "would", "your",
];

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]+").expect("valid non-word regex"));

/// Lowercased word tokens with punctuation removed.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    NON_WORD
        .replace_all(&text.to_lowercase(), " ")
        .split_whitespace()
        .map(ToString::to_string)
        .collect()
}

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Per-text frequency of every 1..=[`MAX_NGRAM`]-word phrase that contains no
/// stopword and is longer than three characters.
#[must_use]
pub fn ngram_counts(text: &str) -> BTreeMap<String, usize> {
    let tokens = tokenize(text);
    let mut counts = BTreeMap::new();
    for n in 1..=MAX_NGRAM {
        for window in tokens.windows(n) {
            if window.iter().any(|w| is_stopword(w)) {
                continue;
            }
            let phrase = window.join(" ");
            if phrase.chars().count() < MIN_KEYWORD_CHARS {
                continue;
            }
            *counts.entry(phrase).or_insert(0) += 1;
        }
    }
    counts
}

/// Keywords of one record: phrases occurring at least `min_frequency` times.
#[must_use]
pub fn record_keywords(text: &str, min_frequency: usize) -> BTreeSet<String> {
    ngram_counts(text)
        .into_iter()
        .filter(|(_, count)| *count >= min_frequency)
        .map(|(phrase, _)| phrase)
        .collect()
}

/// Whether `phrase` occurs in `text` on word boundaries.
#[must_use]
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    let haystack = format!(" {} ", tokenize(text).join(" "));
    let needle = format!(" {} ", tokenize(phrase).join(" "));
    if needle.trim().is_empty() {
        return false;
    }
    haystack.contains(&needle)
}
