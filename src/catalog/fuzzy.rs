//! Text normalization and approximate matching helpers
//!
//! Scoring is deliberately simple and fully deterministic: the same input
//! always produces the same score. Titles are compared with a blend of
//! normalized edit distance and word overlap so that short queries like
//! "gun temperature" still reach full-title entries.

use std::collections::HashSet;
use strsim::normalized_levenshtein;

/// Weight of the edit-distance component in the title score
const EDIT_WEIGHT: f64 = 0.6;
/// Weight of the word-overlap component
const OVERLAP_WEIGHT: f64 = 0.4;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "it", "this", "that", "i", "my", "im", "its", "are", "was",
];

/// Lowercase, strip punctuation to spaces, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            // Lowercasing can expand to combining marks (e.g. dotted capital
            // I); keep only the alphanumeric parts so normalize(normalize(x))
            // equals normalize(x).
            out.extend(c.to_lowercase().filter(|lc| lc.is_alphanumeric()));
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Meaningful words from normalized text: stopwords and short tokens removed.
pub fn extract_keywords(normalized: &str) -> Vec<String> {
    normalized
        .split(' ')
        .filter(|w| w.len() > 2 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Similarity in [0, 1] between a normalized query and an entry title.
pub fn title_score(query: &str, title: &str) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let title = normalize(title);
    let edit = normalized_levenshtein(query, &title);

    let query_words: HashSet<&str> = query.split(' ').collect();
    let title_words: HashSet<&str> = title.split(' ').collect();
    let overlap = if query_words.is_empty() {
        0.0
    } else {
        let shared = query_words.intersection(&title_words).count();
        shared as f64 / query_words.len() as f64
    };

    edit * EDIT_WEIGHT + overlap * OVERLAP_WEIGHT
}
