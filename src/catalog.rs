//! Diagnostic error-code catalog
//!
//! Loads the EV-charging error knowledge base once at startup and answers
//! lookups over free-form user text. Detection tries an exact/normalized
//! code probe first, then approximate title matching, then keyword search
//! over descriptions. A miss is an expected outcome, not an error.

mod fuzzy;
mod pattern;

#[cfg(test)]
mod proptests;

pub use pattern::CodeToken;

use fuzzy::{extract_keywords, normalize, title_score};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Minimum combined similarity for an approximate title match
const TITLE_MATCH_THRESHOLD: f64 = 0.6;

/// Minimum distinct keyword hits for a description match
const KEYWORD_MATCH_MIN: usize = 2;

/// Context words that let a bare numeric token count as an error code
const BARE_CODE_CONTEXT: &[&str] = &["error", "code", "fault", "issue", "problem", "showing"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read error-code file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in error-code file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate error code in knowledge base: {0}")]
    DuplicateCode(String),
    #[error("error code '{0}' is not of the form ER<digits>")]
    MalformedCode(String),
}

/// One knowledge-base record. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorEntry {
    pub code: String,
    pub title: String,
    pub description: String,
    pub solutions: Vec<String>,
}

/// Read-only error-code index, built once at startup and shared across
/// request handlers without locking.
#[derive(Debug)]
pub struct ErrorCatalog {
    /// Keyed by canonical code. BTreeMap iteration is ordered by code, so
    /// "lowest code wins" tie-breaking falls out of plain iteration.
    entries: BTreeMap<String, ErrorEntry>,
    /// Zero-padding width of numeric suffixes, derived from the data.
    pad_width: usize,
    /// Require surrounding context words before accepting bare numeric codes.
    bare_code_needs_context: bool,
}

impl ErrorCatalog {
    /// Load the knowledge base from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P, bare_code_needs_context: bool) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        let records: Vec<ErrorEntry> = serde_json::from_str(&raw)?;
        Self::from_entries(records, bare_code_needs_context)
    }

    /// Build the index from already-parsed records. Duplicate or malformed
    /// codes are load-time defects and refuse the whole catalog.
    pub fn from_entries(
        records: Vec<ErrorEntry>,
        bare_code_needs_context: bool,
    ) -> Result<Self, CatalogError> {
        let mut entries = BTreeMap::new();
        let mut pad_width = 0;

        for mut record in records {
            let canonical = record.code.trim().to_uppercase();
            let digits = canonical
                .strip_prefix("ER")
                .filter(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()))
                .ok_or_else(|| CatalogError::MalformedCode(record.code.clone()))?;

            pad_width = pad_width.max(digits.len());
            record.code = canonical.clone();
            if entries.insert(canonical.clone(), record).is_some() {
                return Err(CatalogError::DuplicateCode(canonical));
            }
        }

        Ok(Self {
            entries,
            pad_width,
            bare_code_needs_context,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup by canonical code.
    pub fn get(&self, code: &str) -> Option<&ErrorEntry> {
        self.entries.get(&code.trim().to_uppercase())
    }

    /// Detect an error code in free-form user text.
    ///
    /// Pipeline, first hit wins:
    /// 1. code-shaped token (`ER001`, `error 15`, `E301`, bare `301`)
    /// 2. approximate title match
    /// 3. keyword search over titles and descriptions
    pub fn lookup(&self, message: &str) -> Option<&ErrorEntry> {
        if message.trim().is_empty() || self.entries.is_empty() {
            return None;
        }

        if let Some(token) = pattern::extract_code_token(message) {
            if let Some(entry) = self.probe_token(&token, message) {
                tracing::debug!(code = %entry.code, "matched error code token");
                return Some(entry);
            }
        }

        let query = normalize(message);

        if let Some(entry) = self.best_title_match(&query) {
            tracing::debug!(code = %entry.code, "matched error via title similarity");
            return Some(entry);
        }

        if let Some(entry) = self.best_keyword_match(&query) {
            tracing::debug!(code = %entry.code, "matched error via keyword search");
            return Some(entry);
        }

        None
    }

    /// Canonical form for a numeric suffix: `ER` + zero-padded digits.
    fn canonicalize(&self, value: u32) -> String {
        format!("ER{value:0width$}", width = self.pad_width)
    }

    fn probe_token(&self, token: &CodeToken, message: &str) -> Option<&ErrorEntry> {
        match token {
            CodeToken::Explicit(value) => self.entries.get(&self.canonicalize(*value)),
            // A bare number only counts when its suffix matches a known
            // entry exactly, and (configurably) the message carries context
            // suggesting an error report at all.
            CodeToken::Bare(value) => {
                let entry = self.entries.get(&self.canonicalize(*value))?;
                if self.bare_code_needs_context && !bare_code_in_context(message) {
                    return None;
                }
                Some(entry)
            }
        }
    }

    fn best_title_match(&self, query: &str) -> Option<&ErrorEntry> {
        let mut best: Option<(&ErrorEntry, f64)> = None;
        for entry in self.entries.values() {
            let score = title_score(query, &entry.title);
            if score < TITLE_MATCH_THRESHOLD {
                continue;
            }
            // Strictly-greater keeps the lowest code on equal scores.
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((entry, score));
            }
        }
        best.map(|(entry, _)| entry)
    }

    fn best_keyword_match(&self, query: &str) -> Option<&ErrorEntry> {
        let keywords = extract_keywords(query);
        if keywords.is_empty() {
            return None;
        }

        let mut best: Option<(&ErrorEntry, usize)> = None;
        for entry in self.entries.values() {
            let haystack = format!("{} {}", normalize(&entry.title), normalize(&entry.description));
            let hits = keywords.iter().filter(|k| haystack.contains(k.as_str())).count();
            if hits < KEYWORD_MATCH_MIN {
                continue;
            }
            if best.map_or(true, |(_, h)| hits > h) {
                best = Some((entry, hits));
            }
        }
        best.map(|(entry, _)| entry)
    }
}

/// A bare numeric token is only treated as a code when the message is
/// nothing but the number, or mentions something error-shaped around it.
fn bare_code_in_context(message: &str) -> bool {
    let trimmed = message.trim();
    if trimmed.len() <= 4 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    let lower = trimmed.to_lowercase();
    BARE_CODE_CONTEXT.iter().any(|word| lower.contains(word))
}
