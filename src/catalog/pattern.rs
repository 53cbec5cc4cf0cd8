//! Error-code token extraction
//!
//! Pulls code-shaped tokens out of user text. Supported spellings:
//! `ER001`, `er15`, `error 15`, `error code 001`, `E301`, and bare
//! 3-4 digit numbers. Bare numbers are the least trustworthy form; the
//! catalog decides whether to accept them at all.

use regex::Regex;
use std::sync::OnceLock;

/// A candidate error code extracted from a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeToken {
    /// Carried an `ER`/`E`/`error` prefix; high confidence.
    Explicit(u32),
    /// A naked 3-4 digit number; needs corroboration.
    Bare(u32),
}

fn er_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\ber(\d{1,4})\b").expect("valid regex"))
}

fn error_word_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\berror\s*(?:code)?\s*#?(\d{1,4})\b").expect("valid regex"))
}

fn e_prefix_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\be(\d{1,4})\b").expect("valid regex"))
}

fn bare_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{3,4})\b").expect("valid regex"))
}

/// Extract the first code-shaped token, most specific spelling first.
pub fn extract_code_token(message: &str) -> Option<CodeToken> {
    for re in [er_pattern(), error_word_pattern(), e_prefix_pattern()] {
        if let Some(value) = first_number(re, message) {
            return Some(CodeToken::Explicit(value));
        }
    }
    first_number(bare_pattern(), message).map(CodeToken::Bare)
}

fn first_number(re: &Regex, message: &str) -> Option<u32> {
    re.captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
