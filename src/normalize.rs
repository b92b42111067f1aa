//! Text normalization for matching
//!
//! Backend text extraction and the browser's text layer rarely agree on
//! punctuation, casing, or whitespace. Everything that flows into the
//! similarity engine goes through `normalize` first so both sides compare
//! the same canonical form.

use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum token length kept by [`tokenize`] when using the default.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 2;

/// Normalize text for matching: lowercase, replace non-word/non-space
/// characters with a space, collapse whitespace runs, trim.
///
/// Idempotent: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
    static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

    let lowered = text.to_lowercase();
    let stripped = NON_WORD_RE.replace_all(&lowered, " ");
    let collapsed = WHITESPACE_RE.replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

/// Normalize and split into word tokens, dropping tokens shorter than
/// `min_len`.
pub fn tokenize(text: &str, min_len: usize) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|w| w.len() >= min_len)
        .map(|w| w.to_string())
        .collect()
}

/// Tokenize with the default minimum token length.
pub fn words(text: &str) -> Vec<String> {
    tokenize(text, DEFAULT_MIN_TOKEN_LEN)
}
