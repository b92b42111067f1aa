//! String similarity scoring
//!
//! The matcher needs several complementary signals: edit distance for
//! per-word typo tolerance, set similarities for order-insensitive
//! sentence/fragment comparison, and a weighted combination used by the
//! fuzzy fallback strategy.

use crate::normalize::words;
use std::collections::HashSet;

/// Classic dynamic-programming edit distance.
///
/// Single-row formulation: O(|a|·|b|) time, O(min(|a|,|b|)) space.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Iterate over the longer string, keep a row for the shorter one
    let (outer, inner) = if a_chars.len() >= b_chars.len() {
        (&a_chars, &b_chars)
    } else {
        (&b_chars, &a_chars)
    };

    let mut row: Vec<usize> = (0..=inner.len()).collect();

    for (i, oc) in outer.iter().enumerate() {
        let mut prev_diag = row[0];
        row[0] = i + 1;
        for (j, ic) in inner.iter().enumerate() {
            let cost = if oc == ic { 0 } else { 1 };
            let next = (prev_diag + cost).min(row[j] + 1).min(row[j + 1] + 1);
            prev_diag = row[j + 1];
            row[j + 1] = next;
        }
    }

    row[inner.len()]
}

/// Edit-distance similarity: `1 - distance / max_len`.
///
/// Two empty strings are identical (1.0); one empty string matches
/// nothing (0.0). Symmetric.
pub fn string_similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    1.0 - levenshtein_distance(a, b) as f32 / max_len as f32
}

/// Jaccard similarity over deduplicated word sets.
pub fn jaccard_similarity(words_a: &[String], words_b: &[String]) -> f32 {
    let set_a: HashSet<&str> = words_a.iter().map(|s| s.as_str()).collect();
    let set_b: HashSet<&str> = words_b.iter().map(|s| s.as_str()).collect();

    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f32 / union as f32
}

/// Containment-flavored overlap: `|intersection| / min(|A|, |B|)`.
///
/// Asymmetric on purpose: a short fragment fully contained in a long
/// sentence scores 1.0 even though Jaccard would penalize it.
pub fn word_overlap_ratio(words_a: &[String], words_b: &[String]) -> f32 {
    let set_a: HashSet<&str> = words_a.iter().map(|s| s.as_str()).collect();
    let set_b: HashSet<&str> = words_b.iter().map(|s| s.as_str()).collect();

    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    intersection as f32 / set_a.len().min(set_b.len()) as f32
}

/// Per-word token similarity of `text_a` against `text_b`.
///
/// Each word of A contributes 1.0 for an exact match in B, 0.7 for a
/// 3-character prefix or suffix shared with some word of B of length
/// >= 4, else 0. Sum divided by the word count of A.
pub fn token_similarity(text_a: &str, text_b: &str) -> f32 {
    let words_a = words(text_a);
    let words_b = words(text_b);

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let set_b: HashSet<&str> = words_b.iter().map(|s| s.as_str()).collect();

    let mut score = 0.0f32;
    for wa in &words_a {
        if set_b.contains(wa.as_str()) {
            score += 1.0;
            continue;
        }
        if wa.len() >= 4 {
            let prefix: String = wa.chars().take(3).collect();
            let suffix: String = wa
                .chars()
                .rev()
                .take(3)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            let partial = words_b
                .iter()
                .any(|wb| wb.len() >= 4 && (wb.starts_with(&prefix) || wb.ends_with(&suffix)));
            if partial {
                score += 0.7;
            }
        }
    }

    score / words_a.len() as f32
}

/// Breakdown of a weighted sentence-vs-fragment comparison.
#[derive(Debug, Clone)]
pub struct CombinedScore {
    /// Weighted total in [0, 1]
    pub combined: f32,
    pub jaccard: f32,
    pub overlap: f32,
    pub token: f32,
    /// (sentence word count, fragment word count)
    pub word_counts: (usize, usize),
}

/// Weighted similarity between a target sentence and fragment text.
///
/// `combined = 0.5·token + 0.3·overlap + 0.2·jaccard`. Token-level
/// matching is the most reliable signal over noisy PDF extraction;
/// Jaccard is the weakest, fully order-insensitive one. The weights are
/// empirical defaults that downstream thresholds were tuned against, so
/// they are fixed here rather than configurable.
pub fn combined_similarity(sentence_text: &str, fragment_text: &str) -> CombinedScore {
    let sentence_words = words(sentence_text);
    let fragment_words = words(fragment_text);

    let jaccard = jaccard_similarity(&sentence_words, &fragment_words);
    let overlap = word_overlap_ratio(&sentence_words, &fragment_words);
    let token = token_similarity(sentence_text, fragment_text);

    CombinedScore {
        combined: 0.5 * token + 0.3 * overlap + 0.2 * jaccard,
        jaccard,
        overlap,
        token,
        word_counts: (sentence_words.len(), fragment_words.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_known_values() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn test_string_similarity_identity_and_symmetry() {
        assert_eq!(string_similarity("hello", "hello"), 1.0);
        assert_eq!(string_similarity("", ""), 1.0);
        assert_eq!(string_similarity("", "abc"), 0.0);
        let ab = string_similarity("quick", "qwick");
        let ba = string_similarity("qwick", "quick");
        assert_eq!(ab, ba);
        // distance 1 over length 5
        assert!((ab - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_jaccard() {
        let a = vec!["the".to_string(), "quick".to_string(), "fox".to_string()];
        let b = vec!["the".to_string(), "slow".to_string(), "fox".to_string()];
        // intersection {the, fox} = 2, union = 4
        assert!((jaccard_similarity(&a, &b) - 0.5).abs() < 1e-6);
        assert_eq!(jaccard_similarity(&a, &[]), 0.0);
    }

    #[test]
    fn test_word_overlap_rewards_containment() {
        let small = vec!["quick".to_string(), "fox".to_string()];
        let big = vec![
            "the".to_string(),
            "quick".to_string(),
            "brown".to_string(),
            "fox".to_string(),
        ];
        assert!((word_overlap_ratio(&small, &big) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_token_similarity_partial_credit() {
        // "jumping" vs "jumped": shares the "jum" prefix, both len >= 4
        let score = token_similarity("jumping", "jumped");
        assert!((score - 0.7).abs() < 1e-6);

        // exact match dominates
        assert!((token_similarity("fox", "fox") - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_combined_similarity_bounded() {
        let cases = [
            ("the quick brown fox", "the quick brown fox"),
            ("the quick brown fox", "completely different words"),
            ("a", "b"),
            ("x y z w", "x"),
        ];
        for (a, b) in cases {
            let score = combined_similarity(a, b);
            assert!(score.combined >= 0.0 && score.combined <= 1.0, "{a} / {b}");
        }
    }

    #[test]
    fn test_combined_similarity_identical_text() {
        let score = combined_similarity("the quick brown fox", "the quick brown fox");
        assert!(score.combined > 0.99);
        assert_eq!(score.word_counts, (4, 4));
    }
}
