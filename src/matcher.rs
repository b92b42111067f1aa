//! Sequence matching: locating a target sentence inside the positioned
//! fragment list of a rendered page.
//!
//! Three strategies, tried in order of trust, stopping at the first one
//! that produces a result above the configured confidence floor:
//!
//! 1. **Direct substring**: the normalized sentence appears verbatim in
//!    the concatenated normalized fragment text. No fuzziness involved,
//!    so confidence is a flat 0.95.
//! 2. **Word sequence**: greedy in-order consumption of target words
//!    across fragments, with per-word edit-distance tolerance.
//!    Confidence is the mean matched-word similarity after skip
//!    penalties.
//! 3. **Fuzzy**: order-insensitive per-fragment scoring against the
//!    whole sentence; keeps the top fragments above a score floor.
//!    Confidence is the mean kept-fragment score.

use crate::fragment::TextFragment;
use crate::normalize::{normalize, tokenize};
use crate::similarity::{combined_similarity, string_similarity};
use log::debug;

/// Which strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    DirectSubstring,
    WordSequence,
    Fuzzy,
}

/// Result of matching one target sentence against a fragment list.
///
/// `fragment_indices` are positions into the fragment slice the matcher
/// was given, in ascending order.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub fragment_indices: Vec<usize>,
    /// Per-word (word sequence) or per-fragment (fuzzy) score
    /// contributions, for diagnostics
    pub word_scores: Vec<f32>,
    /// Aggregate confidence in [0, 1]
    pub confidence: f32,
    pub strategy: MatchStrategy,
}

impl MatchCandidate {
    fn span(&self) -> (usize, usize) {
        let first = self.fragment_indices.first().copied().unwrap_or(0);
        let last = self.fragment_indices.last().copied().unwrap_or(first);
        (first, last)
    }
}

/// Tunable thresholds for the matcher.
///
/// The defaults are empirically chosen values inherited from production
/// tuning, not derived constants; treat them as starting points.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Per-word edit-distance similarity needed to consume a target word
    /// (default: 0.8, i.e. one typo in a five-letter word)
    pub word_match_threshold: f32,
    /// Fraction of target words a word-sequence candidate must consume
    /// (default: 0.8, tolerating stray extraction noise)
    pub min_word_coverage: f32,
    /// Confidence deducted for each fragment that contributes no words
    /// (default: 0.1)
    pub skip_penalty: f32,
    /// Score floor for fragments kept by the fuzzy strategy (default: 0.3)
    pub fuzzy_score_threshold: f32,
    /// Maximum fragments the fuzzy strategy returns (default: 5)
    pub fuzzy_top_n: usize,
    /// Candidates overlapping a better one by more than this fraction of
    /// the shorter index span are dropped (default: 0.5)
    pub max_overlap_ratio: f32,
    /// Overall floor below which a strategy's result is rejected and the
    /// next strategy is tried (default: 0.3)
    pub min_confidence: f32,
    /// Tokens shorter than this are ignored (default: 2)
    pub min_token_len: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            word_match_threshold: 0.8,
            min_word_coverage: 0.8,
            skip_penalty: 0.1,
            fuzzy_score_threshold: 0.3,
            fuzzy_top_n: 5,
            max_overlap_ratio: 0.5,
            min_confidence: 0.3,
            min_token_len: 2,
        }
    }
}

/// Confidence assigned to direct substring hits.
const DIRECT_SUBSTRING_CONFIDENCE: f32 = 0.95;

/// Match a target sentence against a page's fragment list.
///
/// Returns deduplicated candidates sorted by confidence descending;
/// empty when every strategy comes up short (a common, non-error
/// outcome for sentences that live on another page).
pub fn find_matches(
    target_text: &str,
    fragments: &[TextFragment],
    config: &MatcherConfig,
) -> Vec<MatchCandidate> {
    let target_norm = normalize(target_text);
    if target_norm.is_empty() || fragments.is_empty() {
        return Vec::new();
    }

    if let Some(candidate) = match_direct_substring(&target_norm, fragments) {
        debug!(
            "direct substring hit: {} fragments, confidence {:.2}",
            candidate.fragment_indices.len(),
            candidate.confidence
        );
        return vec![candidate];
    }

    let target_words = tokenize(target_text, config.min_token_len);
    if target_words.is_empty() {
        return Vec::new();
    }

    let sequence = match_word_sequence(&target_words, fragments, config);
    let sequence = dedup_candidates(sequence, config.max_overlap_ratio);
    if sequence
        .first()
        .map(|c| c.confidence >= config.min_confidence)
        .unwrap_or(false)
    {
        debug!(
            "word sequence hit: {} candidates, best {:.2}",
            sequence.len(),
            sequence[0].confidence
        );
        return sequence;
    }

    let fuzzy = match_fuzzy(target_text, fragments, config);
    if let Some(candidate) = fuzzy {
        if candidate.confidence >= config.min_confidence {
            debug!(
                "fuzzy fallback hit: {} fragments, confidence {:.2}",
                candidate.fragment_indices.len(),
                candidate.confidence
            );
            return vec![candidate];
        }
    }

    debug!("no strategy matched target ({} words)", target_words.len());
    Vec::new()
}

/// Strategy 1: exact substring over the concatenated normalized text.
fn match_direct_substring(target_norm: &str, fragments: &[TextFragment]) -> Option<MatchCandidate> {
    // Concatenate normalized fragment texts, remembering each fragment's
    // byte range so a substring hit maps back to its contributors.
    let mut concat = String::new();
    let mut ranges: Vec<(usize, usize, usize)> = Vec::new(); // (start, end, fragment idx)

    for (idx, frag) in fragments.iter().enumerate() {
        if frag.normalized_text.is_empty() {
            continue;
        }
        if !concat.is_empty() {
            concat.push(' ');
        }
        let start = concat.len();
        concat.push_str(&frag.normalized_text);
        ranges.push((start, concat.len(), idx));
    }

    let hit_start = concat.find(target_norm)?;
    let hit_end = hit_start + target_norm.len();

    let fragment_indices: Vec<usize> = ranges
        .iter()
        .filter(|(start, end, _)| *start < hit_end && *end > hit_start)
        .map(|(_, _, idx)| *idx)
        .collect();

    if fragment_indices.is_empty() {
        return None;
    }

    Some(MatchCandidate {
        word_scores: vec![1.0; fragment_indices.len()],
        fragment_indices,
        confidence: DIRECT_SUBSTRING_CONFIDENCE,
        strategy: MatchStrategy::DirectSubstring,
    })
}

/// Strategy 2: greedy in-order word consumption from each start index.
fn match_word_sequence(
    target_words: &[String],
    fragments: &[TextFragment],
    config: &MatcherConfig,
) -> Vec<MatchCandidate> {
    let mut candidates = Vec::new();

    for start in 0..fragments.len() {
        if let Some(candidate) = scan_from(start, target_words, fragments, config) {
            candidates.push(candidate);
        }
    }

    candidates
}

/// One greedy scan attempt beginning at fragment `start`.
fn scan_from(
    start: usize,
    target_words: &[String],
    fragments: &[TextFragment],
    config: &MatcherConfig,
) -> Option<MatchCandidate> {
    let mut next_word = 0usize;
    let mut accumulated = 0.0f32;
    let mut word_scores: Vec<f32> = Vec::new();
    let mut contributing: Vec<usize> = Vec::new();

    for (idx, frag) in fragments.iter().enumerate().skip(start) {
        if next_word >= target_words.len() {
            break;
        }

        let mut matched_here = 0usize;
        for frag_word in frag.normalized_text.split(' ') {
            if next_word >= target_words.len() {
                break;
            }
            if frag_word.len() < config.min_token_len {
                continue;
            }
            let sim = string_similarity(&target_words[next_word], frag_word);
            if sim >= config.word_match_threshold {
                accumulated += sim;
                word_scores.push(sim);
                next_word += 1;
                matched_here += 1;
            }
        }

        if matched_here > 0 {
            contributing.push(idx);
        } else {
            accumulated -= config.skip_penalty;
        }

        // Runaway scans accumulate penalties faster than matches; cut
        // them off instead of walking the rest of the page.
        if accumulated < 0.5 * next_word as f32 {
            return None;
        }
    }

    let coverage = next_word as f32 / target_words.len() as f32;
    if coverage < config.min_word_coverage || contributing.is_empty() {
        return None;
    }

    // Mean matched-word similarity after skip penalties
    let confidence = (accumulated / next_word as f32).clamp(0.0, 1.0);

    Some(MatchCandidate {
        fragment_indices: contributing,
        word_scores,
        confidence,
        strategy: MatchStrategy::WordSequence,
    })
}

/// Strategy 3: order-insensitive per-fragment scoring.
fn match_fuzzy(
    target_text: &str,
    fragments: &[TextFragment],
    config: &MatcherConfig,
) -> Option<MatchCandidate> {
    let mut scored: Vec<(usize, f32)> = fragments
        .iter()
        .enumerate()
        .filter(|(_, f)| !f.normalized_text.is_empty())
        .map(|(idx, f)| (idx, combined_similarity(target_text, &f.text).combined))
        .filter(|(_, score)| *score >= config.fuzzy_score_threshold)
        .collect();

    if scored.is_empty() {
        return None;
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(config.fuzzy_top_n);
    scored.sort_by_key(|(idx, _)| *idx);

    let confidence =
        (scored.iter().map(|(_, s)| s).sum::<f32>() / scored.len() as f32).clamp(0.0, 1.0);

    Some(MatchCandidate {
        fragment_indices: scored.iter().map(|(idx, _)| *idx).collect(),
        word_scores: scored.iter().map(|(_, s)| *s).collect(),
        confidence,
        strategy: MatchStrategy::Fuzzy,
    })
}

/// Drop candidates whose fragment-index span overlaps an already-kept,
/// higher-confidence candidate by more than `max_overlap_ratio` of the
/// shorter span.
pub fn dedup_candidates(
    mut candidates: Vec<MatchCandidate>,
    max_overlap_ratio: f32,
) -> Vec<MatchCandidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<MatchCandidate> = Vec::new();

    for candidate in candidates {
        let (c_start, c_end) = candidate.span();
        let overlaps = kept.iter().any(|k| {
            let (k_start, k_end) = k.span();
            let overlap_start = c_start.max(k_start);
            let overlap_end = c_end.min(k_end);
            if overlap_start > overlap_end {
                return false;
            }
            let overlap_len = (overlap_end - overlap_start + 1) as f32;
            let shorter = ((c_end - c_start + 1).min(k_end - k_start + 1)) as f32;
            overlap_len / shorter > max_overlap_ratio
        });

        if !overlaps {
            kept.push(candidate);
        }
    }

    kept
}
