//! Text-to-coordinate reconciliation for provenance highlights
//!
//! This library locates backend-identified evidence sentences inside the
//! live text layer of a rendered PDF page and produces screen-space
//! highlight rectangles:
//! - Approximate string matching over positioned fragments (exact
//!   substring, greedy word sequence, fuzzy fallback)
//! - Coordinate reconciliation between backend PDF-space boxes and the
//!   zoomed, offset on-screen rendering surface
//! - Spatial clustering of matched fragments into minimal regions
//!
//! Rendering, network fetching, and the PDF engine itself are the host's
//! concern; this crate only turns sentences plus fragments into regions.

pub mod coords;
pub mod fragment;
pub mod grouping;
pub mod highlighter;
pub mod matcher;
pub mod normalize;
pub mod similarity;

pub use coords::{map_to_screen, PageMetrics, Rect};
pub use fragment::{
    MappingResponse, PageText, SentenceId, SentenceMapping, StableElement, TargetSentence,
    TextFragment,
};
pub use grouping::{group_rects, GroupedRegion, GroupingConfig};
pub use highlighter::{
    ConfidenceTier, Highlighter, HighlighterConfig, HighlightRegion, MappingSource, PassState,
    PassToken,
};
pub use matcher::{find_matches, MatchCandidate, MatcherConfig, MatchStrategy};
pub use normalize::{normalize, tokenize};
pub use similarity::{
    combined_similarity, jaccard_similarity, levenshtein_distance, string_similarity,
    token_similarity, word_overlap_ratio,
};

#[derive(Debug, thiserror::Error)]
pub enum HighlightError {
    /// No document, no sentence ids, or an empty mapping response.
    /// Non-fatal: the pass short-circuits to "no highlights".
    #[error("required input unavailable: {0}")]
    DataUnavailable(&'static str),
    /// The mapping source failed (network, backend). The shell decides
    /// whether to retry; the orchestrator surfaces an empty result.
    #[error("mapping fetch failed: {0}")]
    UpstreamFetch(String),
    /// A newer pass superseded this one; discard silently.
    #[error("pass superseded by a newer trigger")]
    Superseded,
    /// Internal invariant breakage (e.g. negative confidence);
    /// recoverable at the batch level.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
