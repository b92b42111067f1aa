//! Highlight orchestration: resolving target sentences to screen-space
//! regions.
//!
//! One configurable orchestrator drives the whole pipeline instead of
//! per-call-site variants: precomputed stable elements are the fast
//! path, the sequence matcher against the live page text is the slow
//! path, and both feed the coordinate mapper and spatial grouper. Every
//! pass clears the previous regions before building; regions are never
//! patched incrementally.
//!
//! Supersession uses a generation counter. `begin_pass` stamps a token;
//! `apply_highlights` refuses a stale token, so a slow mapping fetch
//! that completes after a newer trigger can never paint stale regions.

use crate::coords::{map_fragment, map_stable_element, PageMetrics, Rect};
use crate::fragment::{
    MappingResponse, PageText, SentenceId, StableElement, TargetSentence, TextFragment,
};
use crate::grouping::{group_rects, GroupInput, GroupingConfig};
use crate::matcher::{find_matches, MatchStrategy, MatcherConfig};
use crate::HighlightError;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

/// Presentation bucket for a region's confidence.
///
/// The consuming UI renders "found and correct" differently from "found
/// but unsure"; the tier carries that distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

/// Final output unit: one screen-space highlight.
#[derive(Debug, Clone)]
pub struct HighlightRegion {
    pub sentence_id: SentenceId,
    /// Bounding rectangle in on-screen pixels
    pub rect: Rect,
    pub confidence: f32,
    pub tier: ConfidenceTier,
    /// Contributing `TextFragment::source_index` values, for tracing a
    /// region back to the text that produced it
    pub fragment_indices: Vec<usize>,
    /// Strategy of the match that produced this region; `None` for the
    /// precomputed coordinate path
    pub strategy: Option<MatchStrategy>,
}

/// Orchestrator configuration: matcher and grouper thresholds plus
/// presentation tiering.
///
/// Tier cutoffs and the settle delay are tunables, not contract.
#[derive(Debug, Clone)]
pub struct HighlighterConfig {
    pub matcher: MatcherConfig,
    pub grouping: GroupingConfig,
    /// Regions at or above this confidence render as high-trust
    /// (default: 0.7)
    pub high_tier: f32,
    /// Medium-trust cutoff (default: 0.5)
    pub medium_tier: f32,
    /// Below this, regions are discarded entirely (default: 0.3)
    pub min_confidence: f32,
    /// Suggested delay before querying coordinates after a render, in
    /// milliseconds. Carried as data for the host; the library never
    /// sleeps (default: 100)
    pub settle_delay_ms: u64,
}

impl Default for HighlighterConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            grouping: GroupingConfig::default(),
            high_tier: 0.7,
            medium_tier: 0.5,
            min_confidence: 0.3,
            settle_delay_ms: 100,
        }
    }
}

impl HighlighterConfig {
    fn tier_for(&self, confidence: f32) -> Option<ConfidenceTier> {
        if confidence >= self.high_tier {
            Some(ConfidenceTier::High)
        } else if confidence >= self.medium_tier {
            Some(ConfidenceTier::Medium)
        } else if confidence >= self.min_confidence {
            Some(ConfidenceTier::Low)
        } else {
            None
        }
    }
}

/// Provider of backend sentence-to-coordinate mappings.
///
/// The host owns the network client and any awaiting; this seam is
/// synchronous. Implementations surface transport failures as
/// [`HighlightError::UpstreamFetch`].
pub trait MappingSource {
    fn sentence_mappings(
        &self,
        document: &str,
        sentence_ids: &[SentenceId],
    ) -> Result<MappingResponse, HighlightError>;
}

/// Opaque stamp for one highlight pass.
///
/// Obtained from [`Highlighter::begin_pass`]; becomes stale as soon as
/// a newer pass begins or the document/page/zoom context changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassToken(u64);

/// Lifecycle of the active pass, exposed for developer tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Resolving,
    Matching,
    Grouping,
    Rendered,
}

/// The orchestrator. Owns the active region set and the mapping cache;
/// borrows fragment lists only for the duration of a pass.
pub struct Highlighter {
    config: HighlighterConfig,
    generation: u64,
    state: PassState,
    document: Option<String>,
    regions: Vec<HighlightRegion>,
    mapping_cache: HashMap<String, MappingResponse>,
}

impl Highlighter {
    pub fn new(config: HighlighterConfig) -> Self {
        Self {
            config,
            generation: 0,
            state: PassState::Idle,
            document: None,
            regions: Vec::new(),
            mapping_cache: HashMap::new(),
        }
    }

    pub fn config(&self) -> &HighlighterConfig {
        &self.config
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    /// Currently rendered regions (empty between passes).
    pub fn regions(&self) -> &[HighlightRegion] {
        &self.regions
    }

    /// Switch the active document. Clears regions and the mapping cache;
    /// any in-flight pass token goes stale.
    pub fn set_document(&mut self, document: impl Into<String>) {
        self.document = Some(document.into());
        self.mapping_cache.clear();
        self.reset();
    }

    /// Supersede any in-flight pass without starting a new one (page,
    /// zoom, or provenance changed).
    pub fn invalidate(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.regions.clear();
        self.state = PassState::Idle;
    }

    /// Start a pass and stamp it. Any earlier token is stale from here.
    pub fn begin_pass(&mut self) -> PassToken {
        self.generation += 1;
        self.state = PassState::Resolving;
        PassToken(self.generation)
    }

    fn check_token(&self, token: PassToken) -> Result<(), HighlightError> {
        if token.0 != self.generation {
            debug!(
                "discarding stale pass {} (current {})",
                token.0, self.generation
            );
            return Err(HighlightError::Superseded);
        }
        Ok(())
    }

    /// Fetch sentence mappings through the source, memoized per
    /// (document, sentence set). The cache survives page and zoom
    /// changes and clears on document change.
    pub fn fetch_mappings(
        &mut self,
        source: &dyn MappingSource,
        sentence_ids: &[SentenceId],
    ) -> Result<MappingResponse, HighlightError> {
        let document = self
            .document
            .clone()
            .ok_or(HighlightError::DataUnavailable("no document filename"))?;
        if sentence_ids.is_empty() {
            info!("mapping fetch skipped: no sentence ids");
            return Err(HighlightError::DataUnavailable("no sentence ids"));
        }

        let mut id_keys: Vec<String> = sentence_ids.iter().map(|id| id.as_key()).collect();
        id_keys.sort();
        let cache_key = format!(
            "{}::{}",
            document,
            serde_json::to_string(&id_keys).unwrap_or_default()
        );

        if let Some(cached) = self.mapping_cache.get(&cache_key) {
            debug!("mapping cache hit for {} ids", sentence_ids.len());
            return Ok(cached.clone());
        }

        let response = match source.sentence_mappings(&document, sentence_ids) {
            Ok(r) => r,
            Err(e) => {
                warn!("mapping fetch failed for {}: {}", document, e);
                return Err(e);
            }
        };

        self.mapping_cache.insert(cache_key, response.clone());
        Ok(response)
    }

    /// Build [`TargetSentence`]s from a mapping response, preserving the
    /// requested id order. Ids missing from the response become
    /// text-less targets that can only be skipped downstream.
    pub fn resolve_targets(
        &self,
        response: &MappingResponse,
        sentence_ids: &[SentenceId],
    ) -> Vec<TargetSentence> {
        sentence_ids
            .iter()
            .map(|id| {
                let mapping = response.sentence_mappings.get(&id.as_key());
                let text = mapping
                    .and_then(|m| m.sentence_text.clone())
                    .unwrap_or_default();
                let elements = mapping.map(|m| m.stable_elements.clone()).unwrap_or_default();
                TargetSentence::new(id.clone(), text).with_elements(elements)
            })
            .collect()
    }

    /// Run one full highlight pass for the current page.
    ///
    /// Clears the previous region set first. Per-sentence failures are
    /// contained: a sentence that resolves to nothing is logged and
    /// skipped, never an error. Returns [`HighlightError::Superseded`]
    /// when `token` is stale, leaving whatever the newer pass produced
    /// untouched.
    pub fn apply_highlights(
        &mut self,
        token: PassToken,
        targets: &[TargetSentence],
        page_text: &PageText,
        metrics: &PageMetrics,
    ) -> Result<&[HighlightRegion], HighlightError> {
        self.check_token(token)?;

        self.regions.clear();
        self.state = PassState::Matching;

        if targets.is_empty() {
            info!("highlight pass with no targets; nothing to draw");
            self.state = PassState::Rendered;
            return Ok(&self.regions);
        }

        // Horizontal gaps are configured at reference zoom; scale so the
        // visual meaning survives zooming.
        let grouping = GroupingConfig {
            max_gap_px: self.config.grouping.max_gap_px * metrics.zoom,
            ..self.config.grouping.clone()
        };

        let mut built: Vec<HighlightRegion> = Vec::new();
        let mut misses = 0usize;

        for target in targets {
            let regions = self.resolve_sentence(target, page_text, metrics, &grouping)?;
            if regions.is_empty() {
                misses += 1;
                debug!("sentence {} produced no regions on page {}", target.id, page_text.page);
            }
            built.extend(regions);
        }

        if misses == targets.len() {
            info!(
                "no sentence matched on page {} ({} targets)",
                page_text.page,
                targets.len()
            );
        }

        self.state = PassState::Grouping;
        self.regions = dedup_regions(built);
        self.state = PassState::Rendered;
        Ok(&self.regions)
    }

    /// Resolve one sentence: coordinate path first, text fallback second.
    fn resolve_sentence(
        &self,
        target: &TargetSentence,
        page_text: &PageText,
        metrics: &PageMetrics,
        grouping: &GroupingConfig,
    ) -> Result<Vec<HighlightRegion>, HighlightError> {
        let coordinate_inputs =
            self.coordinate_inputs(&target.precomputed_elements, page_text.page, metrics);

        if !coordinate_inputs.is_empty() {
            return self.finish_regions(target, coordinate_inputs, None, grouping);
        }

        if !target.precomputed_elements.is_empty() {
            debug!(
                "sentence {}: {} precomputed elements, none usable on page {}; text fallback",
                target.id,
                target.precomputed_elements.len(),
                page_text.page
            );
        }

        // Slow path: locate the sentence text in the live fragment list
        if target.text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let candidates = find_matches(&target.text, &page_text.fragments, &self.config.matcher);
        let mut regions = Vec::new();
        for candidate in candidates {
            let inputs =
                self.fragment_inputs(&candidate.fragment_indices, candidate.confidence, page_text, metrics);
            if inputs.is_empty() {
                debug!(
                    "sentence {}: candidate with {} fragments had no mappable coordinates",
                    target.id,
                    candidate.fragment_indices.len()
                );
                continue;
            }
            regions.extend(self.finish_regions(
                target,
                inputs,
                Some(candidate.strategy),
                grouping,
            )?);
        }
        Ok(regions)
    }

    /// Filter and map precomputed elements for the current page.
    fn coordinate_inputs(
        &self,
        elements: &[StableElement],
        page: u32,
        metrics: &PageMetrics,
    ) -> Vec<GroupInput> {
        elements
            .iter()
            .filter(|el| el.page == page && el.is_usable())
            .filter_map(|el| {
                let rect = map_stable_element(el, metrics);
                if rect.is_none() {
                    debug!(
                        "stable element {} on page {} failed coordinate conversion",
                        el.stable_index, el.page
                    );
                }
                rect.map(|rect| GroupInput {
                    rect,
                    source_index: el.stable_index.max(0) as usize,
                    confidence: el.combined_confidence,
                })
            })
            .collect()
    }

    /// Map matched fragments, skipping any that fail conversion.
    fn fragment_inputs(
        &self,
        fragment_indices: &[usize],
        confidence: f32,
        page_text: &PageText,
        metrics: &PageMetrics,
    ) -> Vec<GroupInput> {
        fragment_indices
            .iter()
            .filter_map(|&idx| page_text.fragments.get(idx))
            .filter_map(|frag: &TextFragment| {
                map_fragment(frag, metrics).map(|rect| GroupInput {
                    rect,
                    source_index: frag.source_index,
                    confidence,
                })
            })
            .collect()
    }

    /// Group inputs and wrap the surviving clusters as regions.
    fn finish_regions(
        &self,
        target: &TargetSentence,
        inputs: Vec<GroupInput>,
        strategy: Option<MatchStrategy>,
        grouping: &GroupingConfig,
    ) -> Result<Vec<HighlightRegion>, HighlightError> {
        let mut regions = Vec::new();
        for group in group_rects(inputs, grouping) {
            if group.confidence < 0.0 {
                return Err(HighlightError::InvalidInput(format!(
                    "negative confidence {} for sentence {}",
                    group.confidence, target.id
                )));
            }
            let Some(tier) = self.config.tier_for(group.confidence) else {
                debug!(
                    "sentence {}: region below minimum confidence ({:.2}), discarded",
                    target.id, group.confidence
                );
                continue;
            };
            regions.push(HighlightRegion {
                sentence_id: target.id.clone(),
                rect: group.rect,
                confidence: group.confidence,
                tier,
                fragment_indices: group.source_indices,
                strategy,
            });
        }
        Ok(regions)
    }
}

/// Drop duplicate regions sharing a (sentence id, fragment set) key,
/// keeping the higher-confidence one.
fn dedup_regions(mut regions: Vec<HighlightRegion>) -> Vec<HighlightRegion> {
    regions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut seen: HashSet<(String, Vec<usize>)> = HashSet::new();
    regions.retain(|r| seen.insert((r.sentence_id.as_key(), r.fragment_indices.clone())));
    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        let config = HighlighterConfig::default();
        assert_eq!(config.tier_for(0.9), Some(ConfidenceTier::High));
        assert_eq!(config.tier_for(0.7), Some(ConfidenceTier::High));
        assert_eq!(config.tier_for(0.6), Some(ConfidenceTier::Medium));
        assert_eq!(config.tier_for(0.4), Some(ConfidenceTier::Low));
        assert_eq!(config.tier_for(0.2), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = HighlighterConfig::default();
        assert!((config.matcher.word_match_threshold - 0.8).abs() < 1e-6);
        assert!((config.matcher.min_word_coverage - 0.8).abs() < 1e-6);
        assert!((config.grouping.min_vertical_overlap - 0.5).abs() < 1e-6);
        assert_eq!(config.settle_delay_ms, 100);
    }

    #[test]
    fn test_begin_pass_invalidates_previous_token() {
        let mut hl = Highlighter::new(HighlighterConfig::default());
        let first = hl.begin_pass();
        let second = hl.begin_pass();
        assert!(hl.check_token(first).is_err());
        assert!(hl.check_token(second).is_ok());
    }

    #[test]
    fn test_invalidate_stales_token() {
        let mut hl = Highlighter::new(HighlighterConfig::default());
        let token = hl.begin_pass();
        hl.invalidate();
        assert!(hl.check_token(token).is_err());
        assert_eq!(hl.state(), PassState::Idle);
    }

    #[test]
    fn test_fetch_requires_document_and_ids() {
        struct Never;
        impl MappingSource for Never {
            fn sentence_mappings(
                &self,
                _: &str,
                _: &[SentenceId],
            ) -> Result<MappingResponse, HighlightError> {
                panic!("should not be called");
            }
        }

        let mut hl = Highlighter::new(HighlighterConfig::default());
        let err = hl.fetch_mappings(&Never, &[SentenceId::from(1)]).unwrap_err();
        assert!(matches!(err, HighlightError::DataUnavailable(_)));

        hl.set_document("report.pdf");
        let err = hl.fetch_mappings(&Never, &[]).unwrap_err();
        assert!(matches!(err, HighlightError::DataUnavailable(_)));
    }

    #[test]
    fn test_dedup_regions_keeps_higher_confidence() {
        let make = |confidence: f32| HighlightRegion {
            sentence_id: SentenceId::from(1),
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            confidence,
            tier: ConfidenceTier::High,
            fragment_indices: vec![3, 4],
            strategy: None,
        };
        let kept = dedup_regions(vec![make(0.7), make(0.9)]);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
    }
}
