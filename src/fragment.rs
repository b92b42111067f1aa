//! Data model: positioned text fragments, target sentences, and the
//! mapping source wire types.
//!
//! Fragments come from the host's page text extractor every time a page
//! is rendered; their coordinates are PDF-space (origin at bottom-left),
//! never screen pixels, and never survive a zoom change without
//! re-extraction.

use crate::normalize::normalize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One atomic positioned span of text extracted from a rendered page.
#[derive(Debug, Clone)]
pub struct TextFragment {
    /// Stable per-page identifier; insertion order is reading order
    pub source_index: usize,
    /// Raw text content
    pub text: String,
    /// Normalized form, computed once at construction
    pub normalized_text: String,
    /// Page number (1-indexed)
    pub page: u32,
    /// X position in PDF space
    pub x: f32,
    /// Y position in PDF space (origin at bottom-left)
    pub y: f32,
    /// Width in PDF space
    pub width: f32,
    /// Height in PDF space
    pub height: f32,
    /// Font size, if the extractor reports it (not used for matching)
    pub font_size: Option<f32>,
    /// Font name, if the extractor reports it (not used for matching)
    pub font_name: Option<String>,
}

impl TextFragment {
    pub fn new(source_index: usize, text: impl Into<String>, page: u32) -> Self {
        let text = text.into();
        let normalized_text = normalize(&text);
        Self {
            source_index,
            text,
            normalized_text,
            page,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            font_size: None,
            font_name: None,
        }
    }

    pub fn with_bounds(mut self, x: f32, y: f32, width: f32, height: f32) -> Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self
    }
}

/// The live text layer of one rendered page.
#[derive(Debug, Clone)]
pub struct PageText {
    /// Page number (1-indexed)
    pub page: u32,
    /// Fragments in extraction (reading) order
    pub fragments: Vec<TextFragment>,
    /// Page width in the fragments' coordinate space
    pub page_width: f32,
    /// Page height in the fragments' coordinate space
    pub page_height: f32,
}

impl PageText {
    pub fn new(page: u32, fragments: Vec<TextFragment>, page_width: f32, page_height: f32) -> Self {
        Self {
            page,
            fragments,
            page_width,
            page_height,
        }
    }
}

/// Backend sentence identifier. The API sends integers for most
/// documents and opaque strings for a few legacy ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SentenceId {
    Number(i64),
    Text(String),
}

impl SentenceId {
    /// Canonical string form, used as a map key against the wire response
    pub fn as_key(&self) -> String {
        match self {
            SentenceId::Number(n) => n.to_string(),
            SentenceId::Text(s) => s.clone(),
        }
    }
}

impl From<i64> for SentenceId {
    fn from(n: i64) -> Self {
        SentenceId::Number(n)
    }
}

impl From<&str> for SentenceId {
    fn from(s: &str) -> Self {
        SentenceId::Text(s.to_string())
    }
}

impl std::fmt::Display for SentenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentenceId::Number(n) => write!(f, "{}", n),
            SentenceId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A unit of text the system must locate and highlight.
#[derive(Debug, Clone)]
pub struct TargetSentence {
    pub id: SentenceId,
    /// Canonical sentence string from the provenance response
    pub text: String,
    /// Backend-precomputed coordinate records; when present and usable,
    /// fuzzy matching is bypassed entirely
    pub precomputed_elements: Vec<StableElement>,
}

impl TargetSentence {
    pub fn new(id: impl Into<SentenceId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            precomputed_elements: Vec::new(),
        }
    }

    pub fn with_elements(mut self, elements: Vec<StableElement>) -> Self {
        self.precomputed_elements = elements;
        self
    }
}

/// A backend-precomputed association between a sentence and a
/// coordinate region.
///
/// `stable_index` matches a `TextFragment::source_index` by convention;
/// the contract holds only when backend and frontend extract in the
/// same order, so consumers must fall back to text search when the
/// element is unusable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StableElement {
    pub stable_index: i64,
    pub page: u32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub text_similarity: f32,
    #[serde(default)]
    pub overlap_confidence: f32,
    #[serde(default)]
    pub combined_confidence: f32,
}

impl StableElement {
    /// An element with zero combined confidence or no text carries no
    /// usable signal and must be skipped, not rendered.
    pub fn is_usable(&self) -> bool {
        self.combined_confidence > 0.0
            && self.text.as_deref().map(|t| !t.trim().is_empty()).unwrap_or(false)
    }
}

/// Per-sentence record in the mapping source response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentenceMapping {
    #[serde(default)]
    pub stable_elements: Vec<StableElement>,
    #[serde(default)]
    pub sentence_text: Option<String>,
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub primary_page: Option<u32>,
}

/// Wire shape of `getSentenceItemMappings`.
///
/// An absent or empty `stable_elements` array means "no precomputed
/// mapping" and triggers the text fallback path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingResponse {
    #[serde(default)]
    pub sentence_mappings: HashMap<String, SentenceMapping>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_caches_normalized_text() {
        let frag = TextFragment::new(0, "Hello, World!", 1);
        assert_eq!(frag.normalized_text, "hello world");
    }

    #[test]
    fn test_stable_element_usability() {
        let mut el = StableElement {
            stable_index: 3,
            page: 1,
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 12.0,
            text: Some("evidence".into()),
            text_similarity: 0.9,
            overlap_confidence: 0.8,
            combined_confidence: 0.85,
        };
        assert!(el.is_usable());

        el.combined_confidence = 0.0;
        assert!(!el.is_usable());

        el.combined_confidence = 0.85;
        el.text = None;
        assert!(!el.is_usable());

        el.text = Some("   ".into());
        assert!(!el.is_usable());
    }

    #[test]
    fn test_mapping_response_deserializes_backend_shape() {
        let json = r#"{
            "sentence_mappings": {
                "5": {
                    "stable_elements": [
                        {"stable_index": 12, "page": 2, "x": 72.0, "y": 640.5,
                         "width": 310.2, "height": 11.0, "text": "the finding",
                         "text_similarity": 0.97, "overlap_confidence": 0.88,
                         "combined_confidence": 0.92}
                    ],
                    "sentence_text": "The finding was significant.",
                    "found": true,
                    "primary_page": 2
                },
                "7": {"stable_elements": [], "found": false}
            }
        }"#;

        let resp: MappingResponse = serde_json::from_str(json).unwrap();
        let m5 = &resp.sentence_mappings["5"];
        assert!(m5.found);
        assert_eq!(m5.primary_page, Some(2));
        assert_eq!(m5.stable_elements.len(), 1);
        assert!(m5.stable_elements[0].is_usable());

        let m7 = &resp.sentence_mappings["7"];
        assert!(!m7.found);
        assert!(m7.stable_elements.is_empty());
    }

    #[test]
    fn test_sentence_id_key_forms() {
        assert_eq!(SentenceId::from(5).as_key(), "5");
        assert_eq!(SentenceId::from("s-12").as_key(), "s-12");
    }
}
