//! Spatial clustering of matched fragment rectangles.
//!
//! Individually matched fragments are tiny; drawing one box per fragment
//! produces visual noise. Rects that sit on the same visual line with a
//! small horizontal gap between them merge into a single covering
//! region. Sorting is (y, then x), so the walk sees each line's rects
//! left to right before moving down the page.

use crate::coords::Rect;

/// One rect entering the grouper, tagged with its source fragment.
#[derive(Debug, Clone)]
pub struct GroupInput {
    pub rect: Rect,
    /// `TextFragment::source_index` of the contributor
    pub source_index: usize,
    pub confidence: f32,
}

/// A clustered region: the union rect of its members.
#[derive(Debug, Clone)]
pub struct GroupedRegion {
    pub rect: Rect,
    /// Contributing fragment source indices, ascending
    pub source_indices: Vec<usize>,
    /// Plain mean of member confidences. Member count is capped
    /// upstream, so size-weighted averaging buys nothing here.
    pub confidence: f32,
}

/// Adjacency rules for joining a rect onto the current group.
#[derive(Debug, Clone)]
pub struct GroupingConfig {
    /// Minimum vertical overlap, as a fraction of the smaller height,
    /// for two rects to count as the same visual line (default: 0.5)
    pub min_vertical_overlap: f32,
    /// Maximum horizontal gap in screen pixels (default: 30; callers
    /// should scale this with zoom so it keeps its visual meaning)
    pub max_gap_px: f32,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            min_vertical_overlap: 0.5,
            max_gap_px: 30.0,
        }
    }
}

/// Cluster rects into minimal covering regions.
pub fn group_rects(mut inputs: Vec<GroupInput>, config: &GroupingConfig) -> Vec<GroupedRegion> {
    if inputs.is_empty() {
        return Vec::new();
    }

    inputs.sort_by(|a, b| {
        (a.rect.y, a.rect.x)
            .partial_cmp(&(b.rect.y, b.rect.x))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut regions: Vec<GroupedRegion> = Vec::new();
    let mut current: Vec<GroupInput> = Vec::new();

    for input in inputs {
        let joins = current.last().map_or(false, |last| {
            last.rect.vertical_overlap_ratio(&input.rect) >= config.min_vertical_overlap
                && last.rect.horizontal_gap(&input.rect) <= config.max_gap_px
        });

        if joins {
            current.push(input);
        } else {
            if !current.is_empty() {
                regions.push(finish_group(std::mem::take(&mut current)));
            }
            current.push(input);
        }
    }

    if !current.is_empty() {
        regions.push(finish_group(current));
    }

    regions
}

fn finish_group(members: Vec<GroupInput>) -> GroupedRegion {
    let rect = members
        .iter()
        .skip(1)
        .fold(members[0].rect, |acc, m| acc.union(&m.rect));

    let confidence = members.iter().map(|m| m.confidence).sum::<f32>() / members.len() as f32;

    let mut source_indices: Vec<usize> = members.iter().map(|m| m.source_index).collect();
    source_indices.sort_unstable();
    source_indices.dedup();

    GroupedRegion {
        rect,
        source_indices,
        confidence,
    }
}
