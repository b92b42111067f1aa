//! Coordinate-space reconciliation
//!
//! Backend extraction and the browser's rendering surface are two
//! independent coordinate producers. They agree only up to a fixed scale
//! factor at the reference zoom, so the mapping is a single uniform
//! transform: scale by `scale_factor * zoom`, flip the Y axis (PDF space
//! has its origin at the bottom-left, screens at the top-left), then add
//! the surface's on-screen offset. No per-field offset adjustments.

use crate::fragment::{StableElement, TextFragment};

/// Axis-aligned rectangle in screen pixels, origin at top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Vertical overlap in pixels (0 when disjoint)
    pub fn vertical_overlap(&self, other: &Rect) -> f32 {
        let top = self.y.max(other.y);
        let bottom = self.bottom().min(other.bottom());
        (bottom - top).max(0.0)
    }

    /// Vertical overlap as a fraction of the smaller height
    pub fn vertical_overlap_ratio(&self, other: &Rect) -> f32 {
        let min_height = self.height.min(other.height);
        if min_height <= 0.0 {
            return 0.0;
        }
        self.vertical_overlap(other) / min_height
    }

    /// Horizontal gap in pixels; 0 when the rects touch or overlap
    pub fn horizontal_gap(&self, other: &Rect) -> f32 {
        if other.x >= self.right() {
            other.x - self.right()
        } else if self.x >= other.right() {
            self.x - other.right()
        } else {
            0.0
        }
    }
}

/// On-screen geometry of the rendering surface for one page.
///
/// Passed explicitly on every call; the mapper never reads ambient
/// viewport state.
#[derive(Debug, Clone, Copy)]
pub struct PageMetrics {
    /// Surface's on-screen left edge in pixels
    pub surface_left: f32,
    /// Surface's on-screen top edge in pixels
    pub surface_top: f32,
    /// Height of the page in the source (PDF) coordinate space, needed
    /// to flip the bottom-left-origin Y axis
    pub page_height: f32,
    /// Fixed ratio between source units and surface pixels at zoom 1.0
    pub scale_factor: f32,
    /// Current zoom multiplier
    pub zoom: f32,
}

impl PageMetrics {
    /// Metrics are unusable until the surface has been laid out with a
    /// real size and scale.
    pub fn is_usable(&self) -> bool {
        self.scale_factor > 0.0 && self.zoom > 0.0 && self.page_height > 0.0
    }

    fn pixels_per_unit(&self) -> f32 {
        self.scale_factor * self.zoom
    }
}

/// Map a source-space box (bottom-left origin) to a screen rect.
///
/// Returns `None` when the box has a non-positive width or height or
/// the metrics are unusable; callers skip the item, they never error.
pub fn map_to_screen(
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    metrics: &PageMetrics,
) -> Option<Rect> {
    if !metrics.is_usable() {
        return None;
    }
    if width <= 0.0 || height <= 0.0 {
        return None;
    }

    let ppu = metrics.pixels_per_unit();
    // Y flip: the source y is the box's bottom edge measured up from the
    // page bottom; the screen y is the box's top edge measured down.
    let top_in_units = metrics.page_height - (y + height);
    Some(Rect::new(
        metrics.surface_left + x * ppu,
        metrics.surface_top + top_in_units * ppu,
        width * ppu,
        height * ppu,
    ))
}

/// Map one extracted fragment to a screen rect.
pub fn map_fragment(fragment: &TextFragment, metrics: &PageMetrics) -> Option<Rect> {
    map_to_screen(
        fragment.x,
        fragment.y,
        fragment.width,
        fragment.height,
        metrics,
    )
}

/// Map one backend stable element to a screen rect.
pub fn map_stable_element(element: &StableElement, metrics: &PageMetrics) -> Option<Rect> {
    map_to_screen(element.x, element.y, element.width, element.height, metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> PageMetrics {
        PageMetrics {
            surface_left: 100.0,
            surface_top: 50.0,
            page_height: 800.0,
            scale_factor: 1.5,
            zoom: 2.0,
        }
    }

    #[test]
    fn test_map_to_screen_scales_and_flips() {
        // Box with its bottom edge 700 units up the page, 12 tall: the
        // top edge is 88 units down from the page top.
        let rect = map_to_screen(10.0, 700.0, 100.0, 12.0, &metrics()).unwrap();
        assert!((rect.x - (100.0 + 10.0 * 3.0)).abs() < 1e-3);
        assert!((rect.y - (50.0 + 88.0 * 3.0)).abs() < 1e-3);
        assert!((rect.width - 300.0).abs() < 1e-3);
        assert!((rect.height - 36.0).abs() < 1e-3);
    }

    #[test]
    fn test_map_to_screen_rejects_degenerate_boxes() {
        assert!(map_to_screen(10.0, 10.0, 0.0, 12.0, &metrics()).is_none());
        assert!(map_to_screen(10.0, 10.0, 100.0, -1.0, &metrics()).is_none());
    }

    #[test]
    fn test_map_to_screen_rejects_unusable_metrics() {
        let mut m = metrics();
        m.scale_factor = 0.0;
        assert!(map_to_screen(10.0, 10.0, 100.0, 12.0, &m).is_none());

        let mut m = metrics();
        m.zoom = 0.0;
        assert!(map_to_screen(10.0, 10.0, 100.0, 12.0, &m).is_none());
    }

    #[test]
    fn test_rect_union() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 20.0, 10.0);
        let u = a.union(&b);
        assert_eq!(u, Rect::new(0.0, 0.0, 25.0, 15.0));
    }

    #[test]
    fn test_rect_vertical_overlap_ratio() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(50.0, 0.0, 10.0, 10.0);
        assert!((a.vertical_overlap_ratio(&b) - 1.0).abs() < 1e-6);

        let c = Rect::new(50.0, 20.0, 10.0, 10.0);
        assert_eq!(a.vertical_overlap_ratio(&c), 0.0);
    }

    #[test]
    fn test_rect_horizontal_gap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(25.0, 0.0, 10.0, 10.0);
        assert!((a.horizontal_gap(&b) - 15.0).abs() < 1e-6);
        assert!((b.horizontal_gap(&a) - 15.0).abs() < 1e-6);
        let overlapping = Rect::new(5.0, 0.0, 10.0, 10.0);
        assert_eq!(a.horizontal_gap(&overlapping), 0.0);
    }
}
