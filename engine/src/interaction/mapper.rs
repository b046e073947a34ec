//! Normalized landmark → surface pixel mapping.
//!
//! The video is shown as a selfie view while the detector reports
//! coordinates in camera space, so mirrored surfaces flip x. Nothing is
//! cached: callers pass the current surface on every call.

use super::landmarks::{HandLandmarkSet, Landmark};

/// Default camera aspect ratio (640x480).
pub const DEFAULT_ASPECT_RATIO: f32 = 640.0 / 480.0;

// ── Point ──────────────────────────────────────────────────

/// A position in surface pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

// ── Display rect ───────────────────────────────────────────

/// A rectangle in display (layout) pixels, as reported by the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayRect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

// ── Surface ────────────────────────────────────────────────

/// Drawing surface dimensions in device pixels plus the mirror flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub width: f32,
    pub height: f32,
    pub mirror: bool,
}

impl Surface {
    pub const fn new(width: f32, height: f32, mirror: bool) -> Self {
        Self {
            width,
            height,
            mirror,
        }
    }

    /// Largest surface of the given aspect ratio that fits the window.
    pub fn fit_aspect(window_width: f32, window_height: f32, ratio: f32, mirror: bool) -> Self {
        if window_height > 0.0 && window_width / window_height > ratio {
            Self::new(window_height * ratio, window_height, mirror)
        } else {
            Self::new(window_width, window_width / ratio, mirror)
        }
    }

    pub fn map(&self, point: &Landmark) -> Point {
        map_point(point, self.width, self.height, self.mirror)
    }

    /// Convert an element rect laid out in display pixels into surface
    /// pixels, given where the surface itself is displayed.
    ///
    /// Returns `None` when the surface has no displayed area.
    pub fn scale_display_rect(
        &self,
        element: &DisplayRect,
        canvas: &DisplayRect,
    ) -> Option<DisplayRect> {
        if canvas.width <= 0.0 || canvas.height <= 0.0 {
            return None;
        }
        let sx = self.width / canvas.width;
        let sy = self.height / canvas.height;
        Some(DisplayRect::new(
            (element.left - canvas.left) * sx,
            (element.top - canvas.top) * sy,
            element.width * sx,
            element.height * sy,
        ))
    }
}

/// Map a normalized landmark to surface pixels.
pub fn map_point(point: &Landmark, surface_width: f32, surface_height: f32, mirror: bool) -> Point {
    let x = if mirror {
        surface_width - point.x * surface_width
    } else {
        point.x * surface_width
    };
    Point::new(x, point.y * surface_height)
}

/// Map every landmark of a hand, in index order.
pub fn map_hand(hand: &HandLandmarkSet, surface: &Surface) -> Vec<Point> {
    hand.points().iter().map(|p| surface.map(p)).collect()
}
