// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the coordinate transformation between the on-screen
//! page viewport (top-left origin, pixels, Y down) and native PDF page space
//! (bottom-left origin, points, Y up).

use crate::models::placement::Placement;

/// A 2D point in viewport pixels, relative to the viewport's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height, in whatever unit the owner works in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True unless both components are finite and strictly positive.
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }
}

/// Where the mark lands on the PDF page: lower-left origin plus size, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Clamp one axis of a top-left position so the mark stays inside the viewport.
///
/// When the mark is larger than the viewport the upper bound goes negative
/// and the position pins to 0; the mark then overflows on the far side.
pub fn clamp_axis(position: f64, viewport: f64, mark: f64) -> f64 {
    position.min(viewport - mark).max(0.0)
}

/// Map a viewport placement onto the native page.
///
/// Returns `None` while the rendered size is unknown or degenerate. The
/// mark's size is carried over unscaled: screen pixels become PDF points.
pub fn map_to_page(
    rendered: Size,
    native: Size,
    placement: Placement,
    mark: Size,
) -> Option<PagePlacement> {
    if rendered.is_degenerate() {
        return None;
    }

    let scale_x = native.width / rendered.width;
    let scale_y = native.height / rendered.height;

    Some(PagePlacement {
        x: placement.x * scale_x,
        y: native.height - (placement.y * scale_y) - mark.height,
        width: mark.width,
        height: mark.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_page_scenario() {
        let rendered = Size::new(600.0, 800.0);
        let native = Size::new(612.0, 792.0);
        let mark = Size::new(100.0, 50.0);

        let mapped = map_to_page(rendered, native, Placement::new(50.0, 50.0), mark).unwrap();

        assert!((mapped.x - 51.0).abs() < 0.0001);
        assert!((mapped.y - 692.5).abs() < 0.0001);
        assert_eq!(mapped.width, 100.0);
        assert_eq!(mapped.height, 50.0);
    }

    #[test]
    fn test_mapping_is_repeatable() {
        let rendered = Size::new(612.0, 792.0);
        let native = Size::new(612.0, 792.0);
        let placement = Placement::new(123.4, 56.7);
        let mark = Size::new(80.0, 40.0);

        let first = map_to_page(rendered, native, placement, mark);
        let second = map_to_page(rendered, native, placement, mark);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unrendered_page_is_refused() {
        let native = Size::new(612.0, 792.0);
        let mark = Size::new(100.0, 50.0);

        assert!(map_to_page(Size::new(0.0, 792.0), native, Placement::default(), mark).is_none());
        assert!(map_to_page(Size::new(612.0, 0.0), native, Placement::default(), mark).is_none());
        assert!(map_to_page(Size::default(), native, Placement::default(), mark).is_none());
    }

    #[test]
    fn test_in_bounds_placement_stays_on_page() {
        let rendered = Size::new(595.0, 842.0);
        let native = Size::new(595.0, 842.0);
        let mark = Size::new(120.0, 60.0);

        for step_x in 0..=10 {
            for step_y in 0..=10 {
                let x = (rendered.width - mark.width) * step_x as f64 / 10.0;
                let y = (rendered.height - mark.height) * step_y as f64 / 10.0;
                let mapped = map_to_page(rendered, native, Placement::new(x, y), mark).unwrap();

                assert!(mapped.y >= -0.0001, "y below page: {}", mapped.y);
                assert!(mapped.y <= native.height + 0.0001, "y above page: {}", mapped.y);
                assert!(mapped.x >= 0.0 && mapped.x + mark.width <= native.width + 0.0001);
            }
        }
    }

    #[test]
    fn test_top_left_corner_maps_to_top_of_page() {
        let rendered = Size::new(300.0, 400.0);
        let native = Size::new(612.0, 792.0);
        let mark = Size::new(100.0, 50.0);

        let mapped = map_to_page(rendered, native, Placement::new(0.0, 0.0), mark).unwrap();
        assert_eq!(mapped.x, 0.0);
        assert!((mapped.y - 742.0).abs() < 0.0001);
    }

    #[test]
    fn test_clamp_axis() {
        assert_eq!(clamp_axis(-10.0, 500.0, 100.0), 0.0);
        assert_eq!(clamp_axis(250.0, 500.0, 100.0), 250.0);
        assert_eq!(clamp_axis(450.0, 500.0, 100.0), 400.0);
        // Mark wider than the viewport pins to the origin
        assert_eq!(clamp_axis(30.0, 80.0, 100.0), 0.0);
    }
}
