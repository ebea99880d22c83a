// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the pure geometry used by the editors: view/source
//! coordinate transformations, canonical corner ordering, nearest-point hit
//! testing, bounds clamping and re-projection under image rotation.

use crate::models::geometry::{ImageExtent, Point, Quadrilateral, ViewPoint};

/// Euclidean distance between two view-space points.
pub fn distance(a: ViewPoint, b: ViewPoint) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Key of the candidate closest to `target`, if it lies within `max_distance`.
///
/// On equal distances the earlier candidate wins.
pub fn nearest_within<K, I>(candidates: I, target: ViewPoint, max_distance: f64) -> Option<K>
where
    I: IntoIterator<Item = (K, ViewPoint)>,
{
    let mut best: Option<(K, f64)> = None;
    for (key, point) in candidates {
        let d = distance(point, target);
        if d > max_distance {
            continue;
        }
        match best {
            Some((_, best_d)) if best_d <= d => {}
            _ => best = Some((key, d)),
        }
    }
    best.map(|(key, _)| key)
}

/// Canonical corner order.
///
/// The two smallest-y points form the top edge, the two largest-y points the
/// bottom edge; within each edge the smaller x is left. The y sort is stable,
/// so collinear input keeps its input order on ties.
pub fn sort_corners(points: [Point; 4]) -> Quadrilateral {
    let mut by_y = points;
    by_y.sort_by_key(|p| p.y);

    let (top_left, top_right) = if by_y[0].x > by_y[1].x {
        (by_y[1], by_y[0])
    } else {
        (by_y[0], by_y[1])
    };
    let (bottom_left, bottom_right) = if by_y[2].x > by_y[3].x {
        (by_y[3], by_y[2])
    } else {
        (by_y[2], by_y[3])
    };

    Quadrilateral::new(top_left, top_right, bottom_right, bottom_left)
}

/// Clamp each component into `[0, dim - 1]`.
pub fn clamp_to_bounds(point: Point, width: u32, height: u32) -> Point {
    let max_x = (width as i64 - 1).max(0) as i32;
    let max_y = (height as i64 - 1).max(0) as i32;
    Point::new(point.x.clamp(0, max_x), point.y.clamp(0, max_y))
}

/// Clamp all four corners of a quadrilateral without re-ordering them.
pub fn clamp_quadrilateral(quad: &Quadrilateral, extent: ImageExtent) -> Quadrilateral {
    Quadrilateral::from_array(
        quad.to_array()
            .map(|p| clamp_to_bounds(p, extent.width, extent.height)),
    )
}

/// Re-project a point when the image it lives on is rotated.
///
/// Translates the center of `from` to the origin, rotates by
/// `rotation_degrees` (clockwise on screen, y pointing down) and translates
/// to the center of `to`.
pub fn map_under_rotation(
    point: Point,
    from: ImageExtent,
    to: ImageExtent,
    rotation_degrees: i32,
) -> Point {
    let dx = point.x as f64 - from.width as f64 / 2.0;
    let dy = point.y as f64 - from.height as f64 / 2.0;

    let (sin, cos) = (rotation_degrees as f64).to_radians().sin_cos();
    let rx = dx * cos - dy * sin;
    let ry = dx * sin + dy * cos;

    Point::new(
        (rx + to.width as f64 / 2.0).round() as i32,
        (ry + to.height as f64 / 2.0).round() as i32,
    )
}

/// Normalize an absolute rotation into an orientation in `[0, 360)`.
pub fn normalize_orientation(rotation: i32) -> u32 {
    rotation.rem_euclid(360) as u32
}

/// Uniform scale plus offset mapping source pixels to view coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub offset: ViewPoint,
}

impl ViewTransform {
    /// Transform with an explicit scale and offset.
    pub fn new(scale: f64, offset: ViewPoint) -> Self {
        Self { scale, offset }
    }

    /// Source coordinates are view coordinates.
    pub fn identity() -> Self {
        Self::new(1.0, ViewPoint::default())
    }

    /// Fit an image into the available view area, preserving aspect ratio and
    /// centering it.
    pub fn fit(image: ImageExtent, available_width: f64, available_height: f64) -> Self {
        if image.width == 0 || image.height == 0 {
            return Self::identity();
        }
        let img_aspect = image.width as f64 / image.height as f64;
        let available_aspect = available_width / available_height;

        let (display_width, display_height) = if img_aspect > available_aspect {
            // Image is wider - fit to width
            (available_width, available_width / img_aspect)
        } else {
            // Image is taller - fit to height
            (available_height * img_aspect, available_height)
        };

        Self::new(
            display_width / image.width as f64,
            ViewPoint::new(
                (available_width - display_width) / 2.0,
                (available_height - display_height) / 2.0,
            ),
        )
    }

    /// Project a source pixel into view space.
    pub fn to_view(&self, point: Point) -> ViewPoint {
        ViewPoint::new(
            self.offset.x + point.x as f64 * self.scale,
            self.offset.y + point.y as f64 * self.scale,
        )
    }

    /// Map a view point back to the nearest source pixel.
    pub fn to_source(&self, point: ViewPoint) -> Point {
        Point::new(
            ((point.x - self.offset.x) / self.scale).round() as i32,
            ((point.y - self.offset.y) / self.scale).round() as i32,
        )
    }

    /// Convert a source-space length into view units.
    pub fn to_view_length(&self, length: f64) -> f64 {
        length * self.scale
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    const SHAPES: [[Point; 4]; 5] = [
        [
            Point::new(10, 10),
            Point::new(200, 10),
            Point::new(200, 200),
            Point::new(10, 200),
        ],
        [
            Point::new(200, 200),
            Point::new(10, 10),
            Point::new(10, 200),
            Point::new(200, 10),
        ],
        [
            Point::new(35, 12),
            Point::new(310, 40),
            Point::new(290, 260),
            Point::new(20, 230),
        ],
        [
            Point::new(5, 5),
            Point::new(5, 5),
            Point::new(5, 5),
            Point::new(5, 5),
        ],
        [
            Point::new(0, 50),
            Point::new(10, 50),
            Point::new(20, 50),
            Point::new(30, 50),
        ],
    ];

    #[test]
    fn test_sort_corners_scrambled_square() {
        let quad = sort_corners([p(200, 200), p(10, 200), p(200, 10), p(10, 10)]);
        assert_eq!(quad.top_left, p(10, 10));
        assert_eq!(quad.top_right, p(200, 10));
        assert_eq!(quad.bottom_right, p(200, 200));
        assert_eq!(quad.bottom_left, p(10, 200));
    }

    #[test]
    fn test_sort_corners_is_idempotent() {
        for shape in SHAPES {
            let once = sort_corners(shape);
            let twice = sort_corners(once.to_array());
            assert_eq!(once, twice, "shape {:?}", shape);
        }
    }

    #[test]
    fn test_sort_corners_ordering_law_on_convex_input() {
        for shape in &SHAPES[..3] {
            let quad = sort_corners(*shape);
            assert!(quad.top_left.y <= quad.bottom_left.y);
            assert!(quad.top_right.y <= quad.bottom_right.y);
            assert!(quad.top_left.x <= quad.top_right.x);
            assert!(quad.bottom_left.x <= quad.bottom_right.x);
        }
    }

    #[test]
    fn test_sort_corners_collinear_keeps_stable_order() {
        let quad = sort_corners([p(30, 50), p(0, 50), p(20, 50), p(10, 50)]);
        // Stable y-sort keeps input order; each pair is then ordered by x.
        assert_eq!(quad.top_left, p(0, 50));
        assert_eq!(quad.top_right, p(30, 50));
        assert_eq!(quad.bottom_left, p(10, 50));
        assert_eq!(quad.bottom_right, p(20, 50));
    }

    #[test]
    fn test_clamp_to_bounds() {
        assert_eq!(clamp_to_bounds(p(-5, 700), 640, 480), p(0, 479));
        assert_eq!(clamp_to_bounds(p(640, -1), 640, 480), p(639, 0));
        assert_eq!(clamp_to_bounds(p(12, 34), 640, 480), p(12, 34));
        assert_eq!(clamp_to_bounds(p(3, 3), 0, 0), p(0, 0));
    }

    #[test]
    fn test_clamp_is_idempotent_and_in_range() {
        for x in [-1000, -1, 0, 1, 319, 639, 640, 5000] {
            for y in [-3, 0, 240, 479, 480, 9999] {
                let once = clamp_to_bounds(p(x, y), 640, 480);
                assert_eq!(clamp_to_bounds(once, 640, 480), once);
                assert!((0..640).contains(&once.x));
                assert!((0..480).contains(&once.y));
            }
        }
    }

    #[test]
    fn test_rotation_by_zero_is_identity() {
        let extent = ImageExtent::new(640, 480);
        for shape in SHAPES {
            for point in shape {
                assert_eq!(map_under_rotation(point, extent, extent, 0), point);
            }
        }
    }

    #[test]
    fn test_quarter_turn_moves_top_left_to_top_right() {
        let from = ImageExtent::new(640, 480);
        let to = from.oriented(90);
        assert_eq!(map_under_rotation(p(0, 0), from, to, 90), p(480, 0));
        assert_eq!(map_under_rotation(p(100, 40), from, to, 90), p(440, 100));
    }

    #[test]
    fn test_quarter_turn_round_trip() {
        let from = ImageExtent::new(641, 479);
        let to = from.oriented(90);
        for point in SHAPES[2] {
            let there = map_under_rotation(point, from, to, 90);
            let back = map_under_rotation(there, to, from, -90);
            assert_eq!(back, point);
        }
    }

    #[test]
    fn test_half_turn() {
        let extent = ImageExtent::new(100, 50);
        assert_eq!(map_under_rotation(p(10, 5), extent, extent, 180), p(90, 45));
    }

    #[test]
    fn test_normalize_orientation() {
        assert_eq!(normalize_orientation(0), 0);
        assert_eq!(normalize_orientation(-90), 270);
        assert_eq!(normalize_orientation(450), 90);
        assert_eq!(normalize_orientation(-360), 0);
    }

    #[test]
    fn test_nearest_within_threshold() {
        let candidates = vec![
            (0, ViewPoint::new(0.0, 0.0)),
            (1, ViewPoint::new(10.0, 0.0)),
            (2, ViewPoint::new(100.0, 100.0)),
        ];
        let target = ViewPoint::new(8.0, 1.0);
        assert_eq!(nearest_within(candidates.clone(), target, 5.0), Some(1));
        assert_eq!(nearest_within(candidates, ViewPoint::new(50.0, 50.0), 5.0), None);
    }

    #[test]
    fn test_fit_letterboxes_wide_image() {
        let t = ViewTransform::fit(ImageExtent::new(200, 100), 400.0, 400.0);
        assert!((t.scale - 2.0).abs() < 1e-9);
        assert!((t.offset.y - 100.0).abs() < 1e-9);
        assert_eq!(t.offset.x, 0.0);
        assert_eq!(t.to_source(t.to_view(p(37, 81))), p(37, 81));
    }

    #[test]
    fn test_fit_pillarboxes_tall_image() {
        let t = ViewTransform::fit(ImageExtent::new(100, 200), 400.0, 200.0);
        assert!((t.scale - 1.0).abs() < 1e-9);
        assert!((t.offset.x - 150.0).abs() < 1e-9);
        assert_eq!(t.to_view(p(0, 0)), ViewPoint::new(150.0, 0.0));
    }
}
