// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric data structures.
//!
//! Source-space values (`Point`, `Circle`, `Quadrilateral`) are integer
//! image pixels in the image's current orientation. View-space values
//! (`ViewPoint`) are floating point screen coordinates.

use serde::{Deserialize, Serialize};

/// A pixel coordinate in source (image) space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A coordinate in view (screen) space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewPoint {
    pub x: f64,
    pub y: f64,
}

impl ViewPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<Point> for ViewPoint {
    fn from(p: Point) -> Self {
        Self::new(p.x as f64, p.y as f64)
    }
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageExtent {
    pub width: u32,
    pub height: u32,
}

impl ImageExtent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions as seen after rotating the image by `orientation` degrees.
    ///
    /// Width and height swap for 90 and 270.
    pub fn oriented(self, orientation: u32) -> Self {
        match orientation % 360 {
            90 | 270 => Self::new(self.height, self.width),
            _ => self,
        }
    }
}

/// One of the four corners of a plate quadrilateral.
///
/// The discriminant is the slot index in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft = 0,
    TopRight = 1,
    BottomRight = 2,
    BottomLeft = 3,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Four plate corners in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl Quadrilateral {
    pub fn new(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// Corners as a list in slot order: TL, TR, BR, BL.
    pub fn to_array(&self) -> [Point; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }

    /// Inverse of [`Quadrilateral::to_array`]; does not re-sort.
    pub fn from_array(points: [Point; 4]) -> Self {
        Self::new(points[0], points[1], points[2], points[3])
    }

    pub fn corner(&self, corner: Corner) -> Point {
        self.to_array()[corner.index()]
    }

    pub fn set_corner(&mut self, corner: Corner, point: Point) {
        match corner {
            Corner::TopLeft => self.top_left = point,
            Corner::TopRight => self.top_right = point,
            Corner::BottomRight => self.bottom_right = point,
            Corner::BottomLeft => self.bottom_left = point,
        }
    }

    /// Flattened `x0,y0,x1,y1,...` layout expected by the plate processor.
    pub fn to_flat(&self) -> [i32; 8] {
        let mut flat = [0; 8];
        for (i, p) in self.to_array().iter().enumerate() {
            flat[2 * i] = p.x;
            flat[2 * i + 1] = p.y;
        }
        flat
    }

    pub fn from_flat(flat: &[i32; 8]) -> Self {
        Self::new(
            Point::new(flat[0], flat[1]),
            Point::new(flat[2], flat[3]),
            Point::new(flat[4], flat[5]),
            Point::new(flat[6], flat[7]),
        )
    }
}

/// A circular spot in source space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
}

impl Circle {
    pub const fn new(x: i32, y: i32, radius: i32) -> Self {
        Self { x, y, radius }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }
}
