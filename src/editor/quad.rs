// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Interactive plate corner editor.
//!
//! Holds the four crop corners in source space for the image's current
//! orientation. Touch input arrives in view space and is translated through
//! the active [`ViewTransform`]. A drag moves one corner slot freely; the
//! canonical corner order is restored when the drag ends.

use crate::config::RegistrationConfig;
use crate::models::geometry::{Corner, ImageExtent, Quadrilateral, ViewPoint};
use crate::util::geometry::{
    clamp_quadrilateral, clamp_to_bounds, map_under_rotation, nearest_within,
    normalize_orientation, sort_corners, ViewTransform,
};
use serde::{Deserialize, Serialize};

/// Corner drag state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(Corner),
}

/// Absolute rotation applied to the image for editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rotation {
    /// Accumulated rotation in degrees; may leave `[0, 360)`.
    pub value: i32,
    /// `value` normalized into `[0, 360)`.
    pub orientation: u32,
    /// Step that produced this rotation.
    pub direction: i32,
}

impl Rotation {
    /// Rotation to an absolute value in degrees, with no direction.
    pub fn absolute(value: i32) -> Self {
        Self {
            value,
            orientation: normalize_orientation(value),
            direction: 0,
        }
    }
}

/// Interactive editor for the four plate corners.
pub struct QuadEditor {
    extent: ImageExtent,
    points: Option<Quadrilateral>,
    drag: DragState,
    rotation: Rotation,
    base_rotation: Option<i32>,
    view: ViewTransform,
    view_cache: Option<[ViewPoint; 4]>,
    config: RegistrationConfig,
}

impl QuadEditor {
    /// Editor for an image of `extent` pixels as stored (unrotated).
    pub fn new(extent: ImageExtent, config: RegistrationConfig) -> Self {
        Self {
            extent,
            points: None,
            drag: DragState::Idle,
            rotation: Rotation::default(),
            base_rotation: None,
            view: ViewTransform::identity(),
            view_cache: None,
            config,
        }
    }

    /// Replace the corners, e.g. with a fresh suggestion.
    pub fn set_points(&mut self, quad: Quadrilateral) {
        let clamped = clamp_quadrilateral(&quad, self.oriented_extent());
        self.points = Some(sort_corners(clamped.to_array()));
        self.drag = DragState::Idle;
        self.view_cache = None;
    }

    /// Forget the current corners and any drag in progress.
    pub fn clear_points(&mut self) {
        self.points = None;
        self.drag = DragState::Idle;
        self.view_cache = None;
    }

    /// Current corners, clamped to the bounds of the active orientation.
    pub fn points(&self) -> Option<Quadrilateral> {
        self.points
            .map(|quad| clamp_quadrilateral(&quad, self.oriented_extent()))
    }

    /// Current drag state.
    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    /// Last applied rotation.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Image dimensions in the active orientation.
    pub fn oriented_extent(&self) -> ImageExtent {
        self.extent.oriented(self.rotation.orientation)
    }

    /// Set the view transform used for hit testing and drawing.
    pub fn set_view(&mut self, view: ViewTransform) {
        if self.view != view {
            self.view = view;
            self.view_cache = None;
        }
    }

    /// Current view transform.
    pub fn view(&self) -> ViewTransform {
        self.view
    }

    /// Corner marker radius in view units.
    pub fn marker_radius(&self) -> f64 {
        self.view
            .to_view_length(self.extent.width as f64 * self.config.corner_marker_fraction)
    }

    /// Maximum view distance at which a press grabs a corner.
    pub fn hit_radius(&self) -> f64 {
        self.marker_radius() * self.config.corner_hit_factor
    }

    /// Corner positions in view space, in slot order.
    pub fn corner_positions(&mut self) -> Option<[ViewPoint; 4]> {
        if self.view_cache.is_none() {
            let view = self.view;
            self.view_cache = self.points().map(|quad| quad.to_array().map(|p| view.to_view(p)));
        }
        self.view_cache
    }

    /// Start dragging the corner nearest to `touch`, if one is in reach.
    pub fn press(&mut self, touch: ViewPoint) -> bool {
        let hit_radius = self.hit_radius();
        let Some(positions) = self.corner_positions() else {
            return false;
        };
        let hit = nearest_within(
            Corner::ALL.into_iter().zip(positions),
            touch,
            hit_radius,
        );
        match hit {
            Some(corner) => {
                log::debug!("Grabbed corner {:?}", corner);
                self.drag = DragState::Dragging(corner);
                true
            }
            None => false,
        }
    }

    /// Move the dragged corner to `touch`. Slots are not re-sorted.
    pub fn move_to(&mut self, touch: ViewPoint) -> bool {
        let DragState::Dragging(corner) = self.drag else {
            return false;
        };
        let extent = self.oriented_extent();
        let Some(quad) = self.points.as_mut() else {
            return false;
        };
        let source = self.view.to_source(touch);
        quad.set_corner(corner, clamp_to_bounds(source, extent.width, extent.height));
        self.view_cache = None;
        true
    }

    /// Finish a drag and restore canonical corner order.
    pub fn release(&mut self) -> bool {
        let was_dragging = matches!(self.drag, DragState::Dragging(_));
        self.drag = DragState::Idle;
        if let Some(quad) = self.points() {
            self.points = Some(sort_corners(quad.to_array()));
            self.view_cache = None;
        }
        was_dragging
    }

    /// Record the rotation the image was opened with. Points are not moved.
    pub fn set_base_rotation(&mut self, value: i32) {
        self.base_rotation = Some(value);
        self.rotation = Rotation::absolute(value);
        self.view_cache = None;
    }

    /// Apply a rotation event.
    ///
    /// No-op when `value` equals the current rotation value. Otherwise the
    /// corners are re-projected from the previous oriented extent to the new
    /// one and the view cache is dropped.
    pub fn rotate(&mut self, direction: i32, orientation: u32, value: i32) -> bool {
        if value == self.rotation.value {
            return false;
        }
        let orientation = orientation % 360;
        let from = self.oriented_extent();
        let to = self.extent.oriented(orientation);
        log::debug!(
            "Rotating by {} to {} ({} -> {})",
            direction,
            orientation,
            self.rotation.value,
            value
        );

        if let Some(quad) = self.points {
            let moved = quad
                .to_array()
                .map(|p| map_under_rotation(p, from, to, direction));
            let clamped = clamp_quadrilateral(&Quadrilateral::from_array(moved), to);
            self.points = Some(match self.drag {
                DragState::Idle => sort_corners(clamped.to_array()),
                DragState::Dragging(_) => clamped,
            });
        }

        self.rotation = Rotation {
            value,
            orientation,
            direction,
        };
        self.view_cache = None;
        true
    }

    /// Rotate by a relative step in degrees.
    pub fn rotate_by(&mut self, degrees: i32) -> bool {
        let value = self.rotation.value + degrees;
        self.rotate(degrees, normalize_orientation(value), value)
    }

    /// Rotate 90 degrees counter-clockwise.
    pub fn rotate_left(&mut self) -> bool {
        self.rotate_by(-90)
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate_right(&mut self) -> bool {
        self.rotate_by(90)
    }

    /// Go back to the initial rotation and drop the corners so a fresh
    /// suggestion can be loaded.
    pub fn reset_rotation(&mut self) {
        self.rotation = Rotation::absolute(self.base_rotation.unwrap_or(0));
        self.clear_points();
    }

    /// Orientation to hand to the warp: the rotation applied on top of the
    /// initial one.
    pub fn warp_orientation(&self) -> u32 {
        normalize_orientation(self.rotation.orientation as i32 - self.base_rotation.unwrap_or(0))
    }
}
