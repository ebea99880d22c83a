// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Interactive spot editor.
//!
//! The spot map is an [`Observable`] shared with the quantification
//! pipeline: detection publishes into it and integration reads from it.
//! Every edit swaps in a new snapshot.

use crate::config::QuantificationConfig;
use crate::editor::observable::Observable;
use crate::editor::selection::Selection;
use crate::error::{Error, Result};
use crate::models::geometry::{Circle, ImageExtent, Point, ViewPoint};
use crate::models::spot::{self, SpotAnnotation, SpotId, SpotMap};
use crate::util::geometry::{clamp_to_bounds, nearest_within, ViewTransform};

/// Screen density used when none is reported.
pub const BASELINE_DENSITY: i32 = 160;

/// Spot radii derived from the display density, in view pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpotSizing {
    pub stroke_width: i32,
    pub min_radius: i32,
    pub max_radius: i32,
    pub default_radius: i32,
}

impl SpotSizing {
    /// Sizes for a display with `density` dots per inch.
    pub fn from_density(density: i32) -> Self {
        let min_radius = density / 20;
        let max_radius = density / 2;
        Self {
            stroke_width: density / 100,
            min_radius,
            max_radius,
            default_radius: (max_radius - min_radius) / 2 + min_radius,
        }
    }

    /// Radius for a slider position in `[0, 1]`. Out of range yields `None`.
    pub fn radius_from_slider(&self, value: f64) -> Option<i32> {
        if !(0.0..=1.0).contains(&value) {
            return None;
        }
        let range = (self.max_radius - self.min_radius) as f64;
        Some((range * value) as i32 + self.min_radius)
    }

    /// Slider position in `0..=1` for `radius`.
    pub fn slider_from_radius(&self, radius: i32) -> f64 {
        let range = self.max_radius - self.min_radius;
        if range == 0 {
            return 0.0;
        }
        (radius - self.min_radius) as f64 / range as f64
    }
}

impl Default for SpotSizing {
    fn default() -> Self {
        Self::from_density(BASELINE_DENSITY)
    }
}

/// Interactive editor for the spot map of one capture.
pub struct BlobEditor {
    spots: Observable<SpotMap>,
    selection: Observable<Selection<SpotId>>,
    sizing: SpotSizing,
    bounds: Option<ImageExtent>,
    view: ViewTransform,
    config: QuantificationConfig,
}

impl BlobEditor {
    /// Editor over `spots`, with nothing selected.
    pub fn new(spots: Observable<SpotMap>, config: QuantificationConfig) -> Self {
        Self {
            spots,
            selection: Observable::default(),
            sizing: SpotSizing::default(),
            bounds: None,
            view: ViewTransform::identity(),
            config,
        }
    }

    /// Shared spot map.
    pub fn spots(&self) -> Observable<SpotMap> {
        self.spots.clone()
    }

    /// Shared selection.
    pub fn selection(&self) -> Observable<Selection<SpotId>> {
        self.selection.clone()
    }

    /// Current spot sizes.
    pub fn sizing(&self) -> SpotSizing {
        self.sizing
    }

    /// Recompute spot sizes for a display density.
    pub fn set_density(&mut self, density: i32) {
        self.sizing = SpotSizing::from_density(density);
    }

    /// Image bounds in the displayed orientation. Spot centers are clamped
    /// to them once known.
    pub fn set_bounds(&mut self, bounds: ImageExtent) {
        self.bounds = Some(bounds);
    }

    /// Set the view transform used for hit testing.
    pub fn set_view(&mut self, view: ViewTransform) {
        self.view = view;
    }

    /// Select `id` if it exists. Returns whether the selection changed.
    pub fn select_blob(&self, id: SpotId) -> bool {
        if !self.spots.get().contains_key(&id) {
            log::debug!("Ignoring selection of unknown spot {}", id);
            return false;
        }
        self.selection.update(|current| {
            (*current != Selection::Selected(id)).then_some(Selection::Selected(id))
        })
    }

    /// Clear the selection.
    pub fn deselect_blob(&self) -> bool {
        self.selection
            .update(|current| current.is_selected().then_some(Selection::NotSelected))
    }

    /// Move the selected spot's center.
    pub fn move_blob(&self, x: i32, y: i32) -> bool {
        let center = self.clamp(Point::new(x, y));
        self.edit_selected(|spot| {
            if spot.circle.center() == center {
                return false;
            }
            spot.circle.x = center.x;
            spot.circle.y = center.y;
            true
        })
    }

    /// Change the selected spot's radius. Non-positive radii are rejected.
    pub fn alter_radius(&self, radius: i32) -> Result<bool> {
        if radius <= 0 {
            return Err(Error::InvalidGeometry(format!(
                "spot radius must be positive, got {}",
                radius
            )));
        }
        Ok(self.edit_selected(|spot| {
            if spot.circle.radius == radius {
                return false;
            }
            spot.circle.radius = radius;
            true
        }))
    }

    /// Resize the selected spot from a slider position in `0..=1`.
    pub fn alter_radius_from_slider(&self, value: f64) -> Result<bool> {
        let radius = self.sizing.radius_from_slider(value).ok_or_else(|| {
            Error::InvalidGeometry(format!("slider value {} outside [0, 1]", value))
        })?;
        self.alter_radius(radius)
    }

    /// Insert a new candidate spot and select it.
    pub fn add_blob(&self, x: i32, y: i32, radius: i32) -> Result<SpotId> {
        if radius <= 0 {
            return Err(Error::InvalidGeometry(format!(
                "spot radius must be positive, got {}",
                radius
            )));
        }
        let center = self.clamp(Point::new(x, y));
        let default_percentage = self.config.default_reference_percentage;
        let mut id = 0;
        self.spots.update(|spots| {
            let mut next = spots.clone();
            id = spot::next_spot_id(spots);
            next.insert(
                id,
                SpotAnnotation::candidate(
                    Circle::new(center.x, center.y, radius),
                    default_percentage,
                ),
            );
            Some(next)
        });
        log::debug!("Added spot {} at ({}, {}) r={}", id, center.x, center.y, radius);
        self.selection.set(Selection::Selected(id));
        Ok(id)
    }

    /// Add a default-sized spot in the middle of the image.
    pub fn add_blob_centered(&self) -> Result<SpotId> {
        let bounds = self
            .bounds
            .ok_or_else(|| Error::InvalidGeometry("image bounds are not known yet".into()))?;
        self.add_blob(
            bounds.width as i32 / 2,
            bounds.height as i32 / 2,
            self.sizing.default_radius,
        )
    }

    /// Remove the selected spot and clear the selection.
    pub fn delete_blob(&self) -> bool {
        let Some(id) = self.selected_id() else {
            return false;
        };
        self.spots.update(|spots| {
            let mut next = spots.clone();
            next.remove(&id);
            Some(next)
        });
        self.selection.set(Selection::NotSelected);
        log::debug!("Deleted spot {}", id);
        true
    }

    /// Flip the reference flag of the selected spot.
    pub fn toggle_reference_value(&self) -> bool {
        self.edit_selected(|spot| {
            spot.is_reference = !spot.is_reference;
            true
        })
    }

    /// Set the reference percentage of the selected spot.
    pub fn set_reference_value(&self, value: Option<i32>) -> bool {
        self.edit_selected(|spot| {
            if spot.reference_percentage == value {
                return false;
            }
            spot.reference_percentage = value;
            true
        })
    }

    /// Selected spot with its id.
    pub fn selected_blob(&self) -> Option<(SpotId, SpotAnnotation)> {
        let id = self.selection.get().id()?;
        self.spots.get().get(&id).map(|spot| (id, *spot))
    }

    /// Whether the selected spot is a reference.
    pub fn selected_is_reference(&self) -> bool {
        self.selected_blob()
            .is_some_and(|(_, spot)| spot.is_reference)
    }

    /// Reference percentage of the selected spot.
    pub fn selected_reference_value(&self) -> Option<i32> {
        self.selected_blob()
            .and_then(|(_, spot)| spot.reference_percentage)
    }

    /// Reference spots only.
    pub fn references(&self) -> SpotMap {
        self.spots
            .get()
            .iter()
            .filter(|(_, spot)| spot.is_reference)
            .map(|(id, spot)| (*id, *spot))
            .collect()
    }

    /// Number of reference spots.
    pub fn reference_count(&self) -> usize {
        spot::reference_count(&self.spots.get())
    }

    /// Whether integration may run.
    pub fn enough_references(&self) -> bool {
        self.reference_count() >= self.config.min_references
    }

    /// Remove every spot and clear the selection.
    pub fn clear_spots(&self) {
        self.spots.set(SpotMap::new());
        self.selection.set(Selection::NotSelected);
    }

    /// Touch reach around a spot center, in view units.
    pub fn hit_radius(&self) -> f64 {
        self.sizing.default_radius as f64 * self.config.spot_hit_factor
    }

    /// Spot whose projected center is nearest to `touch`, within reach.
    pub fn hit_test(&self, touch: ViewPoint) -> Option<SpotId> {
        let spots = self.spots.get();
        nearest_within(
            spots
                .iter()
                .map(|(id, spot)| (*id, self.view.to_view(spot.circle.center()))),
            touch,
            self.hit_radius(),
        )
    }

    /// Select the spot under `touch`, or deselect on a miss.
    pub fn press(&self, touch: ViewPoint) -> Selection<SpotId> {
        match self.hit_test(touch) {
            Some(id) => {
                self.select_blob(id);
            }
            None => {
                self.deselect_blob();
            }
        }
        *self.selection.get()
    }

    /// Drag the selected spot to `touch`. Only moves when the spot nearest
    /// to the touch in source space is the selected one.
    pub fn drag_to(&self, touch: ViewPoint) -> bool {
        let Some(selected) = self.selected_id() else {
            return false;
        };
        let source = self.view.to_source(touch);
        let reach = self.hit_radius() / self.view.scale;
        let spots = self.spots.get();
        let nearest = nearest_within(
            spots
                .iter()
                .map(|(id, spot)| (*id, ViewPoint::from(spot.circle.center()))),
            ViewPoint::from(source),
            reach,
        );
        if nearest != Some(selected) {
            return false;
        }
        self.move_blob(source.x, source.y)
    }

    fn selected_id(&self) -> Option<SpotId> {
        let id = self.selection.get().id()?;
        self.spots.get().contains_key(&id).then_some(id)
    }

    fn clamp(&self, point: Point) -> Point {
        match self.bounds {
            Some(bounds) => clamp_to_bounds(point, bounds.width, bounds.height),
            None => point,
        }
    }

    /// Apply `edit` to a copy of the selected spot; publishes only when the
    /// closure reports a change.
    fn edit_selected(&self, edit: impl FnOnce(&mut SpotAnnotation) -> bool) -> bool {
        let Some(id) = self.selected_id() else {
            return false;
        };
        self.spots.update(|spots| {
            let mut spot = *spots.get(&id)?;
            if !edit(&mut spot) {
                return None;
            }
            let mut next = spots.clone();
            next.insert(id, spot);
            Some(next)
        })
    }
}
