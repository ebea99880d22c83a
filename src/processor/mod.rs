// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Plate/blob processor contract.
//!
//! The numeric work (corner detection, perspective warp, background fit,
//! blob detection, integration, percentage fitting) lives behind
//! [`PlateProcessor`]. One processor instance is bound to one capture image;
//! [`ProcessorRegistry`] hands out shared handles keyed by that image path.

pub mod registry;

pub use registry::{ProcessorHandle, ProcessorRegistry};

use std::path::Path;

/// Failure reported by a processor implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProcessorError(pub String);

impl ProcessorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Numeric plate processor bound to a single capture image.
///
/// Calls may be slow; callers run them off the interactive thread.
pub trait PlateProcessor: Send {
    /// Best-effort plate corners as flat `x, y` pairs.
    fn detect_plate_corners(&mut self) -> Result<Vec<i32>, ProcessorError>;

    /// Warp the quadrilateral `corners` (TL, TR, BR, BL) after rotating the
    /// source by `orientation` degrees. `Ok(false)` means the warp failed and
    /// may be retried with different corners.
    fn warp_plate(&mut self, corners: &[i32; 8], orientation: u32) -> Result<bool, ProcessorError>;

    fn has_potential_dark_blobs(&mut self) -> Result<bool, ProcessorError>;

    fn fit_background(&mut self, dark_spots: bool) -> Result<(), ProcessorError>;

    /// Detected blobs as flat `(id, x, y, radius)` quadruples.
    fn detect_blobs(&mut self) -> Result<Vec<i32>, ProcessorError>;

    /// Integrate the `(id, x, y, radius)` circles; returns `(id, value)` pairs.
    fn integrate_blobs(
        &mut self,
        coords: &[i32],
        background_margin: f32,
    ) -> Result<Vec<i32>, ProcessorError>;

    /// Fit percentages from `(id, percentage)` references; returns
    /// `(id, percentage)` pairs for every integrated blob.
    fn fit_percentages(&mut self, references: &[f32]) -> Result<Vec<f32>, ProcessorError>;

    /// Release native resources. Called once when the registry closes the key.
    fn close(&mut self) {}
}

/// Creates processors for capture images.
pub trait ProcessorFactory: Send + Sync {
    fn open(&self, image_path: &Path) -> Result<Box<dyn PlateProcessor>, ProcessorError>;
}

impl<F> ProcessorFactory for F
where
    F: Fn(&Path) -> Result<Box<dyn PlateProcessor>, ProcessorError> + Send + Sync,
{
    fn open(&self, image_path: &Path) -> Result<Box<dyn PlateProcessor>, ProcessorError> {
        self(image_path)
    }
}
