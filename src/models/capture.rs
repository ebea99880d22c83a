// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Persisted capture data.
//!
//! A capture is one photographed plate. Registration attaches at most one
//! rectangle to it; quantification attaches any number of spots.

use super::geometry::{Point, Quadrilateral};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of the perspective-corrected plate image.
pub const WARPED_FILE: &str = "warped.png";

/// File name of the background-subtracted plate image.
pub const BLOBS_FILE: &str = "blobs.png";

/// Capture identifier (epoch milliseconds of the photograph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureId(pub i64);

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned record id. Zero means "not yet stored".
pub type RecordId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub id: CaptureId,
    pub path: PathBuf,
    #[serde(default)]
    pub crop_path: Option<PathBuf>,
    #[serde(default)]
    pub background_subtract_path: Option<PathBuf>,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub has_dark_spots: Option<bool>,
}

impl Capture {
    pub fn new(id: CaptureId, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
            crop_path: None,
            background_subtract_path: None,
            agent_name: None,
            has_dark_spots: None,
        }
    }

    /// Directory holding the capture image and its derived artifacts.
    pub fn directory(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// Copy with every derived-processing field reset.
    pub fn without_processing(&self) -> Self {
        Self {
            crop_path: None,
            background_subtract_path: None,
            has_dark_spots: None,
            ..self.clone()
        }
    }
}

/// Persisted plate rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleRecord {
    #[serde(default)]
    pub uid: RecordId,
    pub capture_id: CaptureId,
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
    /// Degrees in `[0, 360)`.
    pub orientation: u32,
}

impl RectangleRecord {
    pub fn new(capture_id: CaptureId, quad: &Quadrilateral, orientation: u32) -> Self {
        Self {
            uid: 0,
            capture_id,
            top_left: quad.top_left,
            top_right: quad.top_right,
            bottom_right: quad.bottom_right,
            bottom_left: quad.bottom_left,
            orientation: orientation % 360,
        }
    }

    pub fn quadrilateral(&self) -> Quadrilateral {
        Quadrilateral::new(
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        )
    }
}

/// Persisted quantified spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotRecord {
    #[serde(default)]
    pub uid: RecordId,
    pub capture_id: CaptureId,
    pub center: Point,
    pub radius: i32,
    pub integration_value: i32,
    pub percentage: f32,
    pub is_reference: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureAndRectangle {
    pub capture: Capture,
    pub rectangle: Option<RectangleRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureAndSpots {
    pub capture: Capture,
    pub spots: Vec<SpotRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureFullInfo {
    pub capture: Capture,
    pub rectangle: Option<RectangleRecord>,
    pub spots: Vec<SpotRecord>,
}
