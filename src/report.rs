// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Capture report for display and export.
//!
//! A report flattens a capture, its rectangle and its quantified spots into
//! one serializable document.

use crate::models::capture::{CaptureFullInfo, RectangleRecord, SpotRecord};
use crate::models::geometry::Point;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;

/// One measured spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotReport {
    pub center: Point,
    pub radius: i32,
    pub integration_value: i32,
    pub percentage: f32,
    pub is_reference: bool,
}

impl From<&SpotRecord> for SpotReport {
    fn from(spot: &SpotRecord) -> Self {
        Self {
            center: spot.center,
            radius: spot.radius,
            integration_value: spot.integration_value,
            percentage: spot.percentage,
            is_reference: spot.is_reference,
        }
    }
}

/// Complete capture data for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureReport {
    pub id: i64,
    /// Capture time, derived from the id.
    pub captured_at: Option<DateTime<Utc>>,
    pub image: PathBuf,
    pub crop: Option<PathBuf>,
    pub background: Option<PathBuf>,
    pub agent_name: Option<String>,
    pub has_dark_spots: Option<bool>,
    pub rectangle: Option<RectangleRecord>,
    /// Spots ordered left to right.
    pub spots: Vec<SpotReport>,
}

impl CaptureReport {
    pub fn new(info: &CaptureFullInfo) -> Self {
        let capture = &info.capture;
        let mut spots: Vec<SpotReport> = info.spots.iter().map(SpotReport::from).collect();
        spots.sort_by_key(|s| s.center.x);
        Self {
            id: capture.id.0,
            captured_at: DateTime::<Utc>::from_timestamp_millis(capture.id.0),
            image: capture.path.clone(),
            crop: capture.crop_path.clone(),
            background: capture.background_subtract_path.clone(),
            agent_name: capture.agent_name.clone(),
            has_dark_spots: capture.has_dark_spots,
            rectangle: info.rectangle.clone(),
            spots,
        }
    }

    /// Human-readable summary.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Capture {}", self.id);
        if let Some(at) = self.captured_at {
            let _ = writeln!(out, "  taken:      {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        let _ = writeln!(out, "  image:      {}", self.image.display());
        if let Some(name) = &self.agent_name {
            let _ = writeln!(out, "  agent:      {}", name);
        }
        if let Some(crop) = &self.crop {
            let _ = writeln!(out, "  crop:       {}", crop.display());
        }
        if let Some(background) = &self.background {
            let _ = writeln!(out, "  background: {}", background.display());
        }
        if let Some(rect) = &self.rectangle {
            let _ = writeln!(
                out,
                "  rectangle:  ({}, {}) ({}, {}) ({}, {}) ({}, {}) @ {} deg",
                rect.top_left.x,
                rect.top_left.y,
                rect.top_right.x,
                rect.top_right.y,
                rect.bottom_right.x,
                rect.bottom_right.y,
                rect.bottom_left.x,
                rect.bottom_left.y,
                rect.orientation
            );
        }
        if self.spots.is_empty() {
            let _ = writeln!(out, "  no spots");
            return out;
        }
        let _ = writeln!(out, "  spots:");
        for (i, spot) in self.spots.iter().enumerate() {
            let _ = writeln!(
                out,
                "    {:>2}  ({:>4}, {:>4}) r={:<3} integration={:<8} {:>6.2}%{}",
                i + 1,
                spot.center.x,
                spot.center.y,
                spot.radius,
                spot.integration_value,
                spot.percentage,
                if spot.is_reference { "  ref" } else { "" }
            );
        }
        out
    }
}
