// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Capture image files and derived artifacts.
//!
//! Only image headers are read here; pixel work belongs to the plate
//! processor.

use crate::models::capture::{Capture, BLOBS_FILE, WARPED_FILE};
use crate::models::geometry::ImageExtent;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Pixel dimensions of an image file, read from its header.
pub fn image_extent(path: &Path) -> Result<ImageExtent> {
    let (width, height) = image::image_dimensions(path)
        .with_context(|| format!("Failed to read image header of {}", path.display()))?;
    Ok(ImageExtent::new(width, height))
}

/// Location the processor writes the warped plate to.
pub fn warped_path(capture: &Capture) -> Option<PathBuf> {
    capture.directory().map(|dir| dir.join(WARPED_FILE))
}

/// Location the processor writes the background-subtracted plate to.
pub fn blobs_path(capture: &Capture) -> Option<PathBuf> {
    capture.directory().map(|dir| dir.join(BLOBS_FILE))
}

/// Delete a derived artifact. Returns whether a file was removed; a missing
/// file is not an error.
pub fn remove_artifact(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}
