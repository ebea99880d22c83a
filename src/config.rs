// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Tunable parameters for editors and pipelines.
//!
//! Every field has a default, so a config file only needs to list what it
//! changes. Files are YAML or JSON depending on their extension.

use crate::io::serialization;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Warp attempts before giving up, including the first one.
    pub max_warp_attempts: u32,
    /// Corner marker radius as a fraction of the source image width.
    pub corner_marker_fraction: f64,
    /// Hit radius for corners, in multiples of the marker radius.
    pub corner_hit_factor: f64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_warp_attempts: 32,
            corner_marker_fraction: 0.025,
            corner_hit_factor: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantificationConfig {
    /// Relative background margin passed to blob integration.
    pub background_margin: f32,
    /// Placeholder percentage for newly created spots.
    pub default_reference_percentage: i32,
    /// Reference spots required before integration may run.
    pub min_references: usize,
    /// Hit radius for spots, in multiples of the default spot radius.
    pub spot_hit_factor: f64,
}

impl Default for QuantificationConfig {
    fn default() -> Self {
        Self {
            background_margin: 0.15,
            default_reference_percentage: 100,
            min_references: 2,
            spot_hit_factor: 1.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_path: PathBuf,
    pub registration: RegistrationConfig,
    pub quantification: QuantificationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("tlceval.json"),
            registration: RegistrationConfig::default(),
            quantification: QuantificationConfig::default(),
        }
    }
}

impl Config {
    /// Load from a YAML or JSON file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config = serialization::import(path)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
