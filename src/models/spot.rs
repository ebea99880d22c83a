// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Editable spot annotations and their flat-array encodings.
//!
//! The plate processor speaks in flat numeric arrays: `(id, x, y, radius)`
//! quadruples for circles, `(id, value)` pairs for integration results and
//! percentages. The helpers here convert between those arrays and
//! [`SpotMap`]. Trailing elements that do not form a full tuple are ignored.

use super::geometry::Circle;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Spot id, unique within one editing session.
pub type SpotId = i32;

/// An editable spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotAnnotation {
    pub circle: Circle,
    pub is_reference: bool,
    pub reference_percentage: Option<i32>,
}

impl SpotAnnotation {
    /// A non-reference spot carrying the placeholder percentage.
    pub fn candidate(circle: Circle, default_percentage: i32) -> Self {
        Self {
            circle,
            is_reference: false,
            reference_percentage: Some(default_percentage),
        }
    }
}

/// All spots of a session, ordered by id.
pub type SpotMap = BTreeMap<SpotId, SpotAnnotation>;

/// Next free id: one past the current maximum, starting at 1.
pub fn next_spot_id(spots: &SpotMap) -> SpotId {
    spots.keys().next_back().copied().unwrap_or(0) + 1
}

/// Number of spots flagged as reference.
pub fn reference_count(spots: &SpotMap) -> usize {
    spots.values().filter(|s| s.is_reference).count()
}

/// Parse `(id, x, y, radius)` quadruples into candidate spots.
pub fn spots_from_quadruples(flat: &[i32], default_percentage: i32) -> SpotMap {
    flat.chunks_exact(4)
        .map(|c| {
            (
                c[0],
                SpotAnnotation::candidate(Circle::new(c[1], c[2], c[3]), default_percentage),
            )
        })
        .collect()
}

/// Encode every spot as an `(id, x, y, radius)` quadruple.
pub fn spots_to_quadruples(spots: &SpotMap) -> Vec<i32> {
    spots
        .iter()
        .flat_map(|(id, s)| [*id, s.circle.x, s.circle.y, s.circle.radius])
        .collect()
}

/// Encode `(id, percentage)` pairs for reference spots that carry a value.
pub fn reference_pairs(spots: &SpotMap) -> Vec<f32> {
    spots
        .iter()
        .filter(|(_, s)| s.is_reference)
        .filter_map(|(id, s)| s.reference_percentage.map(|p| [*id as f32, p as f32]))
        .flatten()
        .collect()
}

/// Decode `(id, integration)` pairs.
pub fn integration_map(flat: &[i32]) -> HashMap<SpotId, i32> {
    flat.chunks_exact(2).map(|c| (c[0], c[1])).collect()
}

/// Decode `(id, percentage)` pairs. Ids arrive as floats and are truncated.
pub fn percentage_map(flat: &[f32]) -> HashMap<SpotId, f32> {
    flat.chunks_exact(2).map(|c| (c[0] as SpotId, c[1])).collect()
}
