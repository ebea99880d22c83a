// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Capture, rectangle and spot persistence.
//!
//! The pipelines only see the [`CaptureStore`] and [`RecordStore`] traits.
//! [`Database`] is the bundled implementation: an in-memory table set that
//! can be backed by a JSON document on disk.

pub mod database;

pub use database::Database;

use crate::models::capture::{
    Capture, CaptureAndRectangle, CaptureAndSpots, CaptureFullInfo, CaptureId, RecordId,
    RectangleRecord, SpotRecord,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("capture {0} does not exist")]
    MissingCapture(CaptureId),

    #[error("store backend failed: {0:#}")]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Capture lookups and updates.
///
/// The `load_*` methods read a capture together with its related records in
/// one consistent snapshot.
pub trait CaptureStore: Send + Sync {
    fn find_capture(&self, id: CaptureId) -> StoreResult<Option<Capture>>;

    /// Insert or replace captures.
    fn insert_captures(&self, captures: &[Capture]) -> StoreResult<()>;

    /// Replace an existing capture. Fails if the id is unknown.
    fn update_capture(&self, capture: &Capture) -> StoreResult<()>;

    fn load_capture_with_rectangle(&self, id: CaptureId) -> StoreResult<Option<CaptureAndRectangle>>;

    fn load_capture_with_spots(&self, id: CaptureId) -> StoreResult<Option<CaptureAndSpots>>;

    fn load_full_info(&self, id: CaptureId) -> StoreResult<Option<CaptureFullInfo>>;
}

/// Rectangle and spot records.
///
/// Inserts are all-or-nothing. Records with `uid == 0` receive a new id;
/// records with a known id replace the stored one. Deleting a record that is
/// not stored is a no-op.
pub trait RecordStore: Send + Sync {
    fn insert_rectangles(&self, rectangles: &[RectangleRecord]) -> StoreResult<Vec<RecordId>>;

    fn delete_rectangle(&self, rectangle: &RectangleRecord) -> StoreResult<()>;

    fn insert_spots(&self, spots: &[SpotRecord]) -> StoreResult<Vec<RecordId>>;

    fn delete_spots(&self, spots: &[SpotRecord]) -> StoreResult<()>;
}

/// Everything a pipeline needs from persistence.
pub trait Store: CaptureStore + RecordStore {}

impl<T: CaptureStore + RecordStore> Store for T {}
