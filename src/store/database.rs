// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! JSON-document capture database.
//!
//! All tables live in memory behind one lock. A mutation is applied to a
//! draft copy, the draft is written to disk when the database is file-backed,
//! and only then does the draft replace the live tables.

use super::{CaptureStore, RecordStore, StoreError, StoreResult};
use crate::io::serialization;
use crate::models::capture::{
    Capture, CaptureAndRectangle, CaptureAndSpots, CaptureFullInfo, CaptureId, RecordId,
    RectangleRecord, SpotRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    captures: BTreeMap<CaptureId, Capture>,
    #[serde(default)]
    rectangles: BTreeMap<RecordId, RectangleRecord>,
    #[serde(default)]
    spots: BTreeMap<RecordId, SpotRecord>,
    #[serde(default)]
    last_uid: RecordId,
}

impl Tables {
    fn assign_uid(&mut self, uid: RecordId) -> RecordId {
        if uid != 0 {
            self.last_uid = self.last_uid.max(uid);
            return uid;
        }
        self.last_uid += 1;
        self.last_uid
    }

    fn rectangle_of(&self, id: CaptureId) -> Option<RectangleRecord> {
        self.rectangles
            .values()
            .find(|r| r.capture_id == id)
            .cloned()
    }

    fn spots_of(&self, id: CaptureId) -> Vec<SpotRecord> {
        self.spots
            .values()
            .filter(|s| s.capture_id == id)
            .cloned()
            .collect()
    }
}

pub struct Database {
    path: Option<PathBuf>,
    tables: Mutex<Tables>,
}

impl Database {
    /// A database that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Open the document at `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let tables = if path.exists() {
            serialization::import_json(&path)?
        } else {
            log::info!("Creating new capture database at {}", path.display());
            Tables::default()
        };
        Ok(Self {
            path: Some(path),
            tables: Mutex::new(tables),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn captures(&self) -> Vec<Capture> {
        self.read(|t| t.captures.values().cloned().collect())
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // Writers only swap in a complete draft, so the tables are consistent
        // even after a panic elsewhere.
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        f(&self.lock())
    }

    fn transact<T>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        let mut tables = self.lock();
        let mut draft = tables.clone();
        let out = f(&mut draft)?;
        if let Some(path) = &self.path {
            serialization::export_json(&draft, path)?;
        }
        *tables = draft;
        Ok(out)
    }
}

impl CaptureStore for Database {
    fn find_capture(&self, id: CaptureId) -> StoreResult<Option<Capture>> {
        Ok(self.read(|t| t.captures.get(&id).cloned()))
    }

    fn insert_captures(&self, captures: &[Capture]) -> StoreResult<()> {
        self.transact(|t| {
            for capture in captures {
                t.captures.insert(capture.id, capture.clone());
            }
            Ok(())
        })
    }

    fn update_capture(&self, capture: &Capture) -> StoreResult<()> {
        self.transact(|t| match t.captures.get_mut(&capture.id) {
            Some(slot) => {
                *slot = capture.clone();
                Ok(())
            }
            None => Err(StoreError::MissingCapture(capture.id)),
        })
    }

    fn load_capture_with_rectangle(&self, id: CaptureId) -> StoreResult<Option<CaptureAndRectangle>> {
        Ok(self.read(|t| {
            t.captures.get(&id).map(|capture| CaptureAndRectangle {
                capture: capture.clone(),
                rectangle: t.rectangle_of(id),
            })
        }))
    }

    fn load_capture_with_spots(&self, id: CaptureId) -> StoreResult<Option<CaptureAndSpots>> {
        Ok(self.read(|t| {
            t.captures.get(&id).map(|capture| CaptureAndSpots {
                capture: capture.clone(),
                spots: t.spots_of(id),
            })
        }))
    }

    fn load_full_info(&self, id: CaptureId) -> StoreResult<Option<CaptureFullInfo>> {
        Ok(self.read(|t| {
            t.captures.get(&id).map(|capture| CaptureFullInfo {
                capture: capture.clone(),
                rectangle: t.rectangle_of(id),
                spots: t.spots_of(id),
            })
        }))
    }
}

impl RecordStore for Database {
    fn insert_rectangles(&self, rectangles: &[RectangleRecord]) -> StoreResult<Vec<RecordId>> {
        self.transact(|t| {
            let mut ids = Vec::with_capacity(rectangles.len());
            for rect in rectangles {
                if !t.captures.contains_key(&rect.capture_id) {
                    return Err(StoreError::MissingCapture(rect.capture_id));
                }
                let uid = t.assign_uid(rect.uid);
                t.rectangles.insert(uid, RectangleRecord { uid, ..rect.clone() });
                ids.push(uid);
            }
            Ok(ids)
        })
    }

    fn delete_rectangle(&self, rectangle: &RectangleRecord) -> StoreResult<()> {
        if self.read(|t| !t.rectangles.contains_key(&rectangle.uid)) {
            return Ok(());
        }
        self.transact(|t| {
            t.rectangles.remove(&rectangle.uid);
            Ok(())
        })
    }

    fn insert_spots(&self, spots: &[SpotRecord]) -> StoreResult<Vec<RecordId>> {
        self.transact(|t| {
            let mut ids = Vec::with_capacity(spots.len());
            for spot in spots {
                if !t.captures.contains_key(&spot.capture_id) {
                    return Err(StoreError::MissingCapture(spot.capture_id));
                }
                let uid = t.assign_uid(spot.uid);
                t.spots.insert(uid, SpotRecord { uid, ..spot.clone() });
                ids.push(uid);
            }
            Ok(ids)
        })
    }

    fn delete_spots(&self, spots: &[SpotRecord]) -> StoreResult<()> {
        if self.read(|t| !spots.iter().any(|s| t.spots.contains_key(&s.uid))) {
            return Ok(());
        }
        self.transact(|t| {
            for spot in spots {
                t.spots.remove(&spot.uid);
            }
            Ok(())
        })
    }
}
