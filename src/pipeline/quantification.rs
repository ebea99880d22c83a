// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Spot quantification: background fit, blob detection, integration,
//! percentage fitting and persistence of the measured spots.
//!
//! The editable spot map is an [`Observable`] shared with the
//! [`BlobEditor`]: detection publishes into it, integration reads the
//! latest snapshot.

use super::flight::SingleFlight;
use super::worker::{self, Pending};
use crate::config::QuantificationConfig;
use crate::editor::blob::BlobEditor;
use crate::editor::observable::Observable;
use crate::error::{Error, Result};
use crate::io::media;
use crate::models::capture::{Capture, CaptureId, SpotRecord, WARPED_FILE};
use crate::models::geometry::{Circle, Point};
use crate::models::spot::{self, SpotAnnotation, SpotMap};
use crate::processor::{ProcessorError, ProcessorHandle, ProcessorRegistry};
use crate::store::Store;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Where a quantification session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantificationPhase {
    #[default]
    Uninitialized,
    Ready,
    Detecting,
    Editing,
    Integrating,
    Done,
    /// Integration or persistence failed after the processor was released.
    Failed,
    Aborted,
}

impl QuantificationPhase {
    /// Lowercase name for logs and errors.
    pub fn as_str(self) -> &'static str {
        match self {
            QuantificationPhase::Uninitialized => "uninitialized",
            QuantificationPhase::Ready => "ready",
            QuantificationPhase::Detecting => "detecting",
            QuantificationPhase::Editing => "editing",
            QuantificationPhase::Integrating => "integrating",
            QuantificationPhase::Done => "done",
            QuantificationPhase::Failed => "failed",
            QuantificationPhase::Aborted => "aborted",
        }
    }
}

struct Session {
    capture: Capture,
    processor: ProcessorHandle,
    retained: Vec<SpotRecord>,
}

/// Spot detection and quantification for one capture.
pub struct QuantificationPipeline {
    capture_id: CaptureId,
    store: Arc<dyn Store>,
    registry: Arc<ProcessorRegistry>,
    config: QuantificationConfig,
    flight: SingleFlight,
    phase: Observable<QuantificationPhase>,
    spots: Observable<SpotMap>,
    image_path: Observable<Option<PathBuf>>,
    background_path: Observable<Option<PathBuf>>,
    session: Mutex<Option<Session>>,
}

impl QuantificationPipeline {
    /// Pipeline for `capture_id`. Nothing is loaded until [`initialize`](Self::initialize).
    pub fn new(
        capture_id: CaptureId,
        store: Arc<dyn Store>,
        registry: Arc<ProcessorRegistry>,
        config: QuantificationConfig,
    ) -> Self {
        Self {
            capture_id,
            store,
            registry,
            config,
            flight: SingleFlight::new(),
            phase: Observable::default(),
            spots: Observable::default(),
            image_path: Observable::default(),
            background_path: Observable::default(),
            session: Mutex::new(None),
        }
    }

    /// Capture this pipeline works on.
    pub fn capture_id(&self) -> CaptureId {
        self.capture_id
    }

    /// Current phase.
    pub fn phase(&self) -> QuantificationPhase {
        *self.phase.get()
    }

    /// Phase changes, for observers.
    pub fn phase_observable(&self) -> Observable<QuantificationPhase> {
        self.phase.clone()
    }

    /// Editable spot map.
    pub fn spots(&self) -> Observable<SpotMap> {
        self.spots.clone()
    }

    /// Warped plate image to display.
    pub fn image_path(&self) -> Observable<Option<PathBuf>> {
        self.image_path.clone()
    }

    /// Background-subtracted plate image, once fitted.
    pub fn background_path(&self) -> Observable<Option<PathBuf>> {
        self.background_path.clone()
    }

    /// Spot editor working on this pipeline's spot map.
    pub fn blob_editor(&self) -> BlobEditor {
        BlobEditor::new(self.spots(), self.config.clone())
    }

    /// Load the capture, take over its stored spots and acquire the
    /// processor for its image.
    pub fn initialize(&self) -> Result<Capture> {
        let _flight = self.flight.try_begin("initialize")?;
        self.expect_phase("initialize", &[QuantificationPhase::Uninitialized])?;

        let joined = self
            .store
            .load_capture_with_spots(self.capture_id)?
            .ok_or(Error::CaptureNotFound(self.capture_id))?;

        let processor = self.registry.get_or_create(&joined.capture.path)?;

        if !joined.spots.is_empty() {
            self.store.delete_spots(&joined.spots)?;
            log::info!(
                "Retained {} previous spots of capture {}",
                joined.spots.len(),
                self.capture_id
            );
        }

        if joined.capture.crop_path.is_some() {
            self.image_path.set(joined.capture.crop_path.clone());
        }

        *self.session() = Some(Session {
            capture: joined.capture.clone(),
            processor,
            retained: joined.spots,
        });
        self.phase.set(QuantificationPhase::Ready);
        log::info!("Quantification of capture {} ready", self.capture_id);
        Ok(joined.capture)
    }

    /// Cached dark-spot flag of the capture, or the processor's guess. The
    /// guess is not stored until detection runs.
    pub fn has_dark_spots(&self) -> Result<bool> {
        let _flight = self.flight.try_begin("dark-spot check")?;
        self.expect_phase(
            "check for dark spots",
            &[QuantificationPhase::Ready, QuantificationPhase::Editing],
        )?;
        let (capture, processor) = self.session_parts("check for dark spots")?;
        if let Some(dark) = capture.has_dark_spots {
            return Ok(dark);
        }
        let dark = processor.lock().has_potential_dark_blobs()?;
        log::debug!("Processor suggests dark spots: {}", dark);
        Ok(dark)
    }

    /// Fit the background and publish the editable spot map.
    ///
    /// Retained spots are republished ordered by x and numbered from 1.
    /// Otherwise detected blobs become candidates, unless the map already
    /// holds spots, in which case nothing happens.
    pub fn detect_spots(&self, dark_spots: bool) -> Result<Arc<SpotMap>> {
        let _flight = self.flight.try_begin("detect")?;
        let previous = self.phase();
        self.expect_phase(
            "detect",
            &[QuantificationPhase::Ready, QuantificationPhase::Editing],
        )?;

        self.phase.set(QuantificationPhase::Detecting);
        match self.run_detection(dark_spots) {
            Ok(()) => {
                self.phase.set(QuantificationPhase::Editing);
                Ok(self.spots.get())
            }
            Err(e) => {
                self.phase.set(previous);
                Err(e)
            }
        }
    }

    fn run_detection(&self, dark_spots: bool) -> Result<()> {
        let (capture, processor, retained) = {
            let session = self.session();
            let session = session.as_ref().ok_or(Error::InvalidPhase {
                operation: "detect",
                phase: QuantificationPhase::Uninitialized.as_str(),
            })?;
            (
                session.capture.clone(),
                session.processor.clone(),
                session.retained.clone(),
            )
        };

        if !retained.is_empty() {
            log::debug!("Reusing {} retained spots", retained.len());
            let mut processor = processor.lock();
            processor.fit_background(dark_spots)?;
            self.spots.set(reuse_spots(&retained));
            // Detection keeps the processor's blob state in step; the result
            // is not used.
            processor.detect_blobs()?;
            self.background_path
                .set(capture.background_subtract_path.clone());
            return Ok(());
        }

        if !self.spots.get().is_empty() {
            log::debug!("Spots already detected, skipping detection");
            return Ok(());
        }

        let blobs_path = media::blobs_path(&capture)
            .ok_or_else(|| Error::CaptureDirectoryUnresolvable(capture.path.clone()))?;

        let detected = {
            let mut processor = processor.lock();
            processor.fit_background(dark_spots)?;
            processor.detect_blobs()?
        };
        let candidates =
            spot::spots_from_quadruples(&detected, self.config.default_reference_percentage);
        log::info!("Detected {} spots", candidates.len());

        let updated = Capture {
            background_subtract_path: Some(blobs_path),
            has_dark_spots: Some(dark_spots),
            ..capture
        };
        self.store.update_capture(&updated)?;
        self.spots.set(candidates);
        self.background_path
            .set(updated.background_subtract_path.clone());
        if let Some(session) = self.session().as_mut() {
            session.capture = updated;
        }
        Ok(())
    }

    /// Integrate every spot, fit percentages from the reference spots and
    /// store the results. The processor is released afterwards whether or
    /// not this succeeds.
    pub fn integrate_and_fit_percentages(&self) -> Result<Vec<SpotRecord>> {
        let _flight = self.flight.try_begin("integrate")?;
        self.expect_phase(
            "integrate",
            &[QuantificationPhase::Ready, QuantificationPhase::Editing],
        )?;

        let spots = self.spots.get();
        let found = spot::reference_count(&spots);
        if found < self.config.min_references {
            return Err(Error::NotEnoughReferences {
                found,
                required: self.config.min_references,
            });
        }
        if spots.is_empty() {
            log::debug!("No spots to integrate");
            return Ok(Vec::new());
        }

        let (capture, processor) = self.session_parts("integrate")?;
        self.phase.set(QuantificationPhase::Integrating);
        let result = self.integrate(&capture, &processor, &spots);

        drop(processor);
        self.registry.close(&capture.path);

        match result {
            Ok(records) => {
                self.phase.set(QuantificationPhase::Done);
                log::info!(
                    "Stored {} quantified spots for capture {}",
                    records.len(),
                    self.capture_id
                );
                Ok(records)
            }
            Err(e) => {
                self.phase.set(QuantificationPhase::Failed);
                log::error!("Quantification of capture {} failed: {}", self.capture_id, e);
                Err(e)
            }
        }
    }

    fn integrate(
        &self,
        capture: &Capture,
        processor: &ProcessorHandle,
        spots: &SpotMap,
    ) -> Result<Vec<SpotRecord>> {
        let coordinates = spot::spots_to_quadruples(spots);
        let references = spot::reference_pairs(spots);
        log::debug!("Coordinates: {:?}", coordinates);
        log::debug!("References: {:?}", references);

        let (integrations, percentages) = {
            let mut processor = processor.lock();
            let integrations =
                processor.integrate_blobs(&coordinates, self.config.background_margin)?;
            let percentages = processor.fit_percentages(&references)?;
            (integrations, percentages)
        };
        let integrations = spot::integration_map(&integrations);
        let percentages = spot::percentage_map(&percentages);

        let mut records = spots
            .iter()
            .map(|(id, annotation)| {
                let integration_value = *integrations.get(id).ok_or_else(|| {
                    ProcessorError::new(format!("no integration value for spot {}", id))
                })?;
                let percentage = *percentages.get(id).ok_or_else(|| {
                    ProcessorError::new(format!("no fitted percentage for spot {}", id))
                })?;
                Ok(SpotRecord {
                    uid: 0,
                    capture_id: capture.id,
                    center: annotation.circle.center(),
                    radius: annotation.circle.radius,
                    integration_value,
                    percentage,
                    is_reference: annotation.is_reference,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let ids = self.store.insert_spots(&records)?;
        for (record, uid) in records.iter_mut().zip(ids) {
            record.uid = uid;
        }
        Ok(records)
    }

    /// Delete the warped image, reset the capture's derived fields, drop the
    /// retained spots and release the processor. Waits for a running
    /// operation to finish. Failures are logged.
    pub fn abort(&self) {
        let _idle = self.flight.wait_idle();

        if let Some(image) = &*self.image_path.get() {
            if let Some(dir) = image.parent() {
                let warped = dir.join(WARPED_FILE);
                match media::remove_artifact(&warped) {
                    Ok(true) => log::debug!("Removed {}", warped.display()),
                    Ok(false) => {}
                    Err(e) => log::warn!("{:#}", e),
                }
            }
        }

        let session = self.session().take();
        if let Some(session) = session {
            if let Err(e) = self.store.update_capture(&session.capture.without_processing()) {
                log::warn!("Failed to reset capture {}: {}", self.capture_id, e);
            }
            if let Err(e) = self.store.delete_spots(&session.retained) {
                log::warn!("Failed to delete retained spots: {}", e);
            }
            drop(session.processor);
            self.registry.close(&session.capture.path);
        }
        self.phase.set(QuantificationPhase::Aborted);
        log::info!("Quantification of capture {} aborted", self.capture_id);
    }

    /// [`initialize`](Self::initialize) on a background thread.
    pub fn spawn_initialize(self: &Arc<Self>) -> Pending<Result<Capture>> {
        let this = Arc::clone(self);
        worker::spawn("quantification-init", move || this.initialize())
    }

    /// [`has_dark_spots`](Self::has_dark_spots) on a background thread.
    pub fn spawn_has_dark_spots(self: &Arc<Self>) -> Pending<Result<bool>> {
        let this = Arc::clone(self);
        worker::spawn("quantification-dark", move || this.has_dark_spots())
    }

    /// [`detect_spots`](Self::detect_spots) on a background thread.
    pub fn spawn_detect_spots(self: &Arc<Self>, dark_spots: bool) -> Pending<Result<Arc<SpotMap>>> {
        let this = Arc::clone(self);
        worker::spawn("quantification-detect", move || this.detect_spots(dark_spots))
    }

    /// [`integrate_and_fit_percentages`](Self::integrate_and_fit_percentages) on a background thread.
    pub fn spawn_integrate(self: &Arc<Self>) -> Pending<Result<Vec<SpotRecord>>> {
        let this = Arc::clone(self);
        worker::spawn("quantification-integrate", move || {
            this.integrate_and_fit_percentages()
        })
    }

    fn session_parts(&self, operation: &'static str) -> Result<(Capture, ProcessorHandle)> {
        let session = self.session();
        let session = session.as_ref().ok_or(Error::InvalidPhase {
            operation,
            phase: self.phase().as_str(),
        })?;
        Ok((session.capture.clone(), session.processor.clone()))
    }

    fn expect_phase(&self, operation: &'static str, allowed: &[QuantificationPhase]) -> Result<()> {
        let phase = self.phase();
        if allowed.contains(&phase) {
            Ok(())
        } else {
            Err(Error::InvalidPhase {
                operation,
                phase: phase.as_str(),
            })
        }
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Editable map from stored spots: ordered by x, numbered from 1. Only
/// references keep their percentage.
fn reuse_spots(retained: &[SpotRecord]) -> SpotMap {
    let mut ordered: Vec<&SpotRecord> = retained.iter().collect();
    ordered.sort_by_key(|s| s.center.x);
    ordered
        .into_iter()
        .zip(1..)
        .map(|(record, id)| {
            let Point { x, y } = record.center;
            (
                id,
                SpotAnnotation {
                    circle: Circle::new(x, y, record.radius),
                    is_reference: record.is_reference,
                    reference_percentage: record
                        .is_reference
                        .then_some(record.percentage as i32),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(x: i32, percentage: f32, is_reference: bool) -> SpotRecord {
        SpotRecord {
            uid: 7,
            capture_id: CaptureId(1),
            center: Point::new(x, 20),
            radius: 4,
            integration_value: 900,
            percentage,
            is_reference,
        }
    }

    #[test]
    fn test_reuse_orders_by_x_and_renumbers() {
        let spots = reuse_spots(&[
            record(300, 12.5, false),
            record(40, 60.9, true),
            record(150, 25.0, true),
        ]);
        assert_eq!(spots.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(spots[&1].circle, Circle::new(40, 20, 4));
        assert_eq!(spots[&1].reference_percentage, Some(60));
        assert_eq!(spots[&2].circle.x, 150);
        assert!(spots[&2].is_reference);
        assert_eq!(spots[&3].circle.x, 300);
        assert!(!spots[&3].is_reference);
        assert_eq!(spots[&3].reference_percentage, None);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(QuantificationPhase::default().as_str(), "uninitialized");
        assert_eq!(QuantificationPhase::Failed.as_str(), "failed");
    }
}
