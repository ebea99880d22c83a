// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Plate registration: corner suggestion, perspective warp and persistence
//! of the resulting rectangle.

use super::flight::SingleFlight;
use super::worker::{self, Pending};
use crate::config::RegistrationConfig;
use crate::editor::observable::Observable;
use crate::error::{Error, Result};
use crate::io::media;
use crate::models::capture::{Capture, CaptureId, RectangleRecord};
use crate::models::geometry::{ImageExtent, Point, Quadrilateral};
use crate::processor::{ProcessorHandle, ProcessorRegistry};
use crate::store::Store;
use crate::util::geometry::{clamp_quadrilateral, sort_corners};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Where a registration session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationPhase {
    #[default]
    Uninitialized,
    Ready,
    Warping,
    Done,
    Aborted,
}

impl RegistrationPhase {
    /// Lowercase name for logs and errors.
    pub fn as_str(self) -> &'static str {
        match self {
            RegistrationPhase::Uninitialized => "uninitialized",
            RegistrationPhase::Ready => "ready",
            RegistrationPhase::Warping => "warping",
            RegistrationPhase::Done => "done",
            RegistrationPhase::Aborted => "aborted",
        }
    }
}

/// Result of a successful warp.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpOutcome {
    /// Stored rectangle, with the corners the processor accepted.
    pub rectangle: RectangleRecord,
    /// Warp calls made, including the successful one.
    pub attempts: u32,
    pub crop_path: PathBuf,
}

struct Session {
    capture: Capture,
    processor: ProcessorHandle,
    retained: Option<RectangleRecord>,
    extent: Option<ImageExtent>,
}

/// Crop registration for one capture.
pub struct RegistrationPipeline {
    capture_id: CaptureId,
    store: Arc<dyn Store>,
    registry: Arc<ProcessorRegistry>,
    config: RegistrationConfig,
    flight: SingleFlight,
    phase: Observable<RegistrationPhase>,
    session: Mutex<Option<Session>>,
}

impl RegistrationPipeline {
    /// Pipeline for `capture_id`. Nothing is loaded until [`initialize`](Self::initialize).
    pub fn new(
        capture_id: CaptureId,
        store: Arc<dyn Store>,
        registry: Arc<ProcessorRegistry>,
        config: RegistrationConfig,
    ) -> Self {
        Self {
            capture_id,
            store,
            registry,
            config,
            flight: SingleFlight::new(),
            phase: Observable::default(),
            session: Mutex::new(None),
        }
    }

    /// Capture this pipeline works on.
    pub fn capture_id(&self) -> CaptureId {
        self.capture_id
    }

    /// Current phase.
    pub fn phase(&self) -> RegistrationPhase {
        *self.phase.get()
    }

    /// Phase changes, for observers.
    pub fn phase_observable(&self) -> Observable<RegistrationPhase> {
        self.phase.clone()
    }

    /// Load the capture, take over its previous rectangle and acquire the
    /// processor for its image.
    pub fn initialize(&self) -> Result<Capture> {
        let _flight = self.flight.try_begin("initialize")?;
        self.expect_phase("initialize", &[RegistrationPhase::Uninitialized])?;

        let joined = self
            .store
            .load_capture_with_rectangle(self.capture_id)?
            .ok_or(Error::CaptureNotFound(self.capture_id))?;

        let extent = match media::image_extent(&joined.capture.path) {
            Ok(extent) => Some(extent),
            Err(e) => {
                log::debug!("Image size unknown, corners will not be clamped: {:#}", e);
                None
            }
        };

        let processor = self.registry.get_or_create(&joined.capture.path)?;

        // One live rectangle per capture: the old one becomes the suggestion.
        if let Some(rectangle) = &joined.rectangle {
            self.store.delete_rectangle(rectangle)?;
            log::info!(
                "Retained previous rectangle of capture {} (orientation {})",
                self.capture_id,
                rectangle.orientation
            );
        }

        *self.session() = Some(Session {
            capture: joined.capture.clone(),
            processor,
            retained: joined.rectangle,
            extent,
        });
        self.phase.set(RegistrationPhase::Ready);
        log::info!("Registration of capture {} ready", self.capture_id);
        Ok(joined.capture)
    }

    /// Orientation of the retained rectangle, if any.
    pub fn previous_orientation(&self) -> Option<u32> {
        self.session()
            .as_ref()
            .and_then(|s| s.retained.as_ref())
            .map(|r| r.orientation)
    }

    /// Capture loaded by `initialize`.
    pub fn capture(&self) -> Option<Capture> {
        self.session().as_ref().map(|s| s.capture.clone())
    }

    /// Size of the capture image, when it could be read.
    pub fn image_extent(&self) -> Option<ImageExtent> {
        self.session().as_ref().and_then(|s| s.extent)
    }

    /// Corners to start editing from: the retained rectangle verbatim, or the
    /// first four detected corners in canonical order.
    pub fn suggest_rect(&self) -> Result<Quadrilateral> {
        let _flight = self.flight.try_begin("suggest")?;
        self.expect_phase("suggest", &[RegistrationPhase::Ready])?;

        let (processor, retained, extent) = {
            let session = self.session();
            let session = session.as_ref().ok_or(Error::InvalidPhase {
                operation: "suggest",
                phase: RegistrationPhase::Uninitialized.as_str(),
            })?;
            (
                session.processor.clone(),
                session.retained.clone(),
                session.extent,
            )
        };

        if let Some(rectangle) = retained {
            log::debug!("Suggesting retained rectangle");
            return Ok(rectangle.quadrilateral());
        }

        let detected = processor.lock().detect_plate_corners()?;
        log::debug!("Detected corners: {:?}", detected);
        if detected.len() < 8 {
            return Err(Error::InvalidGeometry(format!(
                "corner detection returned {} values, need 8",
                detected.len()
            )));
        }
        let corners: [Point; 4] =
            std::array::from_fn(|i| Point::new(detected[2 * i], detected[2 * i + 1]));
        let quad = match extent {
            Some(extent) => clamp_quadrilateral(&Quadrilateral::from_array(corners), extent),
            None => Quadrilateral::from_array(corners),
        };
        Ok(sort_corners(quad.to_array()))
    }

    /// Warp the plate and persist the rectangle the processor accepted.
    ///
    /// A failed warp is retried with the first corner nudged by one pixel in
    /// x and y, up to `max_warp_attempts` calls in total.
    pub fn perform_warp_crop(&self, quad: &Quadrilateral, orientation: u32) -> Result<WarpOutcome> {
        let _flight = self.flight.try_begin("warp")?;
        self.expect_phase("warp", &[RegistrationPhase::Ready])?;

        let (capture, processor) = {
            let session = self.session();
            let session = session.as_ref().ok_or(Error::InvalidPhase {
                operation: "warp",
                phase: RegistrationPhase::Uninitialized.as_str(),
            })?;
            (session.capture.clone(), session.processor.clone())
        };

        let crop_path = media::warped_path(&capture)
            .ok_or_else(|| Error::CaptureDirectoryUnresolvable(capture.path.clone()))?;

        self.phase.set(RegistrationPhase::Warping);
        match self.warp_and_persist(&capture, &processor, crop_path, quad, orientation % 360) {
            Ok(outcome) => {
                if let Some(session) = self.session().as_mut() {
                    session.capture.crop_path = Some(outcome.crop_path.clone());
                }
                self.phase.set(RegistrationPhase::Done);
                log::info!(
                    "Capture {} warped after {} attempt(s), crop at {}",
                    self.capture_id,
                    outcome.attempts,
                    outcome.crop_path.display()
                );
                Ok(outcome)
            }
            Err(e) => {
                self.phase.set(RegistrationPhase::Ready);
                Err(e)
            }
        }
    }

    fn warp_and_persist(
        &self,
        capture: &Capture,
        processor: &ProcessorHandle,
        crop_path: PathBuf,
        quad: &Quadrilateral,
        orientation: u32,
    ) -> Result<WarpOutcome> {
        let max_attempts = self.config.max_warp_attempts.max(1);
        let mut corners = quad.to_flat();
        let mut attempts = 0;
        loop {
            attempts += 1;
            log::debug!(
                "Warp attempt {} with corners {:?}, orientation {}",
                attempts,
                corners,
                orientation
            );
            if processor.lock().warp_plate(&corners, orientation)? {
                break;
            }
            if attempts >= max_attempts {
                log::warn!("Warp failed {} times, giving up", attempts);
                return Err(Error::WarpUnrecoverable { attempts });
            }
            corners[0] += 1;
            corners[1] += 1;
        }

        let mut rectangle =
            RectangleRecord::new(capture.id, &Quadrilateral::from_flat(&corners), orientation);
        let ids = self.store.insert_rectangles(std::slice::from_ref(&rectangle))?;
        rectangle.uid = ids.first().copied().unwrap_or_default();

        let updated = Capture {
            crop_path: Some(crop_path.clone()),
            ..capture.clone()
        };
        if let Err(e) = self.store.update_capture(&updated) {
            if let Err(undo) = self.store.delete_rectangle(&rectangle) {
                log::warn!("Failed to roll back rectangle {}: {}", rectangle.uid, undo);
            }
            return Err(e.into());
        }

        Ok(WarpOutcome {
            rectangle,
            attempts,
            crop_path,
        })
    }

    /// Reset the capture's derived fields, drop the retained rectangle and
    /// release the processor. Waits for a running operation to finish.
    /// Failures are logged.
    pub fn abort(&self) {
        let _idle = self.flight.wait_idle();
        let session = self.session().take();
        if let Some(session) = session {
            if let Err(e) = self.store.update_capture(&session.capture.without_processing()) {
                log::warn!("Failed to reset capture {}: {}", self.capture_id, e);
            }
            if let Some(rectangle) = &session.retained {
                if let Err(e) = self.store.delete_rectangle(rectangle) {
                    log::warn!("Failed to delete rectangle {}: {}", rectangle.uid, e);
                }
            }
            drop(session.processor);
            self.registry.close(&session.capture.path);
        }
        self.phase.set(RegistrationPhase::Aborted);
        log::info!("Registration of capture {} aborted", self.capture_id);
    }

    /// [`initialize`](Self::initialize) on a background thread.
    pub fn spawn_initialize(self: &Arc<Self>) -> Pending<Result<Capture>> {
        let this = Arc::clone(self);
        worker::spawn("registration-init", move || this.initialize())
    }

    /// [`suggest_rect`](Self::suggest_rect) on a background thread.
    pub fn spawn_suggest_rect(self: &Arc<Self>) -> Pending<Result<Quadrilateral>> {
        let this = Arc::clone(self);
        worker::spawn("registration-suggest", move || this.suggest_rect())
    }

    /// [`perform_warp_crop`](Self::perform_warp_crop) on a background thread.
    pub fn spawn_warp_crop(
        self: &Arc<Self>,
        quad: Quadrilateral,
        orientation: u32,
    ) -> Pending<Result<WarpOutcome>> {
        let this = Arc::clone(self);
        worker::spawn("registration-warp", move || {
            this.perform_warp_crop(&quad, orientation)
        })
    }

    fn expect_phase(&self, operation: &'static str, allowed: &[RegistrationPhase]) -> Result<()> {
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
