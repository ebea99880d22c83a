// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Scripted plate processor and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tlceval::models::capture::{Capture, CaptureId};
use tlceval::processor::{PlateProcessor, ProcessorError, ProcessorRegistry};
use tlceval::store::{CaptureStore, Database};

/// Canned processor answers plus a log of what was asked.
#[derive(Debug, Default)]
pub struct Script {
    pub corners: Vec<i32>,
    /// Answers to successive warp calls; an empty queue answers `false`.
    pub warp_results: VecDeque<bool>,
    pub dark_blobs: bool,
    pub blobs: Vec<i32>,
    /// Integration value per spot id; unknown ids are left out of the answer.
    pub integration_per_id: i32,
    /// Percentage answered for every integrated id.
    pub fitted_percentage: f32,
    /// Fail integration with this message.
    pub integrate_error: Option<String>,
    /// Block `integrate_blobs` until this channel receives.
    pub integrate_gate: Option<std::sync::mpsc::Receiver<()>>,

    pub warps: Vec<([i32; 8], u32)>,
    pub fits: Vec<bool>,
    pub detect_calls: usize,
    pub dark_checks: usize,
    pub integrations: Vec<(Vec<i32>, f32)>,
    pub references: Vec<Vec<f32>>,
    pub closed: usize,
}

pub struct ScriptedProcessor {
    script: Arc<Mutex<Script>>,
}

impl PlateProcessor for ScriptedProcessor {
    fn detect_plate_corners(&mut self) -> Result<Vec<i32>, ProcessorError> {
        Ok(self.script.lock().unwrap().corners.clone())
    }

    fn warp_plate(&mut self, corners: &[i32; 8], orientation: u32) -> Result<bool, ProcessorError> {
        let mut script = self.script.lock().unwrap();
        script.warps.push((*corners, orientation));
        Ok(script.warp_results.pop_front().unwrap_or(false))
    }

    fn has_potential_dark_blobs(&mut self) -> Result<bool, ProcessorError> {
        let mut script = self.script.lock().unwrap();
        script.dark_checks += 1;
        Ok(script.dark_blobs)
    }

    fn fit_background(&mut self, dark_spots: bool) -> Result<(), ProcessorError> {
        self.script.lock().unwrap().fits.push(dark_spots);
        Ok(())
    }

    fn detect_blobs(&mut self) -> Result<Vec<i32>, ProcessorError> {
        let mut script = self.script.lock().unwrap();
        script.detect_calls += 1;
        Ok(script.blobs.clone())
    }

    fn integrate_blobs(&mut self, coords: &[i32], margin: f32) -> Result<Vec<i32>, ProcessorError> {
        let gate = self.script.lock().unwrap().integrate_gate.take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        let mut script = self.script.lock().unwrap();
        script.integrations.push((coords.to_vec(), margin));
        if let Some(message) = &script.integrate_error {
            return Err(ProcessorError::new(message.clone()));
        }
        let value = script.integration_per_id;
        Ok(coords
            .chunks_exact(4)
            .flat_map(|c| [c[0], value])
            .collect())
    }

    fn fit_percentages(&mut self, references: &[f32]) -> Result<Vec<f32>, ProcessorError> {
        let mut script = self.script.lock().unwrap();
        script.references.push(references.to_vec());
        let percentage = script.fitted_percentage;
        let ids: Vec<i32> = script
            .integrations
            .last()
            .map(|(coords, _)| coords.chunks_exact(4).map(|c| c[0]).collect())
            .unwrap_or_default();
        Ok(ids
            .into_iter()
            .flat_map(|id| [id as f32, percentage])
            .collect())
    }

    fn close(&mut self) {
        self.script.lock().unwrap().closed += 1;
    }
}

pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub db: Arc<Database>,
    pub registry: Arc<ProcessorRegistry>,
    pub script: Arc<Mutex<Script>>,
    pub image: PathBuf,
}

pub const CAPTURE: CaptureId = CaptureId(1_700_000_000_000);

impl Fixture {
    /// One capture whose image lives in a fresh temporary directory. The
    /// image file is only written by [`Fixture::write_image`].
    pub fn new(script: Script) -> Self {
        Self::with_database(script, |_| Database::in_memory())
    }

    /// Like [`Fixture::new`], with the database stored in a `store/`
    /// directory beside the image.
    pub fn file_backed(script: Script) -> Self {
        Self::with_database(script, |dir| {
            let store = dir.join("store");
            std::fs::create_dir(&store).unwrap();
            Database::open(store.join("db.json")).unwrap()
        })
    }

    fn with_database(script: Script, open: impl FnOnce(&Path) -> Database) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("plate.png");
        let db = Arc::new(open(dir.path()));
        db.insert_captures(&[Capture::new(CAPTURE, &image)]).unwrap();

        let script = Arc::new(Mutex::new(script));
        let shared = script.clone();
        let factory = move |_: &Path| -> Result<Box<dyn PlateProcessor>, ProcessorError> {
            Ok(Box::new(ScriptedProcessor {
                script: shared.clone(),
            }))
        };
        let registry = Arc::new(ProcessorRegistry::new(Arc::new(factory)));

        Self {
            dir,
            db,
            registry,
            script,
            image,
        }
    }

    pub fn write_image(&self, width: u32, height: u32) {
        image::RgbImage::new(width, height).save(&self.image).unwrap();
    }

    /// A registry whose processors can never be opened.
    pub fn unavailable_registry() -> Arc<ProcessorRegistry> {
        let factory = |_: &Path| -> Result<Box<dyn PlateProcessor>, ProcessorError> {
            Err(ProcessorError::new("no plate processor"))
        };
        Arc::new(ProcessorRegistry::new(Arc::new(factory)))
    }

    pub fn store_dir(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    pub fn capture(&self) -> Capture {
        self.db.find_capture(CAPTURE).unwrap().unwrap()
    }

    pub fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }
}
