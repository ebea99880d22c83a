// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

mod common;

use common::{Fixture, Script, CAPTURE};
use std::collections::VecDeque;
use std::time::Duration;
use tlceval::config::RegistrationConfig;
use tlceval::editor::QuadEditor;
use tlceval::models::capture::{CaptureId, RectangleRecord};
use tlceval::models::geometry::{Point, Quadrilateral, ViewPoint};
use tlceval::pipeline::{RegistrationPhase, RegistrationPipeline};
use tlceval::store::{CaptureStore, RecordStore};
use tlceval::Error;

fn pipeline(fixture: &Fixture) -> RegistrationPipeline {
    RegistrationPipeline::new(
        CAPTURE,
        fixture.db.clone(),
        fixture.registry.clone(),
        RegistrationConfig::default(),
    )
}

fn p(x: i32, y: i32) -> Point {
    Point::new(x, y)
}

#[test]
fn test_unknown_capture_is_not_found() {
    let fixture = Fixture::new(Script::default());
    let pipeline = RegistrationPipeline::new(
        CaptureId(5),
        fixture.db.clone(),
        fixture.registry.clone(),
        RegistrationConfig::default(),
    );
    assert!(matches!(
        pipeline.initialize(),
        Err(Error::CaptureNotFound(CaptureId(5)))
    ));
    assert_eq!(fixture.registry.open_count(), 0);
}

#[test]
fn test_suggest_rect_orders_detected_corners() {
    let fixture = Fixture::new(Script {
        corners: vec![10, 10, 200, 10, 200, 200, 10, 200],
        ..Script::default()
    });
    let pipeline = pipeline(&fixture);
    pipeline.initialize().unwrap();

    let quad = pipeline.suggest_rect().unwrap();
    assert_eq!(quad.top_left, p(10, 10));
    assert_eq!(quad.top_right, p(200, 10));
    assert_eq!(quad.bottom_right, p(200, 200));
    assert_eq!(quad.bottom_left, p(10, 200));
}

#[test]
fn test_suggest_rect_clamps_to_image() {
    let fixture = Fixture::new(Script {
        corners: vec![-5, 3, 700, 0, 650, 500, 2, 490],
        ..Script::default()
    });
    fixture.write_image(640, 480);
    let pipeline = pipeline(&fixture);
    pipeline.initialize().unwrap();

    let quad = pipeline.suggest_rect().unwrap();
    assert_eq!(quad.top_left, p(0, 3));
    assert_eq!(quad.top_right, p(639, 0));
    assert_eq!(quad.bottom_left, p(2, 479));
    assert_eq!(quad.bottom_right, p(639, 479));
}

#[test]
fn test_warp_retries_with_nudged_corner() {
    let fixture = Fixture::new(Script {
        warp_results: VecDeque::from([false, true]),
        ..Script::default()
    });
    let pipeline = pipeline(&fixture);
    pipeline.initialize().unwrap();

    let quad = Quadrilateral::new(p(10, 10), p(200, 10), p(200, 200), p(10, 200));
    let outcome = pipeline.perform_warp_crop(&quad, 90).unwrap();
    assert_eq!(outcome.attempts, 2);
    assert_eq!(pipeline.phase(), RegistrationPhase::Done);

    {
        let script = fixture.script();
        assert_eq!(script.warps.len(), 2);
        assert_eq!(script.warps[0].0[..2], [10, 10]);
        assert_eq!(script.warps[1].0[..2], [11, 11]);
        assert!(script.warps.iter().all(|(_, orientation)| *orientation == 90));
    }

    let joined = fixture
        .db
        .load_capture_with_rectangle(CAPTURE)
        .unwrap()
        .unwrap();
    let stored = joined.rectangle.unwrap();
    assert_eq!(stored.top_left, p(11, 11));
    assert_eq!(stored.top_right, p(200, 10));
    assert_eq!(stored.orientation, 90);
    assert_eq!(stored, outcome.rectangle);
    assert_eq!(
        joined.capture.crop_path,
        Some(fixture.dir.path().join("warped.png"))
    );
}

#[test]
fn test_concurrent_warp_is_busy() {
    let fixture = Fixture::new(Script::default());
    let pipeline = std::sync::Arc::new(pipeline(&fixture));
    pipeline.initialize().unwrap();

    // Hold the processor so the first warp blocks inside the guarded section.
    let handle = fixture.registry.get_or_create(&fixture.image).unwrap();
    let held = handle.lock();
    fixture.script().warp_results.push_back(true);

    let quad = Quadrilateral::new(p(1, 1), p(9, 1), p(9, 9), p(1, 9));
    let first = pipeline.spawn_warp_crop(quad, 0);
    while pipeline.phase() != RegistrationPhase::Warping {
        std::thread::sleep(Duration::from_millis(1));
    }

    assert!(matches!(
        pipeline.perform_warp_crop(&quad, 0),
        Err(Error::Busy { operation: "warp" })
    ));

    drop(held);

    assert!(first.wait().unwrap().is_ok());
    assert_eq!(fixture.script().warps.len(), 1);
}

#[test]
fn test_editor_to_warp_round_trip() {
    let fixture = Fixture::new(Script {
        corners: vec![10, 10, 200, 10, 200, 200, 10, 200],
        warp_results: VecDeque::from([true]),
        ..Script::default()
    });
    fixture.write_image(640, 480);
    let pipeline = pipeline(&fixture);
    pipeline.initialize().unwrap();

    let mut editor = QuadEditor::new(
        pipeline.image_extent().unwrap(),
        RegistrationConfig::default(),
    );
    editor.set_base_rotation(pipeline.previous_orientation().unwrap_or(0) as i32);
    editor.set_points(pipeline.suggest_rect().unwrap());

    assert!(editor.press(ViewPoint::new(12.0, 12.0)));
    editor.move_to(ViewPoint::new(30.0, 25.0));
    editor.release();
    editor.rotate_right();

    let quad = editor.points().unwrap();
    let outcome = pipeline
        .perform_warp_crop(&quad, editor.warp_orientation())
        .unwrap();
    assert_eq!(outcome.rectangle.orientation, 90);
    assert_eq!(outcome.rectangle.quadrilateral(), quad);
}

#[test]
fn test_abort_clears_derived_fields() {
    let fixture = Fixture::new(Script {
        warp_results: VecDeque::from([true]),
        ..Script::default()
    });
    let pipeline = pipeline(&fixture);
    pipeline.initialize().unwrap();
    let quad = Quadrilateral::new(p(1, 1), p(9, 1), p(9, 9), p(1, 9));
    pipeline.perform_warp_crop(&quad, 0).unwrap();
    assert!(fixture.capture().crop_path.is_some());

    pipeline.abort();
    assert!(fixture.capture().crop_path.is_none());
    assert_eq!(fixture.script().closed, 1);
    assert!(!fixture.registry.is_open(&fixture.image));
}

#[test]
fn test_unavailable_processor_keeps_previous_rectangle() {
    let fixture = Fixture::new(Script::default());
    let quad = Quadrilateral::new(p(5, 5), p(90, 5), p(90, 70), p(5, 70));
    fixture
        .db
        .insert_rectangles(&[RectangleRecord::new(CAPTURE, &quad, 90)])
        .unwrap();

    let broken = RegistrationPipeline::new(
        CAPTURE,
        fixture.db.clone(),
        Fixture::unavailable_registry(),
        RegistrationConfig::default(),
    );
    assert!(matches!(
        broken.initialize(),
        Err(Error::ProcessorUnavailable { .. })
    ));
    assert_eq!(broken.phase(), RegistrationPhase::Uninitialized);
    let stored = fixture
        .db
        .load_capture_with_rectangle(CAPTURE)
        .unwrap()
        .unwrap();
    assert_eq!(stored.rectangle.map(|r| r.quadrilateral()), Some(quad));

    let retry = pipeline(&fixture);
    retry.initialize().unwrap();
    assert_eq!(retry.previous_orientation(), Some(90));
    assert_eq!(retry.suggest_rect().unwrap(), quad);
}

#[test]
fn test_abort_waits_for_running_warp() {
    let fixture = Fixture::new(Script {
        warp_results: VecDeque::from([true]),
        ..Script::default()
    });
    let pipeline = std::sync::Arc::new(pipeline(&fixture));
    pipeline.initialize().unwrap();

    let handle = fixture.registry.get_or_create(&fixture.image).unwrap();
    let held = handle.lock();

    let quad = Quadrilateral::new(p(1, 1), p(9, 1), p(9, 9), p(1, 9));
    let warp = pipeline.spawn_warp_crop(quad, 0);
    while pipeline.phase() != RegistrationPhase::Warping {
        std::thread::sleep(Duration::from_millis(1));
    }

    let phases = pipeline.phase_observable().subscribe();
    let aborter = {
        let pipeline = pipeline.clone();
        std::thread::spawn(move || pipeline.abort())
    };
    std::thread::sleep(Duration::from_millis(50));
    assert!(!aborter.is_finished());
    assert_eq!(pipeline.phase(), RegistrationPhase::Warping);

    drop(held);
    drop(handle);
    assert!(warp.wait().unwrap().is_ok());
    aborter.join().unwrap();

    let seen: Vec<RegistrationPhase> = phases.try_iter().map(|phase| *phase).collect();
    assert_eq!(
        seen,
        vec![
            RegistrationPhase::Warping,
            RegistrationPhase::Done,
            RegistrationPhase::Aborted
        ]
    );
    assert!(fixture.capture().crop_path.is_none());
    assert!(!fixture.registry.is_open(&fixture.image));
}
