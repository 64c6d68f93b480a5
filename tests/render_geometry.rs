//! Raster and paginated export geometry, driven through the public
//! rendering entry point with a scripted engine.

mod common;

use std::rc::Rc;

use common::MockEngine;
use wraith::event_loop::Scheduler;
use wraith::rendering::paper::Measure;
use wraith::rendering::{self, raster};
use wraith::{ClipRect, PageEngine, PaperConfig, Size, Viewport};

fn engine_with_content(size: Size) -> MockEngine {
    let scheduler = Rc::new(Scheduler::new());
    MockEngine::with_content_size(scheduler.sender(), size)
}

#[test]
fn capture_sizes_buffer_to_content_and_restores_viewport() {
    let mut engine = engine_with_content(Size::new(800, 2400));
    engine.set_viewport(Viewport {
        width: 800,
        height: 600,
    });
    engine.viewport_history.clear();

    let image = raster::capture(&mut engine, None).unwrap();
    assert_eq!(image.width(), 800);
    assert_eq!(image.height(), 2400);

    // The viewport was widened to the full content during capture, then
    // put back.
    assert_eq!(
        engine.viewport_history,
        vec![
            Viewport {
                width: 800,
                height: 2400
            },
            Viewport {
                width: 800,
                height: 600
            },
        ]
    );
    assert_eq!(
        engine.viewport(),
        Viewport {
            width: 800,
            height: 600
        }
    );
}

#[test]
fn capture_with_clip_sizes_buffer_to_clip() {
    let mut engine = engine_with_content(Size::new(800, 600));
    let clip = ClipRect {
        left: 100,
        top: 50,
        width: 200,
        height: 120,
    };
    let image = raster::capture(&mut engine, Some(clip)).unwrap();
    assert_eq!(image.width(), 200);
    assert_eq!(image.height(), 120);
}

#[test]
fn empty_clip_falls_back_to_content_bounds() {
    let mut engine = engine_with_content(Size::new(320, 240));
    let image = raster::capture(&mut engine, Some(ClipRect::default())).unwrap();
    assert_eq!(image.width(), 320);
    assert_eq!(image.height(), 240);
}

#[test]
fn empty_content_produces_no_capture_and_no_file() {
    let mut engine = engine_with_content(Size::default());
    assert!(raster::capture(&mut engine, None).is_none());

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("empty.png");
    assert!(!rendering::render(
        &mut engine,
        None,
        None,
        target.to_str().unwrap()
    ));
    assert!(!target.exists());
}

#[test]
fn render_writes_png_and_creates_directories() {
    let mut engine = engine_with_content(Size::new(64, 48));
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested/deeper/shot.png");

    assert!(rendering::render(
        &mut engine,
        None,
        None,
        target.to_str().unwrap()
    ));
    assert!(target.exists());

    let image = image::open(&target).unwrap();
    assert_eq!(image.width(), 64);
    assert_eq!(image.height(), 48);
}

#[test]
fn render_routes_pdf_extension_case_insensitively() {
    let mut engine = engine_with_content(Size::new(64, 48));
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("page.PDF");

    let paper = PaperConfig {
        format: Some("A4".to_string()),
        ..PaperConfig::default()
    };
    assert!(rendering::render(
        &mut engine,
        None,
        Some(&paper),
        target.to_str().unwrap()
    ));
    let bytes = std::fs::read(&target).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn paginated_export_rejects_contradictory_paper() {
    let mut engine = engine_with_content(Size::new(64, 48));
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("page.pdf");

    // Neither dimensions nor a format: self-contradictory.
    let paper = PaperConfig {
        border: Some(Measure::pixels(10)),
        ..PaperConfig::default()
    };
    assert!(!rendering::render(
        &mut engine,
        None,
        Some(&paper),
        target.to_str().unwrap()
    ));
    assert!(!target.exists());
}

#[test]
fn render_writes_animated_gif_container() {
    let mut engine = engine_with_content(Size::new(32, 32));
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("shot.gif");

    assert!(rendering::render(
        &mut engine,
        None,
        None,
        target.to_str().unwrap()
    ));
    let bytes = std::fs::read(&target).unwrap();
    assert!(bytes.starts_with(b"GIF8"));
}
