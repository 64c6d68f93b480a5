//! Render/export pipeline.
//!
//! `render` is the single entry point: it materializes the current page as a
//! file, routing by extension to either paginated export or raster capture.
//! Failures are reported as `false`, never as panics or errors crossing the
//! script boundary.

pub mod frames;
pub mod layout;
pub mod paper;
pub mod raster;

use std::fs;
use std::path::Path;

use image::DynamicImage;
use log::{debug, warn};

use crate::engine::{ClipRect, PageEngine};
use crate::rendering::paper::PaperConfig;

/// Export the page to `file_name`.
///
/// Intermediate directories are created as needed. A name ending in `.pdf`
/// (case-insensitive) selects paginated export; anything else is a raster
/// capture encoded by extension, with `.gif` routed through the dedicated
/// frame writer.
pub fn render(
    engine: &mut dyn PageEngine,
    clip: Option<ClipRect>,
    paper: Option<&PaperConfig>,
    file_name: &str,
) -> bool {
    let path = Path::new(file_name);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("could not create output directory {}: {e}", parent.display());
            }
        }
    }

    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        return render_paginated(engine, paper, path);
    }

    let image = match raster::capture(engine, clip) {
        Some(image) => image,
        None => return false,
    };

    if lower.ends_with(".gif") {
        return frames::write_frames(vec![image], path).is_ok();
    }
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        // JPEG has no alpha channel; flatten before encoding.
        return DynamicImage::ImageRgba8(image).to_rgb8().save(path).is_ok();
    }
    image.save(path).is_ok()
}

fn render_paginated(engine: &mut dyn PageEngine, paper: Option<&PaperConfig>, path: &Path) -> bool {
    let geometry = match paper::resolve(paper, engine.content_size()) {
        Some(geometry) => geometry,
        None => {
            debug!("paginated export rejected: contradictory paper configuration");
            return false;
        }
    };
    engine.print_paginated(&geometry, path).is_ok()
}
