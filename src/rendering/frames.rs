//! Dedicated frame writer for animated-image (GIF) export.
//!
//! The generic encoder paths in [`raster`](super::raster) handle still
//! formats; GIF goes through this writer so multi-frame captures share one
//! encoding path with the single-frame `render` case.

use std::fs::File;
use std::path::Path;

use image::codecs::gif::GifEncoder;
use image::{Frame, RgbaImage};

use crate::{Error, Result};

/// Write the given frames as a GIF at `path`. A single frame produces a
/// still GIF; more produce an animation in frame order.
pub fn write_frames(frames: Vec<RgbaImage>, path: &Path) -> Result<()> {
    if frames.is_empty() {
        return Err(Error::RenderError("no frames to write".into()));
    }
    let file = File::create(path)?;
    let mut encoder = GifEncoder::new(file);
    for frame in frames {
        encoder
            .encode_frame(Frame::new(frame))
            .map_err(|e| Error::RenderError(format!("GIF frame encoding failed: {e}")))?;
    }
    Ok(())
}
