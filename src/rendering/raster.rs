//! Raster capture of the rendered page.
//!
//! The capture buffer is always RGBA with the background initialized to
//! fully transparent white. When a clip rectangle is in effect the paint
//! origin is translated by the negative of its top-left, so the engine can
//! paint in content coordinates regardless of clipping. The page viewport is
//! resized to the full content size for the duration of the capture and
//! restored afterwards, whatever the outcome.

use image::{Rgba, RgbaImage};
use log::debug;

use crate::engine::{ClipRect, PageEngine, Size};
use crate::Viewport;

/// Pixel buffer handed to the engine's paint service.
///
/// Drawing goes through [`fill_rect`](Self::fill_rect), which applies the
/// origin translation and clips to the buffer bounds, so engines paint in
/// untranslated content coordinates.
pub struct PixelSurface {
    image: RgbaImage,
    offset_x: i64,
    offset_y: i64,
    /// Paint quality hints; backends that rasterize text or scale images
    /// should honor them.
    pub anti_alias: bool,
    pub smooth_scaling: bool,
}

impl PixelSurface {
    /// A transparent-white surface of the given pixel bounds.
    pub fn new(bounds: Size) -> Self {
        Self {
            image: RgbaImage::from_pixel(bounds.width, bounds.height, Rgba([255, 255, 255, 0])),
            offset_x: 0,
            offset_y: 0,
            anti_alias: true,
            smooth_scaling: true,
        }
    }

    /// Translate the paint origin. Used to map a clip rectangle's top-left
    /// onto the buffer origin.
    pub fn translate(&mut self, dx: i64, dy: i64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Fill a rectangle given in content coordinates, clipped to the buffer.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, rgba: [u8; 4]) {
        let x0 = (x as i64 + self.offset_x).max(0);
        let y0 = (y as i64 + self.offset_y).max(0);
        let x1 = (x as i64 + width as i64 + self.offset_x).min(self.image.width() as i64);
        let y1 = (y as i64 + height as i64 + self.offset_y).min(self.image.height() as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                self.image.put_pixel(px as u32, py as u32, Rgba(rgba));
            }
        }
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Capture the page into a pixel buffer, honoring the clip rectangle.
///
/// Returns `None` (and paints nothing) when the content size is empty. The
/// clip only affects the buffer bounds and origin; an empty clip falls back
/// to full-content capture.
pub fn capture(engine: &mut dyn PageEngine, clip: Option<ClipRect>) -> Option<RgbaImage> {
    let content = engine.content_size();
    if content.is_empty() {
        debug!("raster capture skipped: empty content size");
        return None;
    }

    let clip = clip.filter(|c| !c.is_empty());
    let bounds = clip.map(|c| c.size()).unwrap_or(content);

    let mut surface = PixelSurface::new(bounds);
    if let Some(clip) = clip {
        surface.translate(-(clip.left as i64), -(clip.top as i64));
    }

    // Lay out against the full content for the duration of the capture.
    let saved_viewport = engine.viewport();
    engine.set_viewport(Viewport {
        width: content.width,
        height: content.height,
    });
    engine.paint(&mut surface);
    engine.set_viewport(saved_viewport);

    Some(surface.into_image())
}
