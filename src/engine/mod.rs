//! The narrow contract consumed from a browser-engine backend.
//!
//! The host never talks to a network stack or a layout engine directly; it
//! drives a [`PageEngine`] and reacts to the [`EngineEvent`]s the backend
//! posts on the scheduler channel. The built-in backend lives in [`soft`];
//! tests substitute scripted engines.

pub mod soft;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cookies::CookieJar;
use crate::rendering::paper::PageGeometry;
use crate::rendering::raster::PixelSurface;
use crate::{Result, Viewport};

/// Pixel dimensions of laid-out content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Pixel region restricting raster capture to a sub-area of the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipRect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl ClipRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Completion signals posted by an engine backend.
///
/// Exactly one `LoadFinished` arrives per navigation that is still current;
/// a `WindowCleared` precedes it whenever the backend created a fresh script
/// environment for the new page. Both carry the generation of the navigation
/// that produced them so stale completions can be dropped after `stop`.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    WindowCleared {
        generation: u64,
    },
    LoadFinished {
        generation: u64,
        success: bool,
        url: String,
        html: String,
    },
}

/// Navigation, layout, paint, and print services consumed by the host.
///
/// Backends that execute page script for long stretches are expected to poll
/// [`Session::should_interrupt_script`](crate::session::Session::should_interrupt_script)
/// between units of work. The hook services a slice of pending host events
/// and always permits continuation; it is a cooperative yield point, not a
/// preemption mechanism. The built-in backend runs no page script and never
/// needs it.
pub trait PageEngine {
    /// Start an asynchronous navigation. Completion arrives later as a
    /// `LoadFinished` event; the call itself never fails.
    fn navigate(&mut self, address: &str);

    /// Cancel any in-flight navigation. Completions of cancelled navigations
    /// are dropped at commit time via the generation check.
    fn stop(&mut self);

    /// Apply a finished navigation. Returns false when the completion is
    /// stale (a newer navigation or a `stop` superseded it).
    fn commit_navigation(&mut self, generation: u64, success: bool, url: &str, html: &str)
        -> bool;

    fn content(&self) -> String;
    fn set_content(&mut self, html: &str);

    /// Content dimensions computed by the backend's layout, not by the host.
    fn content_size(&self) -> Size;

    fn viewport(&self) -> Viewport;
    fn set_viewport(&mut self, viewport: Viewport);

    fn user_agent(&self) -> String;
    fn set_user_agent(&mut self, user_agent: &str);

    /// Paint the laid-out page into the surface. The surface carries the
    /// origin translation for clipped captures.
    fn paint(&self, surface: &mut PixelSurface);

    /// Print the page into a paginated document at `path` using the given
    /// page geometry.
    fn print_paginated(&self, geometry: &PageGeometry, path: &Path) -> Result<()>;

    fn cookies(&self) -> &CookieJar;
    fn cookies_mut(&mut self) -> &mut CookieJar;
}
