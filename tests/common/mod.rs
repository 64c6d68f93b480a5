//! Shared test scaffolding: a scripted engine backend with deterministic,
//! synchronous navigation outcomes.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::path::Path;
use std::sync::mpsc::SyncSender;

use wraith::cookies::CookieJar;
use wraith::rendering::paper::PageGeometry;
use wraith::rendering::raster::PixelSurface;
use wraith::{EngineEvent, PageEngine, Size, Viewport};

/// Engine whose navigations resolve immediately: addresses containing
/// "fail" complete unsuccessfully, everything else succeeds with a canned
/// document. Completion events are posted synchronously from `navigate`.
pub struct MockEngine {
    events: SyncSender<EngineEvent>,
    generation: u64,
    url: String,
    content: String,
    content_size: Size,
    viewport: Viewport,
    pub viewport_history: Vec<Viewport>,
    user_agent: String,
    cookie_jar: CookieJar,
}

impl MockEngine {
    pub fn new(events: SyncSender<EngineEvent>) -> Self {
        Self {
            events,
            generation: 0,
            url: "about:blank".to_string(),
            content: String::new(),
            content_size: Size::default(),
            viewport: Viewport {
                width: 1280,
                height: 720,
            },
            viewport_history: Vec::new(),
            user_agent: "mock/1.0".to_string(),
            cookie_jar: CookieJar::new(),
        }
    }

    pub fn with_content_size(events: SyncSender<EngineEvent>, size: Size) -> Self {
        let mut engine = Self::new(events);
        engine.content_size = size;
        engine
    }
}

impl PageEngine for MockEngine {
    fn navigate(&mut self, address: &str) {
        self.generation += 1;
        let success = !address.contains("fail");
        let html = if success {
            format!("<html><body><p>{address}</p></body></html>")
        } else {
            String::new()
        };
        let _ = self.events.send(EngineEvent::WindowCleared {
            generation: self.generation,
        });
        let _ = self.events.send(EngineEvent::LoadFinished {
            generation: self.generation,
            success,
            url: address.to_string(),
            html,
        });
    }

    fn stop(&mut self) {
        self.generation += 1;
    }

    fn commit_navigation(
        &mut self,
        generation: u64,
        _success: bool,
        url: &str,
        html: &str,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.url = url.to_string();
        self.content = html.to_string();
        true
    }

    fn content(&self) -> String {
        self.content.clone()
    }

    fn set_content(&mut self, html: &str) {
        self.content = html.to_string();
    }

    fn content_size(&self) -> Size {
        self.content_size
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.viewport_history.push(viewport);
    }

    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn set_user_agent(&mut self, user_agent: &str) {
        self.user_agent = user_agent.to_string();
    }

    fn paint(&self, surface: &mut PixelSurface) {
        surface.fill_rect(
            0,
            0,
            self.content_size.width,
            self.content_size.height,
            [0, 0, 255, 255],
        );
    }

    fn print_paginated(&self, _geometry: &PageGeometry, path: &Path) -> std::result::Result<(), wraith::error::Error> {
        std::fs::write(path, b"%PDF-1.4\n%%EOF\n")?;
        Ok(())
    }

    fn cookies(&self) -> &CookieJar {
        &self.cookie_jar
    }

    fn cookies_mut(&mut self) -> &mut CookieJar {
        &mut self.cookie_jar
    }
}
