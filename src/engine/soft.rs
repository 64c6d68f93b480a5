//! Built-in engine backend: blocking HTTP fetch plus a simple block layout.
//!
//! Navigation runs on a short-lived fetch thread and reports back over the
//! scheduler channel, so `navigate` returns immediately and the completion
//! surfaces as an [`EngineEvent`] on a later pump. A generation counter tied
//! to each navigation lets `stop` (or a superseding `navigate`) invalidate
//! completions that are already in flight.

use std::io::Write;
use std::path::Path;
use std::sync::mpsc::SyncSender;
use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client;
use scraper::Html;
use url::Url;

use crate::cookies::CookieJar;
use crate::engine::{EngineEvent, PageEngine, Size};
use crate::rendering::layout::{self, BlockKind, BlockNode};
use crate::rendering::paper::PageGeometry;
use crate::rendering::raster::PixelSurface;
use crate::{Error, HostConfig, Result, Viewport};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Initial blank document, so scripts always observe a document body.
const BLANK_DOCUMENT: &str = "<html><body></body></html>";

pub struct SoftEngine {
    client: Client,
    events: SyncSender<EngineEvent>,
    generation: u64,
    user_agent: String,
    viewport: Viewport,
    url: String,
    html: String,
    blocks: Vec<BlockNode>,
    cookie_jar: CookieJar,
}

impl SoftEngine {
    pub fn new(config: &HostConfig, events: SyncSender<EngineEvent>) -> Result<Self> {
        let mut builder = Client::builder().timeout(FETCH_TIMEOUT);
        if let Some(proxy) = &config.proxy {
            let endpoint = format!("http://{}:{}", proxy.host, proxy.port);
            let proxy = reqwest::Proxy::all(&endpoint)
                .map_err(|e| Error::ConfigError(format!("invalid proxy {endpoint}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| Error::InitializationError(format!("failed to build HTTP client: {e}")))?;

        if config.plugins_enabled {
            debug!("plugins requested; the built-in backend has none to enable");
        }
        if !config.auto_load_images {
            debug!("image loading disabled; the built-in backend fetches none anyway");
        }

        let mut engine = Self {
            client,
            events,
            generation: 0,
            user_agent: config.user_agent.clone(),
            viewport: config.viewport,
            url: String::new(),
            html: String::new(),
            blocks: Vec::new(),
            cookie_jar: CookieJar::new(),
        };
        engine.set_content(BLANK_DOCUMENT);
        Ok(engine)
    }

    fn relayout(&mut self) {
        let document = Html::parse_document(&self.html);
        self.blocks = layout::layout_document(&document, self.viewport);
    }
}

impl PageEngine for SoftEngine {
    fn navigate(&mut self, address: &str) {
        self.generation += 1;
        let generation = self.generation;
        let events = self.events.clone();

        // Reject unparseable addresses up front; the completion still goes
        // through the event queue so the controller sees the usual sequence.
        let target = match Url::parse(address) {
            Ok(target) => target,
            Err(e) => {
                warn!("invalid address {address}: {e}");
                let _ = events.send(EngineEvent::WindowCleared { generation });
                let _ = events.send(EngineEvent::LoadFinished {
                    generation,
                    success: false,
                    url: address.to_string(),
                    html: String::new(),
                });
                return;
            }
        };

        let client = self.client.clone();
        let user_agent = self.user_agent.clone();
        let address = address.to_string();

        std::thread::spawn(move || {
            // The new page gets a fresh script environment before its load
            // completes; the controller re-injects bindings on this signal.
            let _ = events.send(EngineEvent::WindowCleared { generation });

            let fetched = client
                .get(target)
                .header("User-Agent", user_agent)
                .send()
                .and_then(|resp| {
                    let ok = resp.status().is_success();
                    resp.text().map(|body| (ok, body))
                });

            let (success, html) = match fetched {
                Ok((ok, body)) => (ok, body),
                Err(e) => {
                    warn!("navigation to {address} failed: {e}");
                    (false, String::new())
                }
            };
            let _ = events.send(EngineEvent::LoadFinished {
                generation,
                success,
                url: address,
                html,
            });
        });
    }

    fn stop(&mut self) {
        // Invalidate anything already in flight; its completion will fail
        // the generation check at commit time.
        self.generation += 1;
    }

    fn commit_navigation(
        &mut self,
        generation: u64,
        success: bool,
        url: &str,
        html: &str,
    ) -> bool {
        if generation != self.generation {
            debug!("dropping stale navigation completion for {url}");
            return false;
        }
        if success {
            self.url = url.to_string();
            self.html = html.to_string();
            self.relayout();
        }
        true
    }

    fn content(&self) -> String {
        self.html.clone()
    }

    fn set_content(&mut self, html: &str) {
        self.html = html.to_string();
        self.relayout();
    }

    fn content_size(&self) -> Size {
        let height = layout::content_height(&self.blocks);
        if height == 0 {
            return Size::default();
        }
        Size::new(self.viewport.width, height)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.relayout();
    }

    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn set_user_agent(&mut self, user_agent: &str) {
        self.user_agent = user_agent.to_string();
    }

    fn paint(&self, surface: &mut PixelSurface) {
        let content = self.content_size();
        // Opaque page background over the content area only; the rest of the
        // buffer keeps its transparent initialization.
        surface.fill_rect(
            0,
            0,
            content.width,
            content.height,
            [255, 255, 255, 255],
        );
        for block in &self.blocks {
            let shade = match block.kind {
                BlockKind::Heading => [40, 40, 40, 255],
                BlockKind::Text => [96, 96, 96, 255],
            };
            surface.fill_rect(
                block.rect.x,
                block.rect.y,
                block.rect.width,
                block.rect.height,
                shade,
            );
        }
    }

    fn print_paginated(&self, geometry: &PageGeometry, path: &Path) -> Result<()> {
        write_pdf(geometry, self.content_size(), path)
    }

    fn cookies(&self) -> &CookieJar {
        &self.cookie_jar
    }

    fn cookies_mut(&mut self) -> &mut CookieJar {
        &mut self.cookie_jar
    }
}

/// Emit a minimal PDF: one blank page per printable-height slice of the
/// content, each with the resolved MediaBox. Enough structure for readers
/// and for tests to verify page count and geometry.
fn write_pdf(geometry: &PageGeometry, content: Size, path: &Path) -> Result<()> {
    let px_to_pt = 72.0 / geometry.dpi as f64 / 2.54;
    let content_pt = content.height as f64 * px_to_pt;
    let printable = (geometry.height_pt - 2.0 * geometry.margin_pt).max(1.0);
    let pages = ((content_pt / printable).ceil() as usize).max(1);

    let mut body: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = Vec::new();
    body.extend_from_slice(b"%PDF-1.4\n");

    let kids = (0..pages)
        .map(|i| format!("{} 0 R", 3 + i))
        .collect::<Vec<_>>()
        .join(" ");

    offsets.push(body.len());
    body.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    offsets.push(body.len());
    body.extend_from_slice(
        format!("2 0 obj\n<< /Type /Pages /Kids [{kids}] /Count {pages} >>\nendobj\n").as_bytes(),
    );
    for i in 0..pages {
        offsets.push(body.len());
        body.extend_from_slice(
            format!(
                "{} 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] >>\nendobj\n",
                3 + i,
                geometry.width_pt,
                geometry.height_pt,
            )
            .as_bytes(),
        );
    }

    let xref_offset = body.len();
    let objects = offsets.len() + 1;
    body.extend_from_slice(format!("xref\n0 {objects}\n").as_bytes());
    body.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        body.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    body.extend_from_slice(
        format!(
            "trailer\n<< /Size {objects} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        )
        .as_bytes(),
    );

    let mut file = std::fs::File::create(path)?;
    file.write_all(&body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::paper::{self, Measure, PaperConfig};
    use std::sync::mpsc::{sync_channel, Receiver};

    fn engine() -> (SoftEngine, Receiver<EngineEvent>) {
        let (tx, rx) = sync_channel(8);
        (SoftEngine::new(&HostConfig::default(), tx).unwrap(), rx)
    }

    #[test]
    fn malformed_proxy_is_a_configuration_error() {
        let (tx, _rx) = sync_channel(1);
        let config = HostConfig {
            proxy: Some(crate::ProxyConfig {
                host: "not a host".to_string(),
                port: 1080,
            }),
            ..HostConfig::default()
        };
        assert!(matches!(
            SoftEngine::new(&config, tx),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn blank_document_reports_empty_content() {
        let (engine, _rx) = engine();
        assert!(engine.content_size().is_empty());
    }

    #[test]
    fn set_content_relayouts() {
        let (mut engine, _rx) = engine();
        engine.set_content("<html><body><h1>T</h1><p>body text</p></body></html>");
        let size = engine.content_size();
        assert_eq!(size.width, Viewport::default().width);
        assert!(size.height > 0);
    }

    #[test]
    fn unparseable_address_completes_as_failure_without_fetching() {
        let (mut engine, rx) = engine();
        engine.navigate("no scheme at all");

        // Both signals arrive immediately; no fetch thread was spawned.
        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineEvent::WindowCleared { .. }
        ));
        match rx.try_recv().unwrap() {
            EngineEvent::LoadFinished { success, url, .. } => {
                assert!(!success);
                assert_eq!(url, "no scheme at all");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn stale_commit_is_dropped() {
        let (mut engine, _rx) = engine();
        engine.set_content("<html><body><p>old</p></body></html>");
        let before = engine.content();

        engine.navigate("http://127.0.0.1:1/unreachable");
        let stale = engine.generation;
        engine.stop();
        assert!(!engine.commit_navigation(stale, true, "http://x", "<p>new</p>"));
        assert_eq!(engine.content(), before);
    }

    #[test]
    fn pdf_output_paginates_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        let config = PaperConfig {
            width: Some(Measure("100px".into())),
            height: Some(Measure("100px".into())),
            border: Some(Measure("0px".into())),
            ..Default::default()
        };
        let geometry = paper::resolve(Some(&config), Size::new(100, 1000)).unwrap();
        write_pdf(&geometry, Size::new(100, 1000), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("%PDF-1.4"));
        // 1000 px -> ~394 pt of content over ~40 pt pages.
        let count: usize = text
            .split("/Count ")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|n| n.parse().ok())
            .unwrap();
        assert!(count > 1);
        assert!(text.ends_with("%%EOF\n"));
    }
}
