//! The session: one long-lived unit of work owning one page.
//!
//! The session sequences navigation, script re-execution, and export so that
//! script code observes load completion exactly once per navigation. It is
//! the only owner of the page, the output capture handle, and the export
//! geometry; everything is touched from the single logical thread of
//! control.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use log::{debug, warn};
use serde_json::Value;

use crate::engine::{ClipRect, PageEngine, Size};
use crate::event_loop::Scheduler;
use crate::rendering::{self, paper::PaperConfig};
use crate::{Error, HostConfig, Result, Viewport};

/// Shared handle to the session, passed explicitly to the script host on
/// every environment creation. No ambient global.
pub type SessionHandle = Rc<RefCell<Session>>;

/// Navigation outcome, script-visible as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    NotLoaded,
    Loading,
    Success,
    Fail,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::NotLoaded => "",
            LoadStatus::Loading => "loading",
            LoadStatus::Success => "success",
            LoadStatus::Fail => "fail",
        }
    }
}

/// Converter collaborator for scripts written in a secondary source dialect.
pub trait ScriptConverter {
    fn convert(&self, source: &str) -> Result<String>;
}

/// The navigable document surface, exclusively owned by the session.
///
/// Layout-derived attributes (content size, viewport) live in the engine;
/// the page adds the upload-grant bookkeeping the engine consults when a
/// file chooser fires.
pub struct Page {
    engine: Box<dyn PageEngine>,
    allowed_files: HashMap<String, String>,
    next_file_tag: Option<String>,
}

impl Page {
    pub fn engine(&self) -> &dyn PageEngine {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn PageEngine {
        self.engine.as_mut()
    }

    /// Arm the next file-chooser request with a grant tag.
    pub fn arm_upload(&mut self, tag: &str) {
        self.next_file_tag = Some(tag.to_string());
    }

    /// File served to the next chooser request: the granted path for the
    /// armed tag, or nothing when no grant matches.
    pub fn choose_file(&self) -> Option<&str> {
        let tag = self.next_file_tag.as_deref()?;
        self.allowed_files.get(tag).map(String::as_str)
    }
}

pub struct Session {
    args: Vec<String>,
    config: HostConfig,
    script: String,
    state: String,
    load_status: LoadStatus,
    exit_code: i32,
    /// Set by `exit`: severs the load-finished -> re-execute binding.
    severed: bool,
    output: Option<File>,
    paper: Option<PaperConfig>,
    clip: Option<ClipRect>,
    page: Page,
    scheduler: Rc<Scheduler>,
    converter: Option<Box<dyn ScriptConverter>>,
}

impl Session {
    pub fn new(config: HostConfig, engine: Box<dyn PageEngine>, scheduler: Rc<Scheduler>) -> Self {
        Self {
            args: config.script_args.clone(),
            page: Page {
                engine,
                allowed_files: config.upload_grants.clone(),
                next_file_tag: None,
            },
            config,
            script: String::new(),
            state: String::new(),
            load_status: LoadStatus::default(),
            exit_code: 0,
            severed: false,
            output: None,
            paper: None,
            clip: None,
            scheduler,
            converter: None,
        }
    }

    pub fn into_handle(self) -> SessionHandle {
        Rc::new(RefCell::new(self))
    }

    /// Register the secondary-dialect converter collaborator.
    pub fn set_converter(&mut self, converter: Box<dyn ScriptConverter>) {
        self.converter = Some(converter);
    }

    /// Read and prepare the configured script source.
    ///
    /// An interpreter marker line is neutralized into a comment rather than
    /// executed, and a `.coffee` source is routed through the converter
    /// collaborator. Failure to open the script is fatal to the run.
    pub fn prepare_script(&mut self) -> Result<()> {
        let path = self.config.script_path.clone();
        if path.as_os_str().is_empty() {
            return Err(Error::ScriptError("no script configured".into()));
        }
        let mut script = std::fs::read_to_string(&path)
            .map_err(|_| Error::ScriptError(format!("can't open {}", path.display())))?;

        if script.starts_with("#!") {
            script.insert_str(0, "//");
        }

        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("coffee")) {
            match &self.converter {
                Some(converter) => script = converter.convert(&script)?,
                None => {
                    return Err(Error::ScriptError(format!(
                        "no dialect converter available for {}",
                        path.display()
                    )))
                }
            }
        }

        self.script = script;
        Ok(())
    }

    pub fn script(&self) -> String {
        self.script.clone()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn scheduler(&self) -> Rc<Scheduler> {
        self.scheduler.clone()
    }

    pub fn load_status(&self) -> LoadStatus {
        self.load_status
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn set_state(&mut self, value: &str) {
        self.state = value.to_string();
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    /// Start navigating to `address`. Any in-flight navigation is cancelled
    /// first; completion arrives asynchronously and never raises here. An
    /// invalid address simply transitions to `fail` later.
    pub fn open(&mut self, address: &str) {
        self.page.engine_mut().stop();
        self.load_status = LoadStatus::Loading;
        self.page.engine_mut().navigate(address);
    }

    /// Record a finished load. Returns whether the script should be
    /// re-executed: after `exit` the binding is severed and nothing runs.
    pub fn handle_load_finished(&mut self, success: bool) -> bool {
        if self.severed {
            debug!("load finished after exit; not re-executing");
            return false;
        }
        self.load_status = if success {
            LoadStatus::Success
        } else {
            LoadStatus::Fail
        };
        true
    }

    /// Record the exit code and schedule termination on the next iteration
    /// of the host loop. Code already in flight finishes first.
    pub fn exit(&mut self, code: i32) {
        self.exit_code = code;
        self.severed = true;
        self.output = None;
        self.scheduler.request_quit();
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Cooperative interrupt hook for engine backends running long page
    /// scripts; part of the [`PageEngine`] contract (see the trait docs).
    /// Services a slice of pending events, then always permits continuation.
    pub fn should_interrupt_script(&self) -> bool {
        self.scheduler.poll_slice(Duration::from_millis(42));
        false
    }

    /// Export the page to `file_name`; see [`rendering::render`].
    pub fn render(&mut self, file_name: &str) -> bool {
        rendering::render(
            self.page.engine.as_mut(),
            self.clip,
            self.paper.as_ref(),
            file_name,
        )
    }

    /// Open (or replace) the output capture file. The handle is exclusively
    /// owned; a replaced or exited session releases it.
    pub fn set_output_path(&mut self, path: &str) {
        match File::create(path) {
            Ok(file) => self.output = Some(file),
            Err(e) => {
                warn!("could not open output path {path}: {e}");
                self.output = None;
            }
        }
    }

    pub fn write(&mut self, text: &str) {
        if let Some(file) = &mut self.output {
            let _ = file.write_all(text.as_bytes());
        }
    }

    pub fn writeln(&mut self, text: &str) {
        if let Some(file) = &mut self.output {
            let _ = file.write_all(text.as_bytes());
            let _ = file.write_all(b"\n");
        }
    }

    pub fn viewport_size(&self) -> Viewport {
        self.page.engine().viewport()
    }

    /// Apply a viewport request. Non-positive dimensions are ignored and the
    /// prior viewport is retained.
    pub fn set_viewport_size(&mut self, width: i64, height: i64) {
        if width > 0 && height > 0 {
            self.page.engine_mut().set_viewport(Viewport {
                width: width as u32,
                height: height as u32,
            });
        }
    }

    pub fn content_size(&self) -> Size {
        self.page.engine().content_size()
    }

    pub fn clip_rect(&self) -> ClipRect {
        self.clip.unwrap_or_default()
    }

    /// Apply a clip-rectangle request: negative origins are clamped to zero,
    /// and empty dimensions leave the prior rectangle in place.
    pub fn set_clip_rect(&mut self, left: i64, top: i64, width: i64, height: i64) {
        if width > 0 && height > 0 {
            self.clip = Some(ClipRect {
                left: left.max(0) as i32,
                top: top.max(0) as i32,
                width: width as u32,
                height: height as u32,
            });
        }
    }

    pub fn paper_size(&self) -> Option<&PaperConfig> {
        self.paper.as_ref()
    }

    pub fn set_paper_size(&mut self, paper: PaperConfig) {
        self.paper = Some(paper);
    }

    pub fn user_agent(&self) -> String {
        self.page.engine().user_agent()
    }

    pub fn set_user_agent(&mut self, user_agent: &str) {
        self.page.engine_mut().set_user_agent(user_agent);
    }

    pub fn content(&self) -> String {
        self.page.engine().content()
    }

    pub fn set_content(&mut self, html: &str) {
        self.page.engine_mut().set_content(html);
    }

    pub fn cookies_external(&self) -> Vec<Value> {
        self.page.engine().cookies().to_external()
    }

    pub fn set_cookies_external(&mut self, entries: &[Value]) -> bool {
        self.page.engine_mut().cookies_mut().set_from_external(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::CookieJar;
    use crate::engine::EngineEvent;
    use crate::rendering::paper::PageGeometry;
    use crate::rendering::raster::PixelSurface;
    use std::path::Path;

    struct StubEngine {
        jar: CookieJar,
        viewport: Viewport,
        content: String,
    }

    impl StubEngine {
        fn new() -> Self {
            Self {
                jar: CookieJar::new(),
                viewport: Viewport::default(),
                content: String::new(),
            }
        }
    }

    impl PageEngine for StubEngine {
        fn navigate(&mut self, _address: &str) {}
        fn stop(&mut self) {}
        fn commit_navigation(&mut self, _g: u64, _s: bool, _u: &str, _h: &str) -> bool {
            true
        }
        fn content(&self) -> String {
            self.content.clone()
        }
        fn set_content(&mut self, html: &str) {
            self.content = html.to_string();
        }
        fn content_size(&self) -> Size {
            Size::default()
        }
        fn viewport(&self) -> Viewport {
            self.viewport
        }
        fn set_viewport(&mut self, viewport: Viewport) {
            self.viewport = viewport;
        }
        fn user_agent(&self) -> String {
            String::new()
        }
        fn set_user_agent(&mut self, _ua: &str) {}
        fn paint(&self, _surface: &mut PixelSurface) {}
        fn print_paginated(&self, _g: &PageGeometry, _p: &Path) -> Result<()> {
            Ok(())
        }
        fn cookies(&self) -> &CookieJar {
            &self.jar
        }
        fn cookies_mut(&mut self) -> &mut CookieJar {
            &mut self.jar
        }
    }

    fn session() -> Session {
        Session::new(
            HostConfig::default(),
            Box::new(StubEngine::new()),
            Rc::new(Scheduler::new()),
        )
    }

    #[test]
    fn interrupt_hook_buffers_events_and_permits_continuation() {
        let session = session();
        let scheduler = session.scheduler();
        scheduler
            .sender()
            .send(EngineEvent::WindowCleared { generation: 1 })
            .unwrap();

        assert!(!session.should_interrupt_script());
        // The event was moved to pending, not dispatched.
        assert_eq!(scheduler.take_pending().len(), 1);
    }

    #[test]
    fn exit_severs_reexecution_and_requests_quit() {
        let mut session = session();
        session.exit(7);
        assert_eq!(session.exit_code(), 7);
        assert!(session.scheduler().quit_requested());
        assert!(!session.handle_load_finished(true));
        assert_eq!(session.load_status(), LoadStatus::NotLoaded);
    }

    #[test]
    fn exit_releases_the_output_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut session = session();
        session.set_output_path(path.to_str().unwrap());
        session.writeln("before");
        session.exit(0);
        session.writeln("after");

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "before\n");
    }

    #[test]
    fn shebang_line_is_neutralized() {
        let mut file = tempfile::NamedTempFile::with_suffix(".js").unwrap();
        writeln!(file, "#!/usr/bin/env runner").unwrap();
        writeln!(file, "var x = 1;").unwrap();

        let mut session = session();
        session.config.script_path = file.path().to_path_buf();
        session.prepare_script().unwrap();
        assert!(session.script().starts_with("//#!"));
    }

    #[test]
    fn missing_script_file_is_fatal() {
        let mut session = session();
        session.config.script_path = "/nonexistent/driver.js".into();
        assert!(matches!(
            session.prepare_script(),
            Err(Error::ScriptError(_))
        ));
    }

    #[test]
    fn secondary_dialect_without_converter_fails() {
        let mut file = tempfile::NamedTempFile::with_suffix(".coffee").unwrap();
        writeln!(file, "x = 1").unwrap();

        let mut session = session();
        session.config.script_path = file.path().to_path_buf();
        assert!(session.prepare_script().is_err());
    }

    #[test]
    fn secondary_dialect_goes_through_the_converter() {
        struct Upper;
        impl ScriptConverter for Upper {
            fn convert(&self, source: &str) -> Result<String> {
                Ok(source.to_uppercase())
            }
        }

        let mut file = tempfile::NamedTempFile::with_suffix(".coffee").unwrap();
        write!(file, "x = 1").unwrap();

        let mut session = session();
        session.set_converter(Box::new(Upper));
        session.config.script_path = file.path().to_path_buf();
        session.prepare_script().unwrap();
        assert_eq!(session.script(), "X = 1");
    }
}
