//! Wraith headless automation host
//!
//! Wraith loads a driving script, steers a single page through navigation,
//! re-runs the script whenever a page load completes, and exports the rendered
//! page as a raster image or a paginated document.
//!
//! The crate is split along the seams it actually has at runtime:
//!
//! - [`session`]: the page-lifecycle controller owning one page, its load
//!   status, and the script-visible state
//! - [`script`]: the boa-backed script host exposing the `wraith` global
//! - [`engine`]: the narrow contract consumed from a browser-engine backend,
//!   plus the built-in HTTP backend
//! - [`rendering`]: raster capture and paginated export, including physical
//!   unit handling
//! - [`cookies`]: lossless translation between the engine cookie store and
//!   the structured list form scripts see
//!
//! # Example
//!
//! ```no_run
//! use std::rc::Rc;
//! use wraith::{HostConfig, Scheduler, Session, SoftEngine, ScriptHost};
//!
//! # fn main() -> wraith::Result<()> {
//! let config = HostConfig {
//!     script_path: "capture.js".into(),
//!     ..Default::default()
//! };
//! let scheduler = Rc::new(Scheduler::new());
//! let engine = SoftEngine::new(&config, scheduler.sender())?;
//! let session = Session::new(config, Box::new(engine), scheduler.clone()).into_handle();
//! session.borrow_mut().prepare_script()?;
//!
//! let mut host = ScriptHost::new(session.clone())?;
//! host.run(&session)?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod cookies;
pub mod engine;
pub mod error;
pub mod event_loop;
pub mod rendering;
pub mod script;
pub mod session;

pub use cookies::{Cookie, CookieJar};
pub use engine::soft::SoftEngine;
pub use engine::{ClipRect, EngineEvent, PageEngine, Size};
pub use error::{Error, Result};
pub use event_loop::Scheduler;
pub use rendering::paper::{PageGeometry, PaperConfig};
pub use script::ScriptHost;
pub use session::{LoadStatus, Session, SessionHandle};

/// Proxy endpoint applied to every outgoing request of the engine backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

/// Configuration for one host run
///
/// Built from the command line before the core is constructed; the core only
/// ever sees the resulting values. The defaults are the ones an invocation
/// without options gets.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Path of the driving script
    pub script_path: PathBuf,
    /// Residual arguments exposed to the script as a read-only sequence
    pub script_args: Vec<String>,
    /// HTTP proxy, if any; absent means direct connections
    pub proxy: Option<ProxyConfig>,
    /// Whether the engine should fetch images during layout
    pub auto_load_images: bool,
    /// Whether browser plugins are enabled in the engine
    pub plugins_enabled: bool,
    /// Upload grants keyed by an opaque tag (`--upload-file tag=path`)
    pub upload_grants: HashMap<String, String>,
    /// Default user agent served for every request
    pub user_agent: String,
    /// Initial viewport dimensions
    pub viewport: Viewport,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            script_path: PathBuf::new(),
            script_args: Vec::new(),
            proxy: None,
            auto_load_images: true,
            plugins_enabled: false,
            upload_grants: HashMap::new(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) Wraith/1.1".to_string(),
            viewport: Viewport::default(),
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Host version, exposed to scripts as a read-only structured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Version of the running host, parsed from the crate version.
pub fn version() -> Version {
    let mut parts = env!("CARGO_PKG_VERSION")
        .split('.')
        .map(|p| p.parse::<u32>().unwrap_or(0));
    Version {
        major: parts.next().unwrap_or(0),
        minor: parts.next().unwrap_or(0),
        patch: parts.next().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.viewport.height, 720);
        assert!(config.auto_load_images);
        assert!(!config.plugins_enabled);
    }

    #[test]
    fn test_version_matches_crate() {
        let v = version();
        assert_eq!(
            format!("{}.{}.{}", v.major, v.minor, v.patch),
            env!("CARGO_PKG_VERSION")
        );
    }
}
