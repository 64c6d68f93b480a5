use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::debug;

use wraith::event_loop::{Scheduler, PUMP_SLICE};
use wraith::script::ScriptHost;
use wraith::session::Session;
use wraith::{HostConfig, ProxyConfig, SoftEngine};

const DEFAULT_PROXY_PORT: u16 = 1080;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Toggle {
    Yes,
    No,
}

impl Toggle {
    fn enabled(self) -> bool {
        matches!(self, Toggle::Yes)
    }
}

/// Minimalistic headless browser scripting host.
#[derive(Debug, Parser)]
#[command(name = "wraith", version, about)]
struct Cli {
    /// Set the network proxy (address:port).
    #[arg(long, value_name = "address:port")]
    proxy: Option<String>,

    /// Load inlined images.
    #[arg(long = "load-images", value_enum, default_value_t = Toggle::Yes)]
    load_images: Toggle,

    /// Load plugins.
    #[arg(long = "load-plugins", value_enum, default_value_t = Toggle::No)]
    load_plugins: Toggle,

    /// Pre-authorize a file for form upload (tag=path). Repeatable.
    #[arg(long = "upload-file", value_name = "tag=path")]
    upload_file: Vec<String>,

    /// Script to execute.
    script: PathBuf,

    /// Arguments passed through to the script.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

/// Split a proxy spec into host and port. Everything up to the last colon
/// is the host, so bare addresses without a port still parse; the default
/// port is 1080.
fn parse_proxy(spec: &str) -> ProxyConfig {
    match spec.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => ProxyConfig {
            host: host.to_string(),
            port: port.parse().unwrap_or(DEFAULT_PROXY_PORT),
        },
        _ => ProxyConfig {
            host: spec.trim_end_matches(':').to_string(),
            port: DEFAULT_PROXY_PORT,
        },
    }
}

fn parse_upload_grants(specs: &[String]) -> HashMap<String, String> {
    let mut grants = HashMap::new();
    for spec in specs {
        match spec.split_once('=') {
            Some((tag, path)) if !tag.is_empty() => {
                grants.insert(tag.to_string(), path.to_string());
            }
            _ => debug!("ignoring malformed upload grant {spec:?}"),
        }
    }
    grants
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = HostConfig {
        script_path: cli.script,
        script_args: cli.args,
        proxy: cli.proxy.as_deref().map(parse_proxy),
        auto_load_images: cli.load_images.enabled(),
        plugins_enabled: cli.load_plugins.enabled(),
        upload_grants: parse_upload_grants(&cli.upload_file),
        ..HostConfig::default()
    };

    let scheduler = Rc::new(Scheduler::new());
    let engine =
        SoftEngine::new(&config, scheduler.sender()).context("failed to start the page engine")?;

    let mut session = Session::new(config, Box::new(engine), Rc::clone(&scheduler));
    session.prepare_script()?;
    let session = session.into_handle();

    let mut host = ScriptHost::new(Rc::clone(&session))?;
    host.run(&session)?;

    // Service the event queue until the script asks to leave. Navigation
    // completions re-run the script from here.
    loop {
        if scheduler.quit_requested() {
            break;
        }
        for event in scheduler.pump(PUMP_SLICE) {
            host.dispatch(&session, event);
        }
    }

    let code = session.borrow().exit_code();
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_spec_with_port() {
        let proxy = parse_proxy("10.0.0.1:8080");
        assert_eq!(proxy.host, "10.0.0.1");
        assert_eq!(proxy.port, 8080);
    }

    #[test]
    fn proxy_spec_without_port_gets_default() {
        let proxy = parse_proxy("proxy.example.com");
        assert_eq!(proxy.host, "proxy.example.com");
        assert_eq!(proxy.port, 1080);
    }

    #[test]
    fn proxy_spec_with_bad_port_gets_default() {
        let proxy = parse_proxy("proxy.example.com:zz");
        assert_eq!(proxy.port, 1080);
    }

    #[test]
    fn upload_grants_parse_and_skip_garbage() {
        let grants = parse_upload_grants(&[
            "avatar=/tmp/a.png".to_string(),
            "noequals".to_string(),
            "=orphan".to_string(),
        ]);
        assert_eq!(grants.len(), 1);
        assert_eq!(grants["avatar"], "/tmp/a.png");
    }
}
