//! Script host built on Boa.
//!
//! The session's scriptable handle is exposed to page script as the
//! `wraith` global. Native functions bridge between JS and the session
//! through a JSON-string protocol; a JS prelude (`host_bindings.js`)
//! builds the ergonomic object surface on top of it. The prelude is
//! re-evaluated on every fresh script environment, which is how bindings
//! survive navigations.
//!
//! State crosses into the fn-pointer natives through a thread-local
//! registry holding the active session handle; there is exactly one
//! logical thread of control, so no locking is involved.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use boa_engine::native_function::{NativeFunction, NativeFunctionPointer};
use boa_engine::{js_string, Context, JsResult, JsString, JsValue, Source};
use log::{debug, warn};
use serde_json::{json, Value};

use crate::engine::EngineEvent;
use crate::event_loop::PUMP_SLICE;
use crate::session::SessionHandle;
use crate::{Error, Result};

thread_local! {
    static ACTIVE_SESSION: RefCell<Option<SessionHandle>> = const { RefCell::new(None) };
}

fn active_session() -> Option<SessionHandle> {
    ACTIVE_SESSION.with(|slot| slot.borrow().clone())
}

pub struct ScriptHost {
    ctx: Context,
}

impl ScriptHost {
    /// Create the script environment for a session: registers the native
    /// bridge and installs the `wraith` bindings before any script runs.
    pub fn new(session: SessionHandle) -> Result<Self> {
        ACTIVE_SESSION.with(|slot| *slot.borrow_mut() = Some(session));
        let mut ctx = Context::default();
        register_natives(&mut ctx)?;
        inject(&mut ctx)?;
        Ok(Self { ctx })
    }

    /// Run the session's prepared script in its entirety. A throwing script
    /// is reported but does not fail the host; only a missing script does.
    pub fn run(&mut self, session: &SessionHandle) -> Result<()> {
        let script = session.borrow().script();
        if script.is_empty() {
            return Err(Error::ScriptError("no script loaded".into()));
        }
        if let Err(e) = self.ctx.eval(Source::from_bytes(script.as_bytes())) {
            warn!("script thrown: {e}");
        }
        Ok(())
    }

    /// Evaluate an ad-hoc snippet, returning its display form.
    pub fn eval(&mut self, code: &str) -> Result<String> {
        self.ctx
            .eval(Source::from_bytes(code.as_bytes()))
            .map(|value| format!("{}", value.display()))
            .map_err(|e| Error::ScriptError(format!("script thrown: {e}")))
    }

    /// Dispatch one engine event against this host's context.
    pub fn dispatch(&mut self, session: &SessionHandle, event: EngineEvent) {
        dispatch_event(session, &mut self.ctx, event);
    }
}

/// Bind the host object into the script environment. Must run before any
/// script executes there, and again on every fresh environment.
pub fn inject(ctx: &mut Context) -> Result<()> {
    ctx.eval(Source::from_bytes(include_str!("host_bindings.js").as_bytes()))
        .map(|_| ())
        .map_err(|e| Error::ScriptError(format!("failed to install host bindings: {e}")))
}

/// React to one engine event: re-inject bindings into fresh environments,
/// and on a still-current load completion update the status and re-run the
/// whole script in the shared environment.
pub fn dispatch_event(session: &SessionHandle, ctx: &mut Context, event: EngineEvent) {
    match event {
        EngineEvent::WindowCleared { .. } => {
            if let Err(e) = inject(ctx) {
                warn!("{e}");
            }
        }
        EngineEvent::LoadFinished {
            generation,
            success,
            url,
            html,
        } => {
            let rerun = {
                let mut session_ref = session.borrow_mut();
                let committed = session_ref
                    .page_mut()
                    .engine_mut()
                    .commit_navigation(generation, success, &url, &html);
                committed && session_ref.handle_load_finished(success)
            };
            if rerun {
                evaluate_current(session, ctx);
            }
        }
    }
}

/// Re-run the session's script in its entirety. Global state from earlier
/// runs persists; scripts branch on `state`/`loadStatus` to tell passes
/// apart.
fn evaluate_current(session: &SessionHandle, ctx: &mut Context) {
    let script = session.borrow().script();
    if script.is_empty() {
        return;
    }
    if let Err(e) = ctx.eval(Source::from_bytes(script.as_bytes())) {
        warn!("script thrown: {e}");
    }
}

fn register_natives(ctx: &mut Context) -> Result<()> {
    let bindings: [(JsString, usize, NativeFunctionPointer); 5] = [
        (js_string!("__wraith_get"), 1, host_get),
        (js_string!("__wraith_set"), 2, host_set),
        (js_string!("__wraith_call"), 2, host_call),
        (js_string!("__wraith_console"), 1, host_console),
        (js_string!("__wraith_alert"), 1, host_alert),
    ];
    for (name, length, body) in bindings {
        ctx.register_global_builtin_callable(name, length, NativeFunction::from_fn_ptr(body))
            .map_err(|e| Error::InitializationError(format!("native registration failed: {e}")))?;
    }
    Ok(())
}

fn arg_string(args: &[JsValue], index: usize, ctx: &mut Context) -> String {
    args.get(index)
        .and_then(|value| value.to_string(ctx).ok())
        .map(|s| s.to_std_string_escaped())
        .unwrap_or_default()
}

fn js_text(text: String) -> JsValue {
    JsValue::from(JsString::from(text.as_str()))
}

fn host_get(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let name = arg_string(args, 0, ctx);
    let session = match active_session() {
        Some(session) => session,
        None => return Ok(js_text("null".into())),
    };
    let session = session.borrow();
    let value = match name.as_str() {
        "args" => json!(session.args()),
        "content" => Value::String(session.content()),
        "loadStatus" => Value::String(session.load_status().as_str().to_string()),
        "state" => Value::String(session.state().to_string()),
        "userAgent" => Value::String(session.user_agent()),
        "version" => serde_json::to_value(crate::version()).unwrap_or(Value::Null),
        "viewportSize" => serde_json::to_value(session.viewport_size()).unwrap_or(Value::Null),
        "clipRect" => serde_json::to_value(session.clip_rect()).unwrap_or(Value::Null),
        "paperSize" => session
            .paper_size()
            .and_then(|paper| serde_json::to_value(paper).ok())
            .unwrap_or_else(|| json!({})),
        "cookies" => Value::Array(session.cookies_external()),
        other => {
            debug!("script read unknown host field {other:?}");
            Value::Null
        }
    };
    Ok(js_text(value.to_string()))
}

fn host_set(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let name = arg_string(args, 0, ctx);
    let raw = arg_string(args, 1, ctx);
    let parsed: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);

    let session = match active_session() {
        Some(session) => session,
        None => return Ok(JsValue::from(false)),
    };
    let mut session = session.borrow_mut();
    let applied = match name.as_str() {
        "content" => {
            session.set_content(parsed.as_str().unwrap_or_default());
            true
        }
        "state" => {
            session.set_state(parsed.as_str().unwrap_or_default());
            true
        }
        "userAgent" => {
            session.set_user_agent(parsed.as_str().unwrap_or_default());
            true
        }
        "viewportSize" => {
            let width = parsed.get("width").and_then(Value::as_i64).unwrap_or(0);
            let height = parsed.get("height").and_then(Value::as_i64).unwrap_or(0);
            session.set_viewport_size(width, height);
            true
        }
        "clipRect" => {
            let left = parsed.get("left").and_then(Value::as_i64).unwrap_or(0);
            let top = parsed.get("top").and_then(Value::as_i64).unwrap_or(0);
            let width = parsed.get("width").and_then(Value::as_i64).unwrap_or(0);
            let height = parsed.get("height").and_then(Value::as_i64).unwrap_or(0);
            session.set_clip_rect(left, top, width, height);
            true
        }
        "paperSize" => {
            // Garbage configurations are absorbed; the prior value stays.
            match serde_json::from_value(parsed) {
                Ok(paper) => {
                    session.set_paper_size(paper);
                    true
                }
                Err(e) => {
                    debug!("ignoring invalid paper configuration: {e}");
                    false
                }
            }
        }
        "cookies" => match parsed.as_array() {
            Some(entries) => session.set_cookies_external(entries),
            None => false,
        },
        other => {
            debug!("script wrote unknown host field {other:?}");
            false
        }
    };
    Ok(JsValue::from(applied))
}

fn host_call(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let name = arg_string(args, 0, ctx);
    let raw = arg_string(args, 1, ctx);
    let call_args: Vec<Value> = serde_json::from_str(&raw).unwrap_or_default();

    let session = match active_session() {
        Some(session) => session,
        None => return Ok(js_text("null".into())),
    };

    let result = match name.as_str() {
        "exit" => {
            let code = call_args.first().and_then(Value::as_i64).unwrap_or(0);
            session.borrow_mut().exit(code as i32);
            Value::Null
        }
        "open" => {
            let address = call_args
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            session.borrow_mut().open(&address);
            Value::Null
        }
        "render" => {
            let file_name = call_args
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Value::Bool(session.borrow_mut().render(&file_name))
        }
        "sleep" => {
            let ms = call_args.first().and_then(Value::as_f64).unwrap_or(0.0);
            sleep_pumping(&session, ctx, Duration::from_millis(ms.max(0.0) as u64));
            Value::Null
        }
        "setOutputPath" => {
            let path = call_args
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            session.borrow_mut().set_output_path(&path);
            Value::Null
        }
        "write" => {
            let text = call_args
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            session.borrow_mut().write(&text);
            Value::Null
        }
        "writeln" => {
            let text = call_args
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            session.borrow_mut().writeln(&text);
            Value::Null
        }
        "setFormInputFile" => {
            // The selector is advisory; grants are keyed by tag alone.
            let tag = call_args
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            session.borrow_mut().page_mut().arm_upload(&tag);
            Value::Null
        }
        other => {
            debug!("script invoked unknown host operation {other:?}");
            Value::Null
        }
    };
    Ok(js_text(result.to_string()))
}

/// Block the calling script for at least `duration` while servicing the
/// host's pending event queue in short slices. Navigation completions that
/// arrive mid-sleep are dispatched here, including full script re-execution.
fn sleep_pumping(session: &SessionHandle, ctx: &mut Context, duration: Duration) {
    let scheduler = session.borrow().scheduler();
    let deadline = Instant::now() + duration;
    loop {
        if scheduler.quit_requested() {
            break;
        }
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let slice = (deadline - now).min(PUMP_SLICE);
        for event in scheduler.pump(slice) {
            dispatch_event(session, ctx, event);
        }
    }
}

fn host_console(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let text = arg_string(args, 0, ctx);
    println!("{text}");
    Ok(JsValue::undefined())
}

fn host_alert(_this: &JsValue, args: &[JsValue], ctx: &mut Context) -> JsResult<JsValue> {
    let text = arg_string(args, 0, ctx);
    println!("JavaScript alert: {text}");
    Ok(JsValue::undefined())
}
