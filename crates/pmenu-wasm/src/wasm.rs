#![forbid(unsafe_code)]

//! `wasm-bindgen` entry point and the `window.PandaMenu` global.
//!
//! Only compiled on `wasm32` targets.

use core::time::Duration;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Object, Reflect};
use pmenu_web::document::ObserverId;
use pmenu_web::{InitOutcome, MenuRuntime};
use tracing::Level;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::bootstrap::{self, CONFIG_GLOBAL_NAME, GLOBAL_NAME};
use crate::console::{self, ConsoleLevel, ConsoleSink};
use crate::dom::{DomMenuWidget, MutationSink, WebDocument};

type WasmRuntime = MenuRuntime<WebDocument, DomMenuWidget>;

thread_local! {
    static RUNTIME: RefCell<Option<WasmRuntime>> = const { RefCell::new(None) };
    /// Deadline of the pending wakeup timer, if any.
    static SCHEDULED: Cell<Option<Duration>> = const { Cell::new(None) };
}

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<js_sys::Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "{} panic at {}:{}:{}: {info}",
                    console::LOG_PREFIX,
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("{} panic: {info}", console::LOG_PREFIX)
            };
            console_error(&msg);
        }));
    });
}

#[derive(Debug, Clone, Copy)]
struct BrowserConsole;

impl ConsoleSink for BrowserConsole {
    fn emit(&self, level: ConsoleLevel, line: &str) {
        let line = JsValue::from_str(line);
        match level {
            ConsoleLevel::Log => web_sys::console::log_1(&line),
            ConsoleLevel::Warn => web_sys::console::warn_1(&line),
            ConsoleLevel::Error => web_sys::console::error_1(&line),
        }
    }
}

fn install_logging() {
    // A page may load the script twice; the first subscriber stays.
    let subscriber = console::subscriber(BrowserConsole, Level::INFO);
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn set_js(obj: &Object, key: &str, value: JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), &value);
}

fn get_js(obj: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(obj, &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

fn json_of(value: &JsValue) -> Option<String> {
    js_sys::JSON::stringify(value).ok().map(String::from)
}

fn now() -> Duration {
    let ms = web_sys::window()
        .and_then(|window| window.performance())
        .map_or(0.0, |performance| performance.now());
    if ms.is_finite() && ms >= 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}

fn set_timeout(callback: impl FnOnce() + 'static, delay: Duration) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let callback = Closure::once_into_js(callback);
    let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
    if let Err(err) = window
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis)
    {
        tracing::error!(error = ?err, "setTimeout failed");
    }
}

fn runtime_busy() -> bool {
    RUNTIME.with(|slot| slot.try_borrow_mut().is_err())
}

/// Run `f` on the runtime after syncing its clock, then re-arm the wakeup
/// timer. Skipped if the runtime is missing or already borrowed.
fn with_runtime<R>(call: &'static str, f: impl FnOnce(&mut WasmRuntime) -> R) -> Option<R> {
    RUNTIME.with(|slot| {
        let Ok(mut guard) = slot.try_borrow_mut() else {
            tracing::debug!(call, "runtime busy, call skipped");
            return None;
        };
        let runtime = guard.as_mut()?;
        runtime.set_time(now());
        let result = f(runtime);
        let next = runtime.next_wakeup();
        let current = runtime.now();
        drop(guard);
        schedule_wakeup(next, current);
        Some(result)
    })
}

fn schedule_wakeup(next: Option<Duration>, current: Duration) {
    let Some(at) = next else {
        return;
    };
    if SCHEDULED.with(Cell::get) == Some(at) {
        return;
    }
    SCHEDULED.with(|scheduled| scheduled.set(Some(at)));
    set_timeout(
        move || {
            SCHEDULED.with(|scheduled| {
                if scheduled.get() == Some(at) {
                    scheduled.set(None);
                }
            });
            with_runtime("wakeup", |_| ());
        },
        at.saturating_sub(current),
    );
}

fn deliver_mutations(observer: ObserverId) {
    if runtime_busy() {
        set_timeout(move || deliver_mutations(observer), Duration::ZERO);
        return;
    }
    with_runtime("mutations", |runtime| runtime.handle_mutations(observer));
}

fn bind0(api: &Object, name: &str, call: &'static str, f: fn(&mut WasmRuntime)) {
    let closure = Closure::<dyn Fn()>::new(move || {
        with_runtime(call, f);
    });
    set_js(api, name, closure.into_js_value());
}

fn publish_api(api: &Object) {
    let render = Closure::<dyn Fn(JsValue, JsValue, JsValue)>::new(
        |target: JsValue, mode: JsValue, sidebar: JsValue| {
            let target = target.dyn_into::<web_sys::Node>().ok();
            let mode = bootstrap::parse_mode(mode.as_string().as_deref());
            let sidebar = bootstrap::parse_sidebar(json_of(&sidebar).as_deref());
            with_runtime("render", |runtime| runtime.render(target, mode, sidebar));
        },
    );
    set_js(api, "render", render.into_js_value());

    let attach = Closure::<dyn Fn(JsValue)>::new(|selector: JsValue| {
        match bootstrap::parse_selector(selector.as_string()) {
            Some(selector) => {
                with_runtime("attach", |runtime| runtime.attach(&selector));
            }
            None => tracing::warn!("attach needs a CSS selector"),
        }
    });
    set_js(api, "attach", attach.into_js_value());

    bind0(api, "cleanup", "cleanup", |runtime| {
        runtime.cleanup();
    });
    bind0(api, "open", "open", |runtime| runtime.open());
    bind0(api, "close", "close", |runtime| runtime.close());
    bind0(api, "toggle", "toggle", |runtime| runtime.toggle());
    set_js(api, "initialized", JsValue::TRUE);
}

#[wasm_bindgen(start)]
pub fn start() {
    install_panic_hook();
    install_logging();

    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    let global: JsValue = window.into();

    let existing = get_js(&global, GLOBAL_NAME).and_then(|value| value.dyn_into::<Object>().ok());
    if existing
        .as_ref()
        .and_then(|api| get_js(api, "initialized"))
        .and_then(|flag| flag.as_bool())
        == Some(true)
    {
        tracing::debug!("already initialized on this page");
        return;
    }

    let overrides = bootstrap::merge_overrides(
        get_js(&global, CONFIG_GLOBAL_NAME).and_then(|config| json_of(&config)).as_deref(),
        existing.as_ref().and_then(|api| json_of(api)).as_deref(),
    );

    let sink: MutationSink = Rc::new(deliver_mutations);
    let runtime = MenuRuntime::new(WebDocument::new(document.clone(), sink), DomMenuWidget)
        .with_overrides(overrides);
    RUNTIME.with(|slot| *slot.borrow_mut() = Some(runtime));

    let api = existing.unwrap_or_else(Object::new);
    publish_api(&api);
    if let Err(err) = Reflect::set(&global, &JsValue::from_str(GLOBAL_NAME), &api) {
        tracing::error!(error = ?err, "failed to publish window.{GLOBAL_NAME}");
    }

    if with_runtime("initialize", WasmRuntime::initialize) == Some(InitOutcome::AwaitingDocument) {
        let ready = Closure::once_into_js(|| {
            with_runtime("document_ready", WasmRuntime::document_ready);
        });
        if let Err(err) =
            document.add_event_listener_with_callback("DOMContentLoaded", ready.unchecked_ref())
        {
            tracing::error!(error = ?err, "failed to wait for DOMContentLoaded");
        }
    }
}
