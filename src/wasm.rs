//! WASM bindings for the admin sidebar
//!
//! This module implements [`Host`] on top of `web-sys` and exposes a
//! JavaScript entry point:
//!
//! ```javascript,ignore
//! import init, { AdminNav, initLogging } from './admin_nav.js';
//!
//! await init();
//! initLogging('debug');
//! const nav = AdminNav.start();          // or AdminNav.start(JSON.stringify(config))
//! console.log(nav.snapshotJson());
//! nav.teardown();
//! ```
//!
//! The engine lives in an `Rc<RefCell<_>>` shared by every listener. No
//! listener calls back into the engine while it is borrowed: keyboard
//! activation re-dispatches a DOM click instead of toggling directly.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, EventTarget, HtmlElement, KeyboardEvent, TransitionEvent, Window};

use crate::bootstrap::{BootStatus, RetryLoop};
use crate::config::NavConfig;
use crate::error::{NavError, NavResult};
use crate::host::{is_activation_key, FrameId, Host};
use crate::menu::NavMenu;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

// ========================
// Logging
// ========================

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[admin-nav] {}", record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&line),
            log::Level::Warn => web_sys::console::warn_1(&line),
            log::Level::Info => web_sys::console::info_1(&line),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

/// Route `log` output to the browser console. Unknown levels mean `warn`.
#[wasm_bindgen(js_name = "initLogging")]
pub fn init_logging(level: &str) {
    let filter = level.parse().unwrap_or(log::LevelFilter::Warn);
    // A second call only changes the level.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(filter);
}

fn js_err(err: JsValue) -> NavError {
    NavError::Dom(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

// ========================
// Host
// ========================

struct ToggleListeners {
    toggle: Element,
    click: Closure<dyn FnMut(Event)>,
    keydown: Closure<dyn FnMut(KeyboardEvent)>,
}

impl ToggleListeners {
    fn detach(&self) {
        let _ = self
            .toggle
            .remove_event_listener_with_callback("click", self.click.as_ref().unchecked_ref());
        let _ = self
            .toggle
            .remove_event_listener_with_callback("keydown", self.keydown.as_ref().unchecked_ref());
    }
}

struct FrameRequest {
    handle: i32,
    callback: Closure<dyn FnMut()>,
}

struct TransitionListener {
    panel: Element,
    callback: Closure<dyn FnMut(TransitionEvent)>,
}

/// [`Host`] backed by the live document
pub struct WebHost {
    window: Window,
    document: Document,
    runtime: Weak<Runtime>,
    toggles: RefCell<HashMap<String, ToggleListeners>>,
    transitions: RefCell<HashMap<String, TransitionListener>>,
    frames: RefCell<HashMap<FrameId, FrameRequest>>,
    /// Callbacks of frames that already ran; freed on the next request
    spent_frames: RefCell<Vec<Closure<dyn FnMut()>>>,
}

impl WebHost {
    fn new(window: Window, document: Document, runtime: Weak<Runtime>) -> Self {
        Self {
            window,
            document,
            runtime,
            toggles: RefCell::new(HashMap::new()),
            transitions: RefCell::new(HashMap::new()),
            frames: RefCell::new(HashMap::new()),
            spent_frames: RefCell::new(Vec::new()),
        }
    }

    fn html(node: &Element) -> NavResult<&HtmlElement> {
        node.dyn_ref::<HtmlElement>()
            .ok_or_else(|| NavError::Dom(format!("#{} is not an HTML element", node.id())))
    }

    /// Remove every listener this host attached and cancel pending frames
    fn detach_all(&self) {
        for (_, listeners) in self.toggles.borrow_mut().drain() {
            listeners.detach();
        }
        for (_, listener) in self.transitions.borrow_mut().drain() {
            let _ = listener
                .panel
                .remove_event_listener_with_callback("transitionend", listener.callback.as_ref().unchecked_ref());
        }
        for (_, request) in self.frames.borrow_mut().drain() {
            let _ = self.window.cancel_animation_frame(request.handle);
        }
        self.spent_frames.borrow_mut().clear();
    }

    /// Move a frame that has fired out of the pending table. Its callback is
    /// still running, so it is parked instead of dropped.
    fn retire_frame(&self, frame: FrameId) {
        if let Some(request) = self.frames.borrow_mut().remove(&frame) {
            self.spent_frames.borrow_mut().push(request.callback);
        }
    }
}

impl Host for WebHost {
    type Node = Element;

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn query_all(&self, selector: &str) -> NavResult<Vec<Element>> {
        let list = self.document.query_selector_all(selector).map_err(js_err)?;
        Ok((0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect())
    }

    fn contains(&self, ancestor: &Element, node: &Element) -> bool {
        let node: &web_sys::Node = node;
        ancestor.contains(Some(node))
    }

    fn location_href(&self) -> NavResult<String> {
        self.window.location().href().map_err(js_err)
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) -> NavResult<()> {
        node.set_attribute(name, value).map_err(js_err)
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn add_class(&self, node: &Element, class: &str) -> NavResult<()> {
        node.class_list().add_1(class).map_err(js_err)
    }

    fn remove_class(&self, node: &Element, class: &str) -> NavResult<()> {
        node.class_list().remove_1(class).map_err(js_err)
    }

    fn style_property(&self, node: &Element, name: &str) -> String {
        node.dyn_ref::<HtmlElement>()
            .and_then(|el| el.style().get_property_value(name).ok())
            .unwrap_or_default()
    }

    fn set_style_property(&self, node: &Element, name: &str, value: &str) -> NavResult<()> {
        let style = Self::html(node)?.style();
        if value.is_empty() {
            style.remove_property(name).map(|_| ()).map_err(js_err)
        } else {
            style.set_property(name, value).map_err(js_err)
        }
    }

    fn scroll_height(&self, node: &Element) -> i32 {
        node.scroll_height()
    }

    fn force_layout(&self, node: &Element) {
        if let Some(el) = node.dyn_ref::<HtmlElement>() {
            let _ = el.offset_height();
        }
    }

    fn inject_stylesheet(&self, id: &str, css: &str) -> NavResult<()> {
        let style = self.document.create_element("style").map_err(js_err)?;
        style.set_id(id);
        style.set_text_content(Some(css));
        let head = self
            .document
            .head()
            .ok_or_else(|| NavError::ElementMissing("head".into()))?;
        head.append_child(&style).map_err(js_err)?;
        Ok(())
    }

    fn request_frame(&self, group: &str, frame: FrameId) -> NavResult<()> {
        self.spent_frames.borrow_mut().clear();

        let runtime = self.runtime.clone();
        let group = group.to_string();
        let callback = Closure::<dyn FnMut()>::new(move || {
            if let Some(runtime) = runtime.upgrade() {
                runtime.on_frame(&group, frame);
            }
        });
        let handle = self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
            .map_err(js_err)?;
        self.frames
            .borrow_mut()
            .insert(frame, FrameRequest { handle, callback });
        Ok(())
    }

    fn cancel_frame(&self, frame: FrameId) {
        // Dropping the request frees its callback.
        if let Some(request) = self.frames.borrow_mut().remove(&frame) {
            let _ = self.window.cancel_animation_frame(request.handle);
        }
    }

    fn listen_toggle(&self, group: &str, toggle: &Element) -> NavResult<()> {
        let runtime = self.runtime.clone();
        let key = group.to_string();
        let click = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            event.prevent_default();
            event.stop_propagation();
            if let Some(runtime) = runtime.upgrade() {
                runtime.menu.borrow_mut().on_toggle_click(&runtime.host, &key);
            }
        });

        let target = toggle.clone();
        let keydown = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
            if is_activation_key(&event.key(), event.key_code()) {
                event.prevent_default();
                if let Some(el) = target.dyn_ref::<HtmlElement>() {
                    el.click();
                }
            }
        });

        toggle
            .add_event_listener_with_callback("click", click.as_ref().unchecked_ref())
            .map_err(js_err)?;
        if let Err(err) =
            toggle.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())
        {
            let _ = toggle.remove_event_listener_with_callback("click", click.as_ref().unchecked_ref());
            return Err(js_err(err));
        }

        let previous = self.toggles.borrow_mut().insert(
            group.to_string(),
            ToggleListeners {
                toggle: toggle.clone(),
                click,
                keydown,
            },
        );
        if let Some(previous) = previous {
            previous.detach();
            log::debug!("[{group}] moved toggle handlers to the new toggle");
        }
        Ok(())
    }

    fn listen_transition_end(&self, group: &str, panel: &Element) -> NavResult<()> {
        let mut transitions = self.transitions.borrow_mut();
        if let Some(existing) = transitions.get(group) {
            if existing.panel == *panel {
                return Ok(());
            }
            let _ = existing
                .panel
                .remove_event_listener_with_callback("transitionend", existing.callback.as_ref().unchecked_ref());
        }

        let runtime = self.runtime.clone();
        let key = group.to_string();
        let callback = Closure::<dyn FnMut(TransitionEvent)>::new(move |event: TransitionEvent| {
            if let Some(runtime) = runtime.upgrade() {
                runtime
                    .menu
                    .borrow_mut()
                    .on_transition_end(&runtime.host, &key, &event.property_name());
            }
        });
        panel
            .add_event_listener_with_callback("transitionend", callback.as_ref().unchecked_ref())
            .map_err(js_err)?;
        transitions.insert(
            group.to_string(),
            TransitionListener {
                panel: panel.clone(),
                callback,
            },
        );
        Ok(())
    }
}

// ========================
// Runtime
// ========================

struct Runtime {
    menu: RefCell<NavMenu<Element>>,
    host: WebHost,
    retry: RefCell<Option<RetryLoop>>,
    booted: Cell<bool>,
    interval: Cell<Option<i32>>,
    interval_callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl Runtime {
    fn boot(self: &Rc<Self>) {
        if self.booted.replace(true) {
            return;
        }
        let (retry, status) = {
            let mut menu = self.menu.borrow_mut();
            RetryLoop::start(&mut *menu, &self.host)
        };
        *self.retry.borrow_mut() = Some(retry);
        if status == BootStatus::Pending {
            self.start_interval();
        }
    }

    fn start_interval(self: &Rc<Self>) {
        let interval_ms = self.menu.borrow().config().retry.interval_ms;
        let runtime = Rc::downgrade(self);
        let callback = Closure::<dyn FnMut()>::new(move || {
            if let Some(runtime) = runtime.upgrade() {
                runtime.tick();
            }
        });
        match self
            .host
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                i32::try_from(interval_ms).unwrap_or(i32::MAX),
            ) {
            Ok(handle) => {
                self.interval.set(Some(handle));
                // The callback is kept alive until teardown, never dropped from inside itself.
                *self.interval_callback.borrow_mut() = Some(callback);
            }
            Err(err) => log::debug!("could not start retry interval: {}", js_err(err)),
        }
    }

    fn tick(&self) {
        let outcome = {
            let mut retry = self.retry.borrow_mut();
            let Some(retry) = retry.as_mut() else {
                return;
            };
            let mut menu = self.menu.borrow_mut();
            retry.tick(&mut *menu, &self.host)
        };
        if outcome.is_final() {
            self.stop_interval();
        }
    }

    fn stop_interval(&self) {
        if let Some(handle) = self.interval.take() {
            self.host.window.clear_interval_with_handle(handle);
        }
    }

    fn on_frame(&self, group: &str, frame: FrameId) {
        self.host.retire_frame(frame);
        self.menu
            .borrow_mut()
            .on_animation_frame(&self.host, group, frame);
    }

    fn highlight(&self) {
        self.menu.borrow_mut().highlight(&self.host);
    }
}

fn event_element(target: EventTarget) -> Option<Element> {
    match target.dyn_into::<Element>() {
        Ok(element) => Some(element),
        Err(target) => target
            .dyn_into::<web_sys::Node>()
            .ok()
            .and_then(|node| node.parent_element()),
    }
}

/// Installed menu. Owns every document-level listener; dropping it tears
/// everything down.
pub struct NavHandle {
    runtime: Rc<Runtime>,
    document_click: Closure<dyn FnMut(Event)>,
    hash_change: Closure<dyn FnMut(Event)>,
    dom_ready: Option<Closure<dyn FnMut(Event)>>,
    torn_down: bool,
}

/// Install the menu on the current document. Startup waits for
/// `DOMContentLoaded` while the document is still loading.
pub fn install(config: NavConfig) -> NavResult<NavHandle> {
    let window = web_sys::window().ok_or_else(|| NavError::Dom("no window".into()))?;
    let document = window
        .document()
        .ok_or_else(|| NavError::Dom("no document".into()))?;
    let menu = NavMenu::new(config)?;

    let runtime = Rc::new_cyclic(|weak: &Weak<Runtime>| Runtime {
        menu: RefCell::new(menu),
        host: WebHost::new(window.clone(), document.clone(), weak.clone()),
        retry: RefCell::new(None),
        booted: Cell::new(false),
        interval: Cell::new(None),
        interval_callback: RefCell::new(None),
    });

    let weak = Rc::downgrade(&runtime);
    let document_click = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        let Some(runtime) = weak.upgrade() else {
            return;
        };
        if let Some(target) = event.target().and_then(event_element) {
            runtime
                .menu
                .borrow_mut()
                .on_document_click(&runtime.host, &target);
        }
    });
    document
        .add_event_listener_with_callback("click", document_click.as_ref().unchecked_ref())
        .map_err(js_err)?;

    let weak = Rc::downgrade(&runtime);
    let hash_change = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
        if let Some(runtime) = weak.upgrade() {
            runtime.highlight();
        }
    });
    window
        .add_event_listener_with_callback("hashchange", hash_change.as_ref().unchecked_ref())
        .map_err(js_err)?;

    let dom_ready = if document.ready_state() == "loading" {
        let weak = Rc::downgrade(&runtime);
        let ready = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            if let Some(runtime) = weak.upgrade() {
                runtime.boot();
            }
        });
        document
            .add_event_listener_with_callback("DOMContentLoaded", ready.as_ref().unchecked_ref())
            .map_err(js_err)?;
        log::debug!("document loading, deferring startup");
        Some(ready)
    } else {
        runtime.boot();
        None
    };

    Ok(NavHandle {
        runtime,
        document_click,
        hash_change,
        dom_ready,
        torn_down: false,
    })
}

impl NavHandle {
    /// Re-run the highlight pass, e.g. after a client-side route change
    pub fn refresh(&self) {
        self.runtime.highlight();
    }

    pub fn snapshot_json(&self) -> NavResult<String> {
        let snapshot = self.runtime.menu.borrow().snapshot(&self.runtime.host);
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// Remove every listener, stop the retry interval and cancel pending frames
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        let host = &self.runtime.host;
        let _ = host.document.remove_event_listener_with_callback(
            "click",
            self.document_click.as_ref().unchecked_ref(),
        );
        let _ = host.window.remove_event_listener_with_callback(
            "hashchange",
            self.hash_change.as_ref().unchecked_ref(),
        );
        if let Some(ready) = &self.dom_ready {
            let _ = host
                .document
                .remove_event_listener_with_callback("DOMContentLoaded", ready.as_ref().unchecked_ref());
        }
        self.runtime.stop_interval();
        host.detach_all();
        log::debug!("menu torn down");
    }
}

impl Drop for NavHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ========================
// JavaScript API
// ========================

#[wasm_bindgen]
pub struct AdminNav {
    handle: NavHandle,
}

#[wasm_bindgen]
impl AdminNav {
    /// Install the menu. `config_json` overrides the default configuration.
    pub fn start(config_json: Option<String>) -> Result<AdminNav, JsValue> {
        let config = match config_json {
            Some(json) => NavConfig::from_json(&json),
            None => Ok(NavConfig::default()),
        }
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
        let handle = install(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(AdminNav { handle })
    }

    pub fn refresh(&self) {
        self.handle.refresh();
    }

    #[wasm_bindgen(js_name = "snapshotJson")]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        self.handle
            .snapshot_json()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn teardown(&mut self) {
        self.handle.teardown();
    }
}
