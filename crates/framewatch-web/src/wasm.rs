#![forbid(unsafe_code)]

//! `wasm-bindgen` exports and DOM implementations of the core host traits.
//!
//! Only compiled on `wasm32` targets.

use core::time::Duration;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use framewatch_core::{
    ContentAccess, DimensionSample, DisplayField, ElementIds, FrameHost, FrameWatch,
    InboundMessage, ScrollMetrics, StatusSink, Tone, Verbosity, WatchConfig,
    duration_from_millis,
};
use js_sys::{Array, Reflect};
use tracing::{Level, Metadata, debug, error, info, warn};
use tracing_subscriber::fmt::MakeWriter;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, HtmlElement, HtmlIFrameElement, MessageEvent, ResizeObserver,
    ResizeObserverEntry, Window,
};

use crate::console_log::LineForwarder;
use crate::{BindError, missing_element_ids};

type WebWatch = FrameWatch<DomFrame, DomSink>;
type SharedWatch = Rc<RefCell<WebWatch>>;

thread_local! {
    // Listeners and timers live for the page; they are never torn down.
    static BINDINGS: RefCell<Option<PageBindings>> = const { RefCell::new(None) };
}

struct PageBindings {
    on_load: Closure<dyn FnMut(web_sys::Event)>,
    on_error: Closure<dyn FnMut(web_sys::Event)>,
    on_message: Closure<dyn FnMut(MessageEvent)>,
    on_timeout: Closure<dyn FnMut()>,
    on_poll: Closure<dyn FnMut()>,
    _resize: Option<(Closure<dyn FnMut(Array)>, ResizeObserver)>,
}

fn console_log_line(line: &str) {
    web_sys::console::log_1(&JsValue::from_str(line));
}

fn console_warn_line(line: &str) {
    web_sys::console::warn_1(&JsValue::from_str(line));
}

fn console_error_line(line: &str) {
    web_sys::console::error_1(&JsValue::from_str(line));
}

/// Routes formatted events to `console.log` / `warn` / `error` by level.
#[derive(Debug, Clone, Copy)]
struct ConsoleWriter;

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = LineForwarder<fn(&str)>;

    fn make_writer(&'a self) -> Self::Writer {
        LineForwarder::new(console_log_line)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        let emit: fn(&str) = match *meta.level() {
            Level::ERROR => console_error_line,
            Level::WARN => console_warn_line,
            _ => console_log_line,
        };
        LineForwarder::new(emit)
    }
}

fn install_logging() {
    // A host that installed its own subscriber keeps it.
    let _ = tracing_subscriber::fmt()
        .with_writer(ConsoleWriter)
        .with_ansi(false)
        .without_time()
        .with_max_level(Level::DEBUG)
        .try_init();
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("panic: {info}")
            };
            console_error_line(&msg);
        }));
    });
}

fn js_error_text(err: &JsValue) -> String {
    if let Some(err) = err.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

fn host_now(window: &Window) -> Duration {
    window
        .performance()
        .and_then(|perf| duration_from_millis(perf.now()))
        .unwrap_or_default()
}

fn timer_millis(duration: Duration) -> i32 {
    i32::try_from(duration.as_millis()).unwrap_or(i32::MAX)
}

fn clamp_px(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn element_sample(element: &HtmlElement) -> DimensionSample {
    DimensionSample::from_host_px(
        f64::from(element.offset_width()),
        f64::from(element.offset_height()),
    )
}

/// JSON text of a message payload; empty when it cannot be serialized.
fn payload_json(data: &JsValue) -> String {
    js_sys::JSON::stringify(data)
        .ok()
        .and_then(|text| text.as_string())
        .unwrap_or_default()
}

fn with_watch(watch: &SharedWatch, f: impl FnOnce(&mut WebWatch)) {
    match watch.try_borrow_mut() {
        Ok(mut watch) => f(&mut watch),
        Err(_) => warn!("frame watch busy; signal dropped"),
    }
}

fn listener_error(what: &'static str, err: &JsValue) -> BindError {
    BindError::Listener {
        what,
        detail: js_error_text(err),
    }
}

/// The observed `<iframe>`.
struct DomFrame {
    iframe: HtmlIFrameElement,
}

impl FrameHost for DomFrame {
    fn measure(&self) -> DimensionSample {
        element_sample(&self.iframe)
    }

    fn set_height_px(&mut self, height: u32) {
        if let Err(err) = self
            .iframe
            .style()
            .set_property("height", &format!("{height}px"))
        {
            warn!(error = %js_error_text(&err), "failed to set iframe height");
        }
    }

    fn probe_content(&self) -> ContentAccess {
        let Some(content_window) = self.iframe.content_window() else {
            return ContentAccess::NoContentWindow;
        };
        // Cross-origin documents throw a SecurityError on access.
        let document = match Reflect::get(&content_window, &JsValue::from_str("document")) {
            Ok(document) => document,
            Err(err) => {
                return ContentAccess::Denied {
                    reason: js_error_text(&err),
                };
            }
        };
        let Ok(document) = document.dyn_into::<Document>() else {
            return ContentAccess::NoContentWindow;
        };
        let Some(root) = document.document_element() else {
            return ContentAccess::NoContentWindow;
        };
        ContentAccess::Readable(ScrollMetrics {
            scroll_height: clamp_px(root.scroll_height()),
            client_height: clamp_px(root.client_height()),
        })
    }
}

/// The five display elements.
struct DomSink {
    width: HtmlElement,
    height: HtmlElement,
    initial_height: HtmlElement,
    auto_adjust: HtmlElement,
    scrollbar_status: HtmlElement,
}

impl DomSink {
    fn element(&self, field: DisplayField) -> &HtmlElement {
        match field {
            DisplayField::Width => &self.width,
            DisplayField::Height => &self.height,
            DisplayField::InitialHeight => &self.initial_height,
            DisplayField::AutoAdjust => &self.auto_adjust,
            DisplayField::ScrollbarStatus => &self.scrollbar_status,
        }
    }
}

impl StatusSink for DomSink {
    fn write_text(&mut self, field: DisplayField, text: &str) {
        self.element(field).set_text_content(Some(text));
    }

    fn set_tone(&mut self, field: DisplayField, tone: Tone) {
        if let Err(err) = self
            .element(field)
            .style()
            .set_property("color", tone.css_color())
        {
            warn!(?field, error = %js_error_text(&err), "failed to set status color");
        }
    }
}

fn html_element(element: Element, id: &str) -> Result<HtmlElement, BindError> {
    element
        .dyn_into::<HtmlElement>()
        .map_err(|_| BindError::NotAnHtmlElement(id.to_owned()))
}

fn lookup_elements(
    document: &Document,
    ids: &ElementIds,
) -> Result<(HtmlIFrameElement, DomSink), BindError> {
    let entries = ids.entries();
    let found = entries.map(|(_, id)| document.get_element_by_id(id));
    debug!(
        iframe = found[0].is_some(),
        width = found[1].is_some(),
        height = found[2].is_some(),
        initial_height = found[3].is_some(),
        auto_adjust = found[4].is_some(),
        scrollbar_status = found[5].is_some(),
        "elements looked up"
    );
    let missing = missing_element_ids(
        entries
            .iter()
            .zip(&found)
            .map(|((_, id), element)| (*id, element.is_some())),
    );
    let [
        Some(iframe),
        Some(width),
        Some(height),
        Some(initial_height),
        Some(auto_adjust),
        Some(scrollbar_status),
    ] = found
    else {
        return Err(BindError::MissingElements(missing));
    };

    let iframe = iframe
        .dyn_into::<HtmlIFrameElement>()
        .map_err(|_| BindError::NotAnIframe(ids.iframe.clone()))?;
    let sink = DomSink {
        width: html_element(width, &ids.width)?,
        height: html_element(height, &ids.height)?,
        initial_height: html_element(initial_height, &ids.initial_height)?,
        auto_adjust: html_element(auto_adjust, &ids.auto_adjust)?,
        scrollbar_status: html_element(scrollbar_status, &ids.scrollbar_status)?,
    };
    Ok((iframe, sink))
}

fn attach_resize_observer(
    window: &Window,
    watch: &SharedWatch,
    iframe: &HtmlIFrameElement,
) -> Option<(Closure<dyn FnMut(Array)>, ResizeObserver)> {
    let supported = Reflect::has(window, &JsValue::from_str("ResizeObserver")).unwrap_or(false);
    if !supported {
        with_watch(watch, |w| {
            w.resize_observer_unavailable("ResizeObserver is not available in this browser");
        });
        return None;
    }

    let callback = {
        let watch = Rc::clone(watch);
        Closure::<dyn FnMut(Array)>::wrap(Box::new(move |entries: Array| {
            let samples: Vec<DimensionSample> = entries
                .iter()
                .filter_map(|entry| entry.dyn_into::<ResizeObserverEntry>().ok())
                .filter_map(|entry| entry.target().dyn_into::<HtmlElement>().ok())
                .map(|element| element_sample(&element))
                .collect();
            if samples.is_empty() {
                return;
            }
            with_watch(&watch, |w| w.on_resize(&samples));
        }))
    };

    match ResizeObserver::new(callback.as_ref().unchecked_ref()) {
        Ok(observer) => {
            observer.observe(iframe);
            with_watch(watch, |w| w.resize_observer_attached());
            Some((callback, observer))
        }
        Err(err) => {
            with_watch(watch, |w| w.resize_observer_unavailable(&js_error_text(&err)));
            None
        }
    }
}

fn clear_load_timeout(window: &Window, handle: &Cell<Option<i32>>) {
    if let Some(handle) = handle.take() {
        window.clear_timeout_with_handle(handle);
    }
}

/// Reads the payload `type` for the message trace. One property read, no
/// deserialization; primitives and `null` yield `None`.
fn payload_kind(data: &JsValue) -> Option<String> {
    Reflect::get(data, &JsValue::from_str("type"))
        .ok()
        .and_then(|kind| kind.as_string())
}

fn register_signals(
    window: &Window,
    iframe: &HtmlIFrameElement,
    bindings: &PageBindings,
    load_timeout: Duration,
    poll_interval: Duration,
    timeout_handle: &Cell<Option<i32>>,
) -> Result<(), BindError> {
    iframe
        .add_event_listener_with_callback("load", bindings.on_load.as_ref().unchecked_ref())
        .map_err(|err| listener_error("iframe load listener", &err))?;
    iframe
        .add_event_listener_with_callback("error", bindings.on_error.as_ref().unchecked_ref())
        .map_err(|err| listener_error("iframe error listener", &err))?;
    window
        .add_event_listener_with_callback("message", bindings.on_message.as_ref().unchecked_ref())
        .map_err(|err| listener_error("message listener", &err))?;

    let handle = window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            bindings.on_timeout.as_ref().unchecked_ref(),
            timer_millis(load_timeout),
        )
        .map_err(|err| listener_error("load timeout", &err))?;
    timeout_handle.set(Some(handle));

    window
        .set_interval_with_callback_and_timeout_and_arguments_0(
            bindings.on_poll.as_ref().unchecked_ref(),
            timer_millis(poll_interval),
        )
        .map_err(|err| listener_error("poll interval", &err))?;
    Ok(())
}

fn bind(config: WatchConfig) -> Result<FrameWatchHandle, BindError> {
    if BINDINGS.with(|slot| slot.borrow().is_some()) {
        return Err(BindError::AlreadyStarted);
    }
    let window = web_sys::window().ok_or(BindError::NoWindow)?;
    let document = window.document().ok_or(BindError::NoDocument)?;
    let (iframe, sink) = lookup_elements(&document, &config.element_ids)?;

    let load_timeout = config.load_timeout();
    let poll_interval = config.poll_interval();
    let frame = DomFrame {
        iframe: iframe.clone(),
    };
    let watch: SharedWatch = Rc::new(RefCell::new(FrameWatch::start(
        config,
        frame,
        sink,
        host_now(&window),
    )?));
    let timeout_handle: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));

    let on_load = {
        let watch = Rc::clone(&watch);
        let window = window.clone();
        let timeout_handle = Rc::clone(&timeout_handle);
        Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
            clear_load_timeout(&window, &timeout_handle);
            with_watch(&watch, |w| {
                w.on_load(host_now(&window));
            });
        }))
    };

    let on_error = {
        let watch = Rc::clone(&watch);
        let window = window.clone();
        let timeout_handle = Rc::clone(&timeout_handle);
        Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event| {
            clear_load_timeout(&window, &timeout_handle);
            with_watch(&watch, |w| {
                w.on_error(host_now(&window));
            });
        }))
    };

    let on_message = {
        let watch = Rc::clone(&watch);
        Closure::<dyn FnMut(MessageEvent)>::wrap(Box::new(move |event: MessageEvent| {
            with_watch(&watch, |w| {
                let origin = event.origin();
                let payload = event.data();
                // Payloads from other origins are never serialized.
                let data = if w.admits_origin(&origin) {
                    payload_json(&payload)
                } else {
                    String::new()
                };
                let message = InboundMessage::new(origin, data).with_kind(payload_kind(&payload));
                w.on_message(&message);
            });
        }))
    };

    let on_timeout = {
        let watch = Rc::clone(&watch);
        let window = window.clone();
        let timeout_handle = Rc::clone(&timeout_handle);
        Closure::<dyn FnMut()>::wrap(Box::new(move || {
            timeout_handle.set(None);
            with_watch(&watch, |w| {
                // The timer firing means the deadline passed, even if the
                // performance clock reads a hair early.
                let now = host_now(&window);
                let now = w.load_state().deadline().map_or(now, |deadline| now.max(deadline));
                w.advance_to(now);
            });
        }))
    };

    let on_poll = {
        let watch = Rc::clone(&watch);
        let window = window.clone();
        Closure::<dyn FnMut()>::wrap(Box::new(move || {
            with_watch(&watch, |w| {
                w.advance_to(host_now(&window));
            });
        }))
    };

    let mut bindings = PageBindings {
        on_load,
        on_error,
        on_message,
        on_timeout,
        on_poll,
        _resize: None,
    };
    let registered = register_signals(
        &window,
        &iframe,
        &bindings,
        load_timeout,
        poll_interval,
        &timeout_handle,
    );
    if registered.is_ok() {
        bindings._resize = attach_resize_observer(&window, &watch, &iframe);
    }
    // Stored even on failure: attached listeners must keep their closures,
    // and a retry must not register a second set.
    BINDINGS.with(|slot| *slot.borrow_mut() = Some(bindings));
    registered?;

    info!("frame watch initialization complete");
    Ok(FrameWatchHandle { watch })
}

fn start_failed(err: BindError) -> JsValue {
    error!(%err, "frame watch not started");
    JsValue::from_str(&err.to_string())
}

/// Start watching with the production configuration.
///
/// Call once, after `DOMContentLoaded`.
#[wasm_bindgen]
pub fn start() -> Result<FrameWatchHandle, JsValue> {
    install_panic_hook();
    install_logging();
    bind(WatchConfig::default()).map_err(start_failed)
}

/// Start watching with a JSON [`WatchConfig`]. Missing fields take defaults.
#[wasm_bindgen(js_name = startWithConfig)]
pub fn start_with_config(config_json: &str) -> Result<FrameWatchHandle, JsValue> {
    install_panic_hook();
    install_logging();
    let config = WatchConfig::from_json_str(config_json)
        .map_err(|err| start_failed(BindError::from(err)))?;
    bind(config).map_err(start_failed)
}

/// Page-side view of the running watch.
#[wasm_bindgen]
pub struct FrameWatchHandle {
    watch: SharedWatch,
}

#[wasm_bindgen]
impl FrameWatchHandle {
    /// Current reconciler state as JSON.
    #[wasm_bindgen(js_name = snapshotJson)]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        let watch = self
            .watch
            .try_borrow()
            .map_err(|_| JsValue::from_str("frame watch busy"))?;
        watch
            .snapshot()
            .to_json()
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }

    /// Re-measure immediately and log the result.
    pub fn refresh(&self) {
        with_watch(&self.watch, |w| w.refresh(Verbosity::Loud));
    }

    /// Active configuration as JSON.
    #[wasm_bindgen(js_name = configJson)]
    pub fn config_json(&self) -> Result<String, JsValue> {
        let watch = self
            .watch
            .try_borrow()
            .map_err(|_| JsValue::from_str("frame watch busy"))?;
        watch
            .config()
            .to_json_string()
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }
}
