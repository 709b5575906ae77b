#![allow(dead_code)]

use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement, HtmlIFrameElement};

pub const TRUSTED: &str = "https://kzk4043.github.io";
pub const SUCCESS_COLOR: &str = "rgb(40, 167, 69)";
pub const FAILURE_COLOR: &str = "rgb(220, 53, 69)";

pub const STATUS_IDS: [&str; 5] = [
    "iframe-width",
    "iframe-height",
    "initial-height",
    "auto-adjust",
    "scrollbar-status",
];

pub fn document() -> Document {
    web_sys::window()
        .and_then(|window| window.document())
        .expect("browser document")
}

/// Mount an 800x400 borderless iframe plus the five status spans.
pub fn mount_page(document: &Document) -> HtmlIFrameElement {
    let body = document.body().expect("body");
    let iframe = document
        .create_element("iframe")
        .expect("create iframe")
        .dyn_into::<HtmlIFrameElement>()
        .expect("iframe element");
    iframe.set_id("child-iframe");
    let style = iframe.style();
    style.set_property("height", "400px").expect("set height");
    style.set_property("width", "800px").expect("set width");
    style.set_property("border", "0").expect("clear border");
    body.append_child(&iframe).expect("append iframe");

    for id in STATUS_IDS {
        let span = document.create_element("span").expect("create span");
        span.set_id(id);
        body.append_child(&span).expect("append span");
    }
    iframe
}

pub fn text_of(document: &Document, id: &str) -> String {
    document
        .get_element_by_id(id)
        .and_then(|element| element.text_content())
        .unwrap_or_default()
}

pub fn color_of(document: &Document, id: &str) -> String {
    document
        .get_element_by_id(id)
        .and_then(|element| element.dyn_into::<HtmlElement>().ok())
        .and_then(|element| element.style().get_property_value("color").ok())
        .unwrap_or_default()
}

/// Resolve after `ms` milliseconds of host time.
pub async fn sleep_ms(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        web_sys::window()
            .expect("window")
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .expect("set timeout");
    });
    wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .expect("timer resolves");
}
