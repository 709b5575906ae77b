#![forbid(unsafe_code)]

//! Browser bindings for the framewatch iframe reconciler.
//!
//! The page calls [`start`] (or `startWithConfig`) once the DOM is ready.
//! The bindings look up the iframe and the five display elements, wire the
//! `load`/`error`/`message` listeners, a `ResizeObserver` when the browser
//! has one, and the load-timeout / poll wakeups, and forward every signal to
//! [`framewatch_core::FrameWatch`].
//!
//! Only compiled on `wasm32` targets; native builds keep the
//! platform-independent helpers and their tests.

pub mod console_log;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{FrameWatchHandle, start, start_with_config};

use framewatch_core::ConfigError;
use thiserror::Error;

/// Failures while binding the watcher to the page.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("window is unavailable")]
    NoWindow,
    #[error("document is unavailable")]
    NoDocument,
    #[error("required elements not found: {}", .0.join(", "))]
    MissingElements(Vec<String>),
    #[error("element `{0}` is not an iframe")]
    NotAnIframe(String),
    #[error("element `{0}` is not an html element")]
    NotAnHtmlElement(String),
    #[error("frame watch already started on this page")]
    AlreadyStarted,
    #[error("failed to register {what}: {detail}")]
    Listener { what: &'static str, detail: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Ids of elements that were not found, given `(id, found)` pairs.
#[must_use]
pub fn missing_element_ids<'a>(lookups: impl IntoIterator<Item = (&'a str, bool)>) -> Vec<String> {
    lookups
        .into_iter()
        .filter(|(_, found)| !found)
        .map(|(id, _)| id.to_owned())
        .collect()
}
