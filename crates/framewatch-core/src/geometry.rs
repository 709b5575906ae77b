#![forbid(unsafe_code)]

//! Measured iframe geometry and the scrollbar classification derived from it.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Point-in-time measurement of the iframe's rendered box, in CSS pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionSample {
    pub width: u32,
    pub height: u32,
}

impl DimensionSample {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Build a sample from host pixel values.
    ///
    /// Layout APIs report `f64`; non-finite or negative values clamp to `0`.
    #[must_use]
    pub fn from_host_px(width: f64, height: f64) -> Self {
        Self {
            width: px_from_host(width),
            height: px_from_host(height),
        }
    }
}

impl fmt::Display for DimensionSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}px", self.width, self.height)
    }
}

/// Round a host pixel value to a whole, non-negative pixel count.
#[must_use]
pub fn px_from_host(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let rounded = value.round();
    if rounded >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        rounded as u32
    }
}

/// Scroll metrics of the nested document's root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollMetrics {
    pub scroll_height: u32,
    pub client_height: u32,
}

impl ScrollMetrics {
    #[must_use]
    pub const fn needs_scrollbar(self) -> bool {
        self.scroll_height > self.client_height
    }
}

/// Result of probing the iframe's nested document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentAccess {
    /// Same-origin document; metrics were read.
    Readable(ScrollMetrics),
    /// A content window exists but reading its document threw
    /// (cross-origin `SecurityError`).
    Denied { reason: String },
    /// No content window at all (detached or not yet navigated).
    NoContentWindow,
}

/// Whether the child content needs a scrollbar.
///
/// `Indeterminate` is reported whenever the metrics cannot be read. The
/// watcher never guesses a boolean in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollbarStatus {
    Present,
    Absent,
    Indeterminate,
}

impl ScrollbarStatus {
    /// Classify a probe result.
    #[must_use]
    pub fn from_access(access: &ContentAccess) -> Self {
        match access {
            ContentAccess::Readable(metrics) if metrics.needs_scrollbar() => Self::Present,
            ContentAccess::Readable(_) => Self::Absent,
            ContentAccess::Denied { .. } | ContentAccess::NoContentWindow => Self::Indeterminate,
        }
    }

    /// Text written to the `scrollbar-status` field.
    #[must_use]
    pub const fn display_text(self) -> &'static str {
        match self {
            Self::Present => "Yes",
            Self::Absent => "No",
            Self::Indeterminate => "Cannot determine (CORS)",
        }
    }
}
