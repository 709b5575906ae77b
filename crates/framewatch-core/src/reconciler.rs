#![forbid(unsafe_code)]

//! Dimension reconciliation.
//!
//! [`Reconciler`] owns the last values written to the display and decides
//! whether a fresh observation changes anything. Redundant observations
//! (poll ticks, resize notifications repeating the same box) do not touch
//! the sink.
//!
//! Invariants:
//! - `last_sample` is always the most recent sample *written* to the sink,
//!   never one that was computed and suppressed.
//! - `initial_height` is fixed at construction.
//! - After the first scrollbar check, the scrollbar field always carries one
//!   of the three status texts (or a load failure text written afterwards).

use tracing::{debug, trace};

use crate::geometry::{ContentAccess, DimensionSample, ScrollbarStatus};
use crate::sink::{
    DisplayField, StatusSink, TEXT_LOAD_ERROR_AUTO_ADJUST, TEXT_LOAD_ERROR_SCROLLBAR,
    TEXT_TIMEOUT_AUTO_ADJUST, TEXT_TIMEOUT_SCROLLBAR, Tone,
};

/// Diagnostic verbosity of one state-mutating call.
///
/// Controls event emission only; dedup semantics are identical except for
/// the scrollbar check, where a loud call always rewrites the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Loud,
    Quiet,
}

impl Verbosity {
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }
}

/// Result of [`Reconciler::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveOutcome {
    Unchanged,
    Updated {
        previous: Option<DimensionSample>,
        current: DimensionSample,
    },
}

impl ObserveOutcome {
    #[must_use]
    pub const fn wrote(self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// Result of [`Reconciler::check_scrollbar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollbarOutcome {
    pub status: ScrollbarStatus,
    pub wrote: bool,
}

/// Page-lifetime reconciler state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerState {
    last_sample: Option<DimensionSample>,
    last_scrollbar: Option<ScrollbarStatus>,
    initial_height: u32,
    load_timed_out: bool,
    load_failed: bool,
}

impl ReconcilerState {
    #[must_use]
    pub const fn last_sample(&self) -> Option<DimensionSample> {
        self.last_sample
    }

    #[must_use]
    pub const fn last_scrollbar(&self) -> Option<ScrollbarStatus> {
        self.last_scrollbar
    }

    #[must_use]
    pub const fn initial_height(&self) -> u32 {
        self.initial_height
    }

    #[must_use]
    pub const fn load_timed_out(&self) -> bool {
        self.load_timed_out
    }

    #[must_use]
    pub const fn load_failed(&self) -> bool {
        self.load_failed
    }
}

/// Dedup-and-write logic shared by every signal source.
#[derive(Debug, Clone)]
pub struct Reconciler {
    state: ReconcilerState,
}

impl Reconciler {
    /// Capture the initial height baseline and publish it.
    ///
    /// A measured height of `0` falls back to `fallback_height`.
    pub fn new(measured_height: u32, fallback_height: u32, sink: &mut dyn StatusSink) -> Self {
        let initial_height = if measured_height == 0 {
            fallback_height
        } else {
            measured_height
        };
        sink.write_text(DisplayField::InitialHeight, &initial_height.to_string());
        debug!(initial_height, "initial iframe height captured");
        Self {
            state: ReconcilerState {
                last_sample: None,
                last_scrollbar: None,
                initial_height,
                load_timed_out: false,
                load_failed: false,
            },
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ReconcilerState {
        &self.state
    }

    #[must_use]
    pub const fn initial_height(&self) -> u32 {
        self.state.initial_height
    }

    /// Reconcile a fresh dimension sample against the displayed one.
    pub fn observe(
        &mut self,
        sample: DimensionSample,
        verbosity: Verbosity,
        sink: &mut dyn StatusSink,
    ) -> ObserveOutcome {
        let previous = self.state.last_sample;
        if previous == Some(sample) {
            if !verbosity.is_quiet() {
                debug!(dimensions = %sample, "dimensions unchanged");
            }
            return ObserveOutcome::Unchanged;
        }

        if !verbosity.is_quiet() {
            let width_changed = previous.is_none_or(|p| p.width != sample.width);
            let height_changed = previous.is_none_or(|p| p.height != sample.height);
            debug!(
                dimensions = %sample,
                previous = ?previous.map(|p| p.to_string()),
                width_changed,
                height_changed,
                "dimensions updated"
            );
        }

        self.state.last_sample = Some(sample);
        sink.write_text(DisplayField::Width, &sample.width.to_string());
        sink.write_text(DisplayField::Height, &sample.height.to_string());
        ObserveOutcome::Updated {
            previous,
            current: sample,
        }
    }

    /// Classify the nested document's scroll state and publish it.
    pub fn check_scrollbar(
        &mut self,
        access: &ContentAccess,
        verbosity: Verbosity,
        sink: &mut dyn StatusSink,
    ) -> ScrollbarOutcome {
        let status = ScrollbarStatus::from_access(access);
        if verbosity.is_quiet() && self.state.last_scrollbar == Some(status) {
            return ScrollbarOutcome {
                status,
                wrote: false,
            };
        }

        if !verbosity.is_quiet() {
            match access {
                ContentAccess::Readable(metrics) => debug!(
                    scroll_height = metrics.scroll_height,
                    client_height = metrics.client_height,
                    has_scrollbar = metrics.needs_scrollbar(),
                    "scrollbar check"
                ),
                ContentAccess::Denied { reason } => {
                    debug!(%reason, "cannot check scrollbar: content document access denied");
                }
                ContentAccess::NoContentWindow => {
                    debug!("cannot check scrollbar: no content window");
                }
            }
        } else {
            trace!(?status, "scrollbar status changed");
        }

        self.state.last_scrollbar = Some(status);
        sink.write_text(DisplayField::ScrollbarStatus, status.display_text());
        ScrollbarOutcome {
            status,
            wrote: true,
        }
    }

    /// Publish an auto-adjust status with its tone.
    pub fn set_auto_adjust(&mut self, text: &str, tone: Tone, sink: &mut dyn StatusSink) {
        sink.write_text(DisplayField::AutoAdjust, text);
        sink.set_tone(DisplayField::AutoAdjust, tone);
    }

    /// Record a terminal load error.
    pub fn record_load_failure(&mut self, sink: &mut dyn StatusSink) {
        self.state.load_failed = true;
        sink.write_text(DisplayField::ScrollbarStatus, TEXT_LOAD_ERROR_SCROLLBAR);
        self.set_auto_adjust(TEXT_LOAD_ERROR_AUTO_ADJUST, Tone::Failure, sink);
    }

    /// Record an expired load deadline.
    pub fn record_load_timeout(&mut self, sink: &mut dyn StatusSink) {
        self.state.load_timed_out = true;
        sink.write_text(DisplayField::ScrollbarStatus, TEXT_TIMEOUT_SCROLLBAR);
        self.set_auto_adjust(TEXT_TIMEOUT_AUTO_ADJUST, Tone::Failure, sink);
    }
}
