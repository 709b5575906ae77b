#![forbid(unsafe_code)]

//! `framewatch-core` observes one embedded iframe and reconciles its
//! rendered size from three independent signal sources.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment (JS) pushes load/error
//!   events, cross-document messages and resize notifications.
//! - **Deterministic time**: the host advances a monotonic clock explicitly;
//!   the load deadline and the fallback poll are evaluated against it.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! The crate never touches JS/DOM types. The iframe is reached through
//! [`FrameHost`] and the display fields through [`StatusSink`];
//! `framewatch-web` provides the DOM implementations of both.

pub mod config;
pub mod geometry;
pub mod load_watch;
pub mod message;
pub mod poll;
pub mod reconciler;
pub mod sink;
pub mod watch;

use core::time::Duration;

pub use config::{ConfigError, ElementIds, WatchConfig};
pub use geometry::{ContentAccess, DimensionSample, ScrollMetrics, ScrollbarStatus};
pub use load_watch::{LoadState, LoadTransition, LoadWatcher};
pub use message::{InboundMessage, MessageError, MessageVerdict, TrustedOrigin};
pub use poll::PollTimer;
pub use reconciler::{ObserveOutcome, Reconciler, ReconcilerState, ScrollbarOutcome, Verbosity};
pub use sink::{DisplayField, RecordingSink, SinkWrite, StatusSink, Tone};
pub use watch::{FrameHost, FrameWatch, TickReport, WatchCounters, WatchSnapshot};

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Current monotonic time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Set current monotonic time. Going backwards is ignored.
    pub fn set(&mut self, now: Duration) {
        if now > self.now {
            self.now = now;
        }
    }
}

/// Convert a host millisecond timestamp to a [`Duration`].
///
/// Returns `None` for NaN, infinities and negative values.
#[must_use]
pub fn duration_from_millis(ms: f64) -> Option<Duration> {
    if !ms.is_finite() || ms < 0.0 {
        return None;
    }
    let max_secs = Duration::MAX.as_secs_f64();
    let secs = (ms / 1000.0).min(max_secs);
    Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
#[must_use]
pub fn millis_u64(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
