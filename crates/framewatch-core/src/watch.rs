#![forbid(unsafe_code)]

//! Page-lifetime orchestration of the four signal sources.
//!
//! [`FrameWatch`] is constructed once by the host and receives every signal
//! explicitly: load/error events, cross-document messages, resize
//! notifications and clock advances. Each handler runs to completion; the
//! host's event loop provides mutual exclusion.

use core::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::{DeterministicClock, millis_u64};
use crate::config::{ConfigError, WatchConfig};
use crate::geometry::{ContentAccess, DimensionSample, ScrollbarStatus};
use crate::load_watch::{LoadState, LoadTransition, LoadWatcher};
use crate::message::{InboundMessage, MessageVerdict, TrustedOrigin, authenticate_and_decode};
use crate::poll::PollTimer;
use crate::reconciler::{Reconciler, ReconcilerState, Verbosity};
use crate::sink::{StatusSink, TEXT_ADJUSTED_VIA_MESSAGE, TEXT_HEIGHT_CHANGED, TEXT_NO_CHANGE, Tone};

/// Access to the observed iframe element.
pub trait FrameHost {
    /// Current rendered box (offset width/height).
    fn measure(&self) -> DimensionSample;
    /// Set the element's height style to `height` pixels.
    fn set_height_px(&mut self, height: u32);
    /// Probe the nested document's scroll metrics.
    fn probe_content(&self) -> ContentAccess;
}

/// Signal counters, exported with the snapshot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatchCounters {
    pub messages_received: u64,
    pub messages_accepted: u64,
    pub messages_rejected: u64,
    pub resize_notifications: u64,
    pub poll_ticks: u64,
}

/// Point-in-time view of the watch for host inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchSnapshot {
    pub now_ms: u64,
    pub next_poll_ms: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub initial_height: u32,
    pub scrollbar: Option<ScrollbarStatus>,
    pub load: LoadState,
    pub load_failed: bool,
    pub load_timed_out: bool,
    pub resize_observer_attached: bool,
    pub counters: WatchCounters,
}

impl WatchSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// What one [`FrameWatch::advance_to`] call fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub timed_out: bool,
    pub poll_ticks: u64,
}

/// The dimension reconciler for one iframe.
pub struct FrameWatch<H: FrameHost, S: StatusSink> {
    config: WatchConfig,
    trusted: TrustedOrigin,
    host: H,
    sink: S,
    reconciler: Reconciler,
    load: LoadWatcher,
    poll: PollTimer,
    clock: DeterministicClock,
    resize_observer_attached: bool,
    counters: WatchCounters,
}

impl<H: FrameHost, S: StatusSink> FrameWatch<H, S> {
    /// Validate `config`, capture the initial height, publish the first
    /// dimensions and arm the load deadline and the poll timer.
    pub fn start(
        config: WatchConfig,
        host: H,
        mut sink: S,
        now: Duration,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut clock = DeterministicClock::new();
        clock.set(now);

        let measured = host.measure();
        let mut reconciler =
            Reconciler::new(measured.height, config.fallback_initial_height, &mut sink);
        reconciler.observe(measured, Verbosity::Loud, &mut sink);

        let load = LoadWatcher::arm(now, config.load_timeout());
        let poll = PollTimer::start(now, config.poll_interval());
        info!(
            trusted_origin = %config.trusted_origin,
            load_timeout_ms = config.load_timeout_ms,
            poll_interval_ms = config.poll_interval_ms,
            "frame watch started"
        );

        Ok(Self {
            trusted: TrustedOrigin::new(config.trusted_origin.clone()),
            config,
            host,
            sink,
            reconciler,
            load,
            poll,
            clock,
            resize_observer_attached: false,
            counters: WatchCounters::default(),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &WatchConfig {
        &self.config
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    #[must_use]
    pub const fn state(&self) -> &ReconcilerState {
        self.reconciler.state()
    }

    #[must_use]
    pub const fn load_state(&self) -> LoadState {
        self.load.state()
    }

    #[must_use]
    pub const fn counters(&self) -> WatchCounters {
        self.counters
    }

    #[must_use]
    pub const fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Iframe `load` event.
    pub fn on_load(&mut self, now: Duration) -> LoadTransition {
        self.clock.set(now);
        let transition = self.load.on_load();
        match transition {
            LoadTransition::Loaded => {
                let elapsed = self.load.elapsed(self.clock.now());
                info!(elapsed_ms = millis_u64(elapsed), "iframe loaded");
                self.refresh(Verbosity::Loud);
            }
            _ => debug!(state = ?self.load.state(), "late load event ignored"),
        }
        transition
    }

    /// Iframe `error` event.
    pub fn on_error(&mut self, now: Duration) -> LoadTransition {
        self.clock.set(now);
        let transition = self.load.on_error();
        match transition {
            LoadTransition::Failed => {
                error!("iframe failed to load");
                self.reconciler.record_load_failure(&mut self.sink);
            }
            _ => debug!(state = ?self.load.state(), "late error event ignored"),
        }
        transition
    }

    /// Advance host time, firing the load deadline and due poll ticks.
    pub fn advance_to(&mut self, now: Duration) -> TickReport {
        self.clock.set(now);
        let now = self.clock.now();
        let mut report = TickReport::default();

        let ticks = self.poll.due_ticks(now);
        if ticks > 0 {
            // One refresh covers any number of missed periods.
            self.counters.poll_ticks = self.counters.poll_ticks.saturating_add(ticks);
            self.refresh(Verbosity::Quiet);
            report.poll_ticks = ticks;
        }

        // Deadline last: its failure text is the final word for this instant.
        if self.load.poll_deadline(now) == LoadTransition::TimedOut {
            warn!("iframe loading timeout; child site may not be deployed");
            self.reconciler.record_load_timeout(&mut self.sink);
            report.timed_out = true;
        }
        report
    }

    /// Whether `origin` is on the allow-list. Hosts use this to avoid
    /// serializing payloads from origins that will be discarded anyway.
    #[must_use]
    pub fn admits_origin(&self, origin: &str) -> bool {
        self.trusted.admits(origin)
    }

    /// Inbound cross-document message from any origin.
    pub fn on_message(&mut self, message: &InboundMessage) -> MessageVerdict {
        self.counters.messages_received += 1;
        trace!(
            origin = %message.origin,
            kind = message.kind.as_deref().unwrap_or("<none>"),
            payload_bytes = message.data.len(),
            "message received"
        );

        let verdict = authenticate_and_decode(&self.trusted, message);
        let label = verdict.label();
        match &verdict {
            MessageVerdict::HeightChange { height } => {
                self.counters.messages_accepted += 1;
                info!(height, verdict = label, "adjusting iframe height via message");
                self.host.set_height_px(*height);
                self.refresh(Verbosity::Quiet);
                self.reconciler
                    .set_auto_adjust(TEXT_ADJUSTED_VIA_MESSAGE, Tone::Success, &mut self.sink);
            }
            MessageVerdict::UntrustedOrigin => {
                self.counters.messages_rejected += 1;
                debug!(
                    origin = %message.origin,
                    verdict = label,
                    "message ignored: origin mismatch"
                );
            }
            MessageVerdict::UnrecognizedType { kind } => {
                self.counters.messages_rejected += 1;
                debug!(kind = ?kind, verdict = label, "message type not recognized");
            }
            MessageVerdict::Malformed(err) => {
                self.counters.messages_rejected += 1;
                debug!(%err, verdict = label, "malformed height-change message ignored");
            }
        }
        verdict
    }

    /// Size-change notification for the iframe element. One entry per
    /// observed box.
    pub fn on_resize(&mut self, entries: &[DimensionSample]) {
        self.counters.resize_notifications += 1;
        let initial_height = self.reconciler.initial_height();
        for entry in entries {
            if self.reconciler.state().last_sample() != Some(*entry) {
                debug!(dimensions = %entry, "resize observer: iframe size changed");
            }
            self.refresh(Verbosity::Quiet);
            if entry.height != initial_height {
                debug!(initial_height, current = entry.height, "height changed from initial");
                self.reconciler
                    .set_auto_adjust(TEXT_HEIGHT_CHANGED, Tone::Success, &mut self.sink);
            } else {
                self.reconciler
                    .set_auto_adjust(TEXT_NO_CHANGE, Tone::Failure, &mut self.sink);
            }
        }
    }

    /// The host attached a size-change observer to the iframe.
    pub fn resize_observer_attached(&mut self) {
        self.resize_observer_attached = true;
        debug!("resize observer attached to iframe");
    }

    /// The host could not observe size changes; the poll timer covers them.
    pub fn resize_observer_unavailable(&mut self, reason: &str) {
        self.resize_observer_attached = false;
        warn!(%reason, "resize observer not available; relying on poll fallback");
    }

    /// Re-measure and re-probe; used by every signal source.
    pub fn refresh(&mut self, verbosity: Verbosity) {
        let sample = self.host.measure();
        self.reconciler.observe(sample, verbosity, &mut self.sink);
        if !verbosity.is_quiet() {
            debug!("checking scrollbar visibility");
        }
        let access = self.host.probe_content();
        self.reconciler
            .check_scrollbar(&access, verbosity, &mut self.sink);
    }

    #[must_use]
    pub fn snapshot(&self) -> WatchSnapshot {
        let state = self.reconciler.state();
        let last = state.last_sample();
        WatchSnapshot {
            now_ms: millis_u64(self.clock.now()),
            next_poll_ms: millis_u64(self.poll.next_due()),
            width: last.map(|s| s.width),
            height: last.map(|s| s.height),
            initial_height: state.initial_height(),
            scrollbar: state.last_scrollbar(),
            load: self.load.state(),
            load_failed: state.load_failed(),
            load_timed_out: state.load_timed_out(),
            resize_observer_attached: self.resize_observer_attached,
            counters: self.counters,
        }
    }
}
