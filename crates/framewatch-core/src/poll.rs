#![forbid(unsafe_code)]

//! Fixed-period fallback poll.

use core::time::Duration;

/// Periodic timer evaluated against host time. Never cancelled.
#[derive(Debug, Clone)]
pub struct PollTimer {
    period: Duration,
    next_due: Duration,
}

impl PollTimer {
    /// Start a timer whose first firing is one `period` after `now`.
    ///
    /// A zero period is bumped to one millisecond.
    #[must_use]
    pub fn start(now: Duration, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            period,
            next_due: now.saturating_add(period),
        }
    }

    #[must_use]
    pub const fn next_due(&self) -> Duration {
        self.next_due
    }

    /// Number of whole periods that elapsed up to `now`; re-anchors the
    /// schedule past `now`.
    pub fn due_ticks(&mut self, now: Duration) -> u64 {
        if now < self.next_due {
            return 0;
        }
        let behind = now - self.next_due;
        let extra = behind.as_nanos() / self.period.as_nanos();
        let ticks = u64::try_from(extra).unwrap_or(u64::MAX - 1) + 1;
        let advance = self
            .period
            .checked_mul(u32::try_from(ticks).unwrap_or(u32::MAX))
            .unwrap_or(Duration::MAX);
        self.next_due = self.next_due.saturating_add(advance);
        ticks
    }
}
