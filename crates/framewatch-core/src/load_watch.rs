#![forbid(unsafe_code)]

//! Iframe load lifecycle with a bounded wait.
//!
//! ```text
//! Pending ──load──▶ Loaded
//!    │  └──error──▶ Failed
//!    └──deadline──▶ TimedOut
//! ```
//!
//! All three outcomes are terminal. Reaching `Loaded` or `Failed` disarms
//! the deadline, so a late tick can never overwrite them with `TimedOut`.

use core::time::Duration;

use serde::Serialize;

/// Load lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    Pending {
        #[serde(skip)]
        deadline: Duration,
    },
    Loaded,
    Failed,
    TimedOut,
}

impl LoadState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending { .. })
    }

    /// Pending deadline, if still armed.
    #[must_use]
    pub const fn deadline(self) -> Option<Duration> {
        match self {
            Self::Pending { deadline } => Some(deadline),
            _ => None,
        }
    }
}

/// Effect of one lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTransition {
    Loaded,
    Failed,
    TimedOut,
    /// Signal arrived after a terminal state, or deadline not yet reached.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct LoadWatcher {
    state: LoadState,
    started_at: Duration,
}

impl LoadWatcher {
    /// Arm the deadline `timeout` after `now`.
    #[must_use]
    pub fn arm(now: Duration, timeout: Duration) -> Self {
        Self {
            state: LoadState::Pending {
                deadline: now.saturating_add(timeout),
            },
            started_at: now,
        }
    }

    #[must_use]
    pub const fn state(&self) -> LoadState {
        self.state
    }

    /// Time between arming and `now`.
    #[must_use]
    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.started_at)
    }

    pub fn on_load(&mut self) -> LoadTransition {
        self.settle(LoadState::Loaded, LoadTransition::Loaded)
    }

    pub fn on_error(&mut self) -> LoadTransition {
        self.settle(LoadState::Failed, LoadTransition::Failed)
    }

    /// Fire the deadline if it has elapsed at `now`.
    pub fn poll_deadline(&mut self, now: Duration) -> LoadTransition {
        match self.state {
            LoadState::Pending { deadline } if now >= deadline => {
                self.state = LoadState::TimedOut;
                LoadTransition::TimedOut
            }
            _ => LoadTransition::Ignored,
        }
    }

    fn settle(&mut self, next: LoadState, transition: LoadTransition) -> LoadTransition {
        if self.state.is_terminal() {
            return LoadTransition::Ignored;
        }
        self.state = next;
        transition
    }
}
