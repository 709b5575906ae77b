#![forbid(unsafe_code)]

//! Watch configuration.
//!
//! Every tunable lives in [`WatchConfig`]. `WatchConfig::default()` carries
//! the production values, so hosts that never pass a config behave exactly
//! like the hardcoded page script.
//!
//! ```json
//! {
//!   "trusted_origin": "https://kzk4043.github.io",
//!   "load_timeout_ms": 30000,
//!   "poll_interval_ms": 3000
//! }
//! ```

use core::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::millis_u64;

/// Origin allowed to send `height-change` messages.
pub const DEFAULT_TRUSTED_ORIGIN: &str = "https://kzk4043.github.io";
/// Load deadline before the child is reported as timed out.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);
/// Fallback poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Initial height baseline used when the iframe measures `0` at startup.
pub const DEFAULT_FALLBACK_INITIAL_HEIGHT: u32 = 400;

/// Configuration errors surfaced by [`WatchConfig::validate`] and the loaders.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("trusted origin must not be empty")]
    EmptyTrustedOrigin,
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("element id for `{0}` must not be empty")]
    EmptyElementId(&'static str),
}

/// DOM element ids consumed by the web host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementIds {
    pub iframe: String,
    pub width: String,
    pub height: String,
    pub initial_height: String,
    pub auto_adjust: String,
    pub scrollbar_status: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            iframe: "child-iframe".into(),
            width: "iframe-width".into(),
            height: "iframe-height".into(),
            initial_height: "initial-height".into(),
            auto_adjust: "auto-adjust".into(),
            scrollbar_status: "scrollbar-status".into(),
        }
    }
}

impl ElementIds {
    /// `(label, id)` pairs in lookup order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("iframe", &self.iframe),
            ("width", &self.width),
            ("height", &self.height),
            ("initial_height", &self.initial_height),
            ("auto_adjust", &self.auto_adjust),
            ("scrollbar_status", &self.scrollbar_status),
        ]
    }
}

/// Top-level watch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// The single origin whose messages are acted upon.
    pub trusted_origin: String,
    /// Load deadline, milliseconds.
    pub load_timeout_ms: u64,
    /// Fallback poll cadence, milliseconds.
    pub poll_interval_ms: u64,
    /// Baseline used when the iframe reports height `0` at startup.
    pub fallback_initial_height: u32,
    pub element_ids: ElementIds,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            trusted_origin: DEFAULT_TRUSTED_ORIGIN.into(),
            load_timeout_ms: millis_u64(DEFAULT_LOAD_TIMEOUT),
            poll_interval_ms: millis_u64(DEFAULT_POLL_INTERVAL),
            fallback_initial_height: DEFAULT_FALLBACK_INITIAL_HEIGHT,
            element_ids: ElementIds::default(),
        }
    }
}

impl WatchConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub const fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject configurations the watcher cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trusted_origin.trim().is_empty() {
            return Err(ConfigError::EmptyTrustedOrigin);
        }
        if self.load_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("load_timeout_ms"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("poll_interval_ms"));
        }
        for (label, id) in self.element_ids.entries() {
            if id.trim().is_empty() {
                return Err(ConfigError::EmptyElementId(label));
            }
        }
        Ok(())
    }
}
