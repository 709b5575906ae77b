#![forbid(unsafe_code)]

//! Cross-document message authentication and decoding.
//!
//! Messages arrive from any origin. The origin is compared against the
//! allow-list before the payload text is deserialized; payloads from any
//! other origin are never parsed.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Payload `type` recognized by the watcher.
pub const HEIGHT_CHANGE_TYPE: &str = "height-change";

/// Raw, unauthenticated message envelope as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub origin: String,
    /// JSON text of the structured payload. Empty when the host skipped
    /// serializing a payload it knows will be discarded.
    pub data: String,
    /// Payload `type` as read by the host for diagnostics. Never used for
    /// the accept decision.
    pub kind: Option<String>,
}

impl InboundMessage {
    pub fn new(origin: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            data: data.into(),
            kind: None,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: Option<String>) -> Self {
        self.kind = kind;
        self
    }
}

/// Allow-list of exactly one origin. Comparison is exact: no wildcards,
/// no scheme or port normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedOrigin(String);

impl TrustedOrigin {
    pub fn new(origin: impl Into<String>) -> Self {
        Self(origin.into())
    }

    #[must_use]
    pub fn admits(&self, origin: &str) -> bool {
        self.0 == origin
    }
}

/// Why an authenticated payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("payload is not valid json: {0}")]
    InvalidJson(String),
    #[error("height-change payload has no numeric height")]
    MissingHeight,
    #[error("height {0} is not a finite non-negative pixel value")]
    InvalidHeight(String),
}

/// Decision for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageVerdict {
    /// Trusted `height-change` with a usable pixel height.
    HeightChange { height: u32 },
    /// Origin did not match; payload left unread.
    UntrustedOrigin,
    /// Trusted origin, but the payload `type` is absent or not recognized.
    UnrecognizedType { kind: Option<String> },
    /// Trusted origin, recognized intent, unusable payload.
    Malformed(MessageError),
}

impl MessageVerdict {
    /// Stable label attached to message diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::HeightChange { .. } => "height_change",
            Self::UntrustedOrigin => "untrusted_origin",
            Self::UnrecognizedType { .. } => "unrecognized_type",
            Self::Malformed(_) => "malformed",
        }
    }
}

#[derive(Deserialize)]
struct HeightChangePayload {
    height: Option<Value>,
}

/// Authenticate the origin, then decode the payload.
#[must_use]
pub fn authenticate_and_decode(allow: &TrustedOrigin, message: &InboundMessage) -> MessageVerdict {
    if !allow.admits(&message.origin) {
        return MessageVerdict::UntrustedOrigin;
    }

    let value: Value = match serde_json::from_str(&message.data) {
        Ok(value) => value,
        Err(err) => return MessageVerdict::Malformed(MessageError::InvalidJson(err.to_string())),
    };
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned);
    if kind.as_deref() != Some(HEIGHT_CHANGE_TYPE) {
        return MessageVerdict::UnrecognizedType { kind };
    }

    let payload = match HeightChangePayload::deserialize(&value) {
        Ok(payload) => payload,
        Err(err) => return MessageVerdict::Malformed(MessageError::InvalidJson(err.to_string())),
    };
    match payload.height.as_ref().and_then(Value::as_f64) {
        None => MessageVerdict::Malformed(MessageError::MissingHeight),
        Some(height) if !height.is_finite() || height < 0.0 => {
            MessageVerdict::Malformed(MessageError::InvalidHeight(height.to_string()))
        }
        Some(height) => MessageVerdict::HeightChange {
            height: crate::geometry::px_from_host(height),
        },
    }
}
