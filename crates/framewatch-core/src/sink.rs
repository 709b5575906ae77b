#![forbid(unsafe_code)]

//! Output sink for the five display fields.

use std::collections::BTreeMap;

use serde::Serialize;

pub const TEXT_ADJUSTED_VIA_MESSAGE: &str = "Adjusted via postMessage";
pub const TEXT_HEIGHT_CHANGED: &str = "Height changed (may be manual)";
pub const TEXT_NO_CHANGE: &str = "No change detected";
pub const TEXT_LOAD_ERROR_AUTO_ADJUST: &str = "Child site not available";
pub const TEXT_LOAD_ERROR_SCROLLBAR: &str = "Iframe load error - child site may not be deployed";
pub const TEXT_TIMEOUT_AUTO_ADJUST: &str = "Child site loading timeout";
pub const TEXT_TIMEOUT_SCROLLBAR: &str = "Loading timeout - child site may not be deployed";

/// One display field of the parent page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayField {
    Width,
    Height,
    InitialHeight,
    AutoAdjust,
    ScrollbarStatus,
}

/// Foreground color side channel of the `auto-adjust` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Success,
    Failure,
}

impl Tone {
    #[must_use]
    pub const fn css_color(self) -> &'static str {
        match self {
            Self::Success => "#28a745",
            Self::Failure => "#dc3545",
        }
    }
}

/// Display collaborator. Writes are fire-and-forget: a sink that cannot
/// render simply drops the write.
pub trait StatusSink {
    fn write_text(&mut self, field: DisplayField, text: &str);
    fn set_tone(&mut self, field: DisplayField, tone: Tone);
}

/// One captured sink write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkWrite {
    Text { field: DisplayField, text: String },
    Tone { field: DisplayField, tone: Tone },
}

/// Sink that captures every write for host inspection and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    writes: Vec<SinkWrite>,
    text: BTreeMap<DisplayField, String>,
    tone: BTreeMap<DisplayField, Tone>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All writes in arrival order.
    #[must_use]
    pub fn writes(&self) -> &[SinkWrite] {
        &self.writes
    }

    /// Current text of `field`, if ever written.
    #[must_use]
    pub fn text(&self, field: DisplayField) -> Option<&str> {
        self.text.get(&field).map(String::as_str)
    }

    /// Current tone of `field`, if ever set.
    #[must_use]
    pub fn tone(&self, field: DisplayField) -> Option<Tone> {
        self.tone.get(&field).copied()
    }

    /// Number of text writes targeting `field`.
    #[must_use]
    pub fn text_writes_to(&self, field: DisplayField) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, SinkWrite::Text { field: f, .. } if *f == field))
            .count()
    }

    /// Drain captured writes, keeping current field values.
    pub fn take_writes(&mut self) -> Vec<SinkWrite> {
        std::mem::take(&mut self.writes)
    }
}

impl StatusSink for RecordingSink {
    fn write_text(&mut self, field: DisplayField, text: &str) {
        self.text.insert(field, text.to_owned());
        self.writes.push(SinkWrite::Text {
            field,
            text: text.to_owned(),
        });
    }

    fn set_tone(&mut self, field: DisplayField, tone: Tone) {
        self.tone.insert(field, tone);
        self.writes.push(SinkWrite::Tone { field, tone });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_tracks_latest_and_history() {
        let mut sink = RecordingSink::new();
        sink.write_text(DisplayField::Height, "400");
        sink.write_text(DisplayField::Height, "550");
        sink.set_tone(DisplayField::AutoAdjust, Tone::Success);
        assert_eq!(sink.text(DisplayField::Height), Some("550"));
        assert_eq!(sink.text_writes_to(DisplayField::Height), 2);
        assert_eq!(sink.tone(DisplayField::AutoAdjust), Some(Tone::Success));
        assert_eq!(sink.text(DisplayField::Width), None);

        let drained = sink.take_writes();
        assert_eq!(drained.len(), 3);
        assert!(sink.writes().is_empty());
        assert_eq!(sink.text(DisplayField::Height), Some("550"));
    }

    #[test]
    fn tone_colors() {
        assert_eq!(Tone::Success.css_color(), "#28a745");
        assert_eq!(Tone::Failure.css_color(), "#dc3545");
    }
}
