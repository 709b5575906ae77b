#![forbid(unsafe_code)]

use core::time::Duration;

use framewatch_core::sink::{
    TEXT_ADJUSTED_VIA_MESSAGE, TEXT_HEIGHT_CHANGED, TEXT_LOAD_ERROR_AUTO_ADJUST,
    TEXT_LOAD_ERROR_SCROLLBAR, TEXT_NO_CHANGE, TEXT_TIMEOUT_AUTO_ADJUST, TEXT_TIMEOUT_SCROLLBAR,
};
use framewatch_core::{
    ContentAccess, DimensionSample, DisplayField, FrameHost, FrameWatch, InboundMessage,
    LoadState, LoadTransition, MessageVerdict, RecordingSink, ScrollMetrics, ScrollbarStatus,
    SinkWrite, Tone, WatchConfig,
};
use pretty_assertions::assert_eq;

const TRUSTED: &str = "https://kzk4043.github.io";

/// Scripted iframe: tests mutate its box and content access directly.
#[derive(Debug, Clone)]
struct FakeFrame {
    width: u32,
    height: u32,
    access: ContentAccess,
    height_sets: Vec<u32>,
}

impl FakeFrame {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            access: ContentAccess::Readable(ScrollMetrics {
                scroll_height: height,
                client_height: height,
            }),
            height_sets: Vec::new(),
        }
    }
}

impl FrameHost for FakeFrame {
    fn measure(&self) -> DimensionSample {
        DimensionSample::new(self.width, self.height)
    }

    fn set_height_px(&mut self, height: u32) {
        self.height = height;
        self.height_sets.push(height);
    }

    fn probe_content(&self) -> ContentAccess {
        self.access.clone()
    }
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn start(frame: FakeFrame) -> FrameWatch<FakeFrame, RecordingSink> {
    FrameWatch::start(WatchConfig::default(), frame, RecordingSink::new(), Duration::ZERO)
        .expect("default config is valid")
}

fn height_change(height: u32) -> String {
    format!(r#"{{"type":"height-change","height":{height}}}"#)
}

#[test]
fn startup_publishes_initial_and_current_dimensions() {
    let watch = start(FakeFrame::new(800, 400));
    let sink = watch.sink();
    assert_eq!(sink.text(DisplayField::InitialHeight), Some("400"));
    assert_eq!(sink.text(DisplayField::Width), Some("800"));
    assert_eq!(sink.text(DisplayField::Height), Some("400"));
    assert_eq!(sink.text(DisplayField::ScrollbarStatus), None);
    assert_eq!(watch.load_state(), LoadState::Pending { deadline: ms(30_000) });
}

#[test]
fn zero_initial_height_uses_fallback_baseline() {
    let watch = start(FakeFrame::new(800, 0));
    assert_eq!(watch.state().initial_height(), 400);
    assert_eq!(watch.sink().text(DisplayField::InitialHeight), Some("400"));
    assert_eq!(watch.sink().text(DisplayField::Height), Some("0"));
}

#[test]
fn initial_height_survives_all_resize_activity() {
    let mut watch = start(FakeFrame::new(800, 400));
    watch.on_load(ms(100));
    for height in [550, 620, 100, 0, 400] {
        watch.host_mut().height = height;
        watch.on_resize(&[DimensionSample::new(800, height)]);
        watch.advance_to(watch.now() + ms(3_000));
    }
    watch.on_message(&InboundMessage::new(TRUSTED, height_change(900)));
    assert_eq!(watch.state().initial_height(), 400);
    assert_eq!(watch.sink().text_writes_to(DisplayField::InitialHeight), 1);
}

#[test]
fn poll_repeats_do_not_rewrite_display() {
    let mut watch = start(FakeFrame::new(800, 400));
    watch.on_load(ms(50));
    watch.sink_mut().take_writes();

    for step in 1..=10 {
        watch.advance_to(ms(3_000 * step));
    }
    // Loaded already, so the 30s deadline is disarmed.
    let writes = watch.sink_mut().take_writes();
    assert!(writes.is_empty(), "unexpected writes: {writes:?}");
    assert_eq!(watch.counters().poll_ticks, 10);
}

#[test]
fn poll_picks_up_silent_layout_change() {
    let mut watch = start(FakeFrame::new(800, 400));
    watch.on_load(ms(10));
    watch.host_mut().width = 640;
    watch.advance_to(ms(2_999));
    assert_eq!(watch.sink().text(DisplayField::Width), Some("800"));
    watch.advance_to(ms(3_000));
    assert_eq!(watch.sink().text(DisplayField::Width), Some("640"));
    assert_eq!(watch.state().last_sample(), Some(DimensionSample::new(640, 400)));
}

#[test]
fn trusted_height_change_adjusts_frame_and_display() {
    let mut watch = start(FakeFrame::new(800, 400));
    watch.on_load(ms(10));
    let verdict = watch.on_message(&InboundMessage::new(TRUSTED, height_change(600)));
    assert_eq!(verdict, MessageVerdict::HeightChange { height: 600 });
    assert_eq!(watch.host().height_sets, vec![600]);
    let sink = watch.sink();
    assert_eq!(sink.text(DisplayField::Height), Some("600"));
    assert_eq!(sink.text(DisplayField::AutoAdjust), Some(TEXT_ADJUSTED_VIA_MESSAGE));
    assert_eq!(sink.tone(DisplayField::AutoAdjust), Some(Tone::Success));
}

#[test]
fn untrusted_height_change_mutates_nothing() {
    let mut watch = start(FakeFrame::new(800, 400));
    watch.on_load(ms(10));
    watch.sink_mut().take_writes();

    let verdict = watch.on_message(&InboundMessage::new(
        "https://attacker.example",
        height_change(600),
    ));
    assert_eq!(verdict, MessageVerdict::UntrustedOrigin);
    assert!(watch.sink().writes().is_empty());
    assert!(watch.host().height_sets.is_empty());
    assert_eq!(watch.counters().messages_rejected, 1);
    assert_eq!(watch.counters().messages_accepted, 0);
}

#[test]
fn trusted_unknown_type_mutates_nothing() {
    let mut watch = start(FakeFrame::new(800, 400));
    watch.sink_mut().take_writes();
    let verdict = watch.on_message(&InboundMessage::new(TRUSTED, r#"{"type":"ready"}"#));
    assert_eq!(
        verdict,
        MessageVerdict::UnrecognizedType {
            kind: Some("ready".into())
        }
    );
    assert!(watch.sink().writes().is_empty());
}

#[test]
fn timeout_text_written_once_and_survives_late_load() {
    let mut watch = start(FakeFrame::new(800, 400));
    let report = watch.advance_to(ms(30_000));
    assert!(report.timed_out);
    assert_eq!(
        watch.sink().text(DisplayField::AutoAdjust),
        Some(TEXT_TIMEOUT_AUTO_ADJUST)
    );
    assert_eq!(
        watch.sink().text(DisplayField::ScrollbarStatus),
        Some(TEXT_TIMEOUT_SCROLLBAR)
    );
    assert_eq!(watch.sink().tone(DisplayField::AutoAdjust), Some(Tone::Failure));

    assert_eq!(watch.on_load(ms(31_000)), LoadTransition::Ignored);
    assert!(!watch.advance_to(ms(60_000)).timed_out);

    let timeout_writes = watch
        .sink()
        .writes()
        .iter()
        .filter(|w| matches!(w, SinkWrite::Text { text, .. } if text == TEXT_TIMEOUT_AUTO_ADJUST))
        .count();
    assert_eq!(timeout_writes, 1);
    assert_eq!(
        watch.sink().text(DisplayField::AutoAdjust),
        Some(TEXT_TIMEOUT_AUTO_ADJUST)
    );
    assert_eq!(watch.load_state(), LoadState::TimedOut);
    assert!(watch.state().load_timed_out());
}

#[test]
fn load_then_error_keeps_loaded() {
    let mut watch = start(FakeFrame::new(800, 400));
    assert_eq!(watch.on_load(ms(200)), LoadTransition::Loaded);
    assert_eq!(watch.on_error(ms(300)), LoadTransition::Ignored);
    assert_eq!(watch.load_state(), LoadState::Loaded);
    assert!(!watch.state().load_failed());
    assert_eq!(watch.sink().text(DisplayField::ScrollbarStatus), Some("No"));
    assert!(!watch.advance_to(ms(40_000)).timed_out);
}

#[test]
fn error_then_load_keeps_failed() {
    let mut watch = start(FakeFrame::new(800, 400));
    assert_eq!(watch.on_error(ms(200)), LoadTransition::Failed);
    assert_eq!(watch.on_load(ms(300)), LoadTransition::Ignored);
    assert_eq!(watch.load_state(), LoadState::Failed);
    let sink = watch.sink();
    assert_eq!(sink.text(DisplayField::AutoAdjust), Some(TEXT_LOAD_ERROR_AUTO_ADJUST));
    assert_eq!(
        sink.text(DisplayField::ScrollbarStatus),
        Some(TEXT_LOAD_ERROR_SCROLLBAR)
    );
    assert_eq!(sink.tone(DisplayField::AutoAdjust), Some(Tone::Failure));
    assert!(!watch.advance_to(ms(40_000)).timed_out);
    assert_eq!(
        watch.sink().text(DisplayField::AutoAdjust),
        Some(TEXT_LOAD_ERROR_AUTO_ADJUST)
    );
}

#[test]
fn cross_origin_child_is_indeterminate_never_absent() {
    let mut frame = FakeFrame::new(800, 400);
    frame.access = ContentAccess::Denied {
        reason: "SecurityError".into(),
    };
    let mut watch = start(frame);
    watch.on_load(ms(10));
    assert_eq!(watch.state().last_scrollbar(), Some(ScrollbarStatus::Indeterminate));
    assert_eq!(
        watch.sink().text(DisplayField::ScrollbarStatus),
        Some("Cannot determine (CORS)")
    );

    watch.host_mut().access = ContentAccess::NoContentWindow;
    watch.advance_to(ms(3_000));
    assert_eq!(watch.state().last_scrollbar(), Some(ScrollbarStatus::Indeterminate));
}

#[test]
fn scrollbar_follows_content_growth() {
    let mut watch = start(FakeFrame::new(800, 400));
    watch.on_load(ms(10));
    assert_eq!(watch.sink().text(DisplayField::ScrollbarStatus), Some("No"));
    watch.host_mut().access = ContentAccess::Readable(ScrollMetrics {
        scroll_height: 1200,
        client_height: 400,
    });
    watch.advance_to(ms(3_000));
    assert_eq!(watch.sink().text(DisplayField::ScrollbarStatus), Some("Yes"));
}

#[test]
fn resize_away_from_initial_reports_manual_change() {
    let mut watch = start(FakeFrame::new(800, 400));
    watch.host_mut().height = 550;
    watch.on_resize(&[DimensionSample::new(800, 550)]);
    let sink = watch.sink();
    assert_eq!(sink.text(DisplayField::AutoAdjust), Some(TEXT_HEIGHT_CHANGED));
    assert_eq!(sink.tone(DisplayField::AutoAdjust), Some(Tone::Success));
    assert_eq!(sink.text(DisplayField::Height), Some("550"));
}

#[test]
fn resize_at_initial_reports_no_change() {
    let mut watch = start(FakeFrame::new(800, 400));
    watch.on_resize(&[DimensionSample::new(800, 400)]);
    let sink = watch.sink();
    assert_eq!(sink.text(DisplayField::AutoAdjust), Some(TEXT_NO_CHANGE));
    assert_eq!(sink.tone(DisplayField::AutoAdjust), Some(Tone::Failure));
    assert_eq!(sink.text_writes_to(DisplayField::Height), 1);
}

#[test]
fn missing_resize_observer_leaves_poll_fallback_working() {
    let mut watch = start(FakeFrame::new(800, 400));
    watch.resize_observer_unavailable("ResizeObserver is not defined");
    watch.on_load(ms(10));
    watch.host_mut().height = 700;
    watch.advance_to(ms(3_000));
    assert_eq!(watch.sink().text(DisplayField::Height), Some("700"));
    assert!(!watch.snapshot().resize_observer_attached);
}

#[test]
fn snapshot_reflects_counters_and_state() {
    let mut watch = start(FakeFrame::new(800, 400));
    watch.resize_observer_attached();
    watch.on_load(ms(10));
    watch.on_message(&InboundMessage::new(TRUSTED, height_change(610)));
    watch.on_message(&InboundMessage::new("https://x.example", "{}"));
    watch.on_resize(&[DimensionSample::new(800, 610)]);
    watch.advance_to(ms(6_500));

    let snapshot = watch.snapshot();
    assert_eq!(snapshot.width, Some(800));
    assert_eq!(snapshot.height, Some(610));
    assert_eq!(snapshot.initial_height, 400);
    assert_eq!(snapshot.scrollbar, Some(ScrollbarStatus::Absent));
    assert_eq!(snapshot.load, LoadState::Loaded);
    assert!(snapshot.resize_observer_attached);
    assert_eq!(snapshot.counters.messages_received, 2);
    assert_eq!(snapshot.counters.messages_accepted, 1);
    assert_eq!(snapshot.counters.messages_rejected, 1);
    assert_eq!(snapshot.counters.resize_notifications, 1);
    assert_eq!(snapshot.counters.poll_ticks, 2);
    assert_eq!(snapshot.now_ms, 6_500);
}
