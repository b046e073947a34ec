//! Landmark source boundary and the push-process-return driver.
//!
//! The pose estimator lives outside this crate. Anything that can yield
//! timestamped `LandmarkFrame`s implements `LandmarkSource`; `drive` pulls
//! one frame at a time, hands it to the engine and forwards the events
//! before asking for the next frame.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use super::engine::{InteractionEngine, InteractionEvent};
use super::landmarks::LandmarkFrame;
use super::mapper::Surface;

// ── Options ────────────────────────────────────────────────

/// Estimator settings a source is expected to honour.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOptions {
    /// Maximum hands delivered per frame.
    pub max_num_hands: usize,
    /// Model complexity level (0 = lite, 1 = full).
    pub model_complexity: u8,
    /// Minimum confidence for a new detection.
    pub min_detection_confidence: f32,
    /// Minimum confidence to keep tracking a detected hand.
    pub min_tracking_confidence: f32,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            max_num_hands: 2,
            model_complexity: 1,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

impl SourceOptions {
    pub fn config_sexp(&self) -> String {
        format!(
            "(:max-hands {} :model-complexity {} :min-detection-confidence {:.2} :min-tracking-confidence {:.2})",
            self.max_num_hands,
            self.model_complexity,
            self.min_detection_confidence,
            self.min_tracking_confidence,
        )
    }
}

// ── Source trait ───────────────────────────────────────────

/// A frame plus the monotonic time it was captured at.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedFrame {
    pub frame: LandmarkFrame,
    pub timestamp_ms: f64,
}

impl TimedFrame {
    pub fn new(frame: LandmarkFrame, timestamp_ms: f64) -> Self {
        Self {
            frame,
            timestamp_ms,
        }
    }
}

/// Availability of the camera/estimator behind a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Available,
    /// e.g. camera permission denied. Reported once, never per frame.
    Unavailable { reason: String },
}

pub trait LandmarkSource {
    fn status(&self) -> SourceStatus;

    /// Next frame, or `None` when the stream has ended.
    fn next_frame(&mut self) -> Option<TimedFrame>;
}

// ── Scripted source ────────────────────────────────────────

/// In-memory frame sequence for tests and replays.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    frames: VecDeque<TimedFrame>,
    status: SourceStatus,
    options: SourceOptions,
    last_timestamp_ms: Option<f64>,
}

impl ScriptedSource {
    pub fn new(frames: Vec<TimedFrame>, options: SourceOptions) -> Self {
        Self {
            frames: frames.into(),
            status: SourceStatus::Available,
            options,
            last_timestamp_ms: None,
        }
    }

    /// A source that never produces frames.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            frames: VecDeque::new(),
            status: SourceStatus::Unavailable {
                reason: reason.into(),
            },
            options: SourceOptions::default(),
            last_timestamp_ms: None,
        }
    }

    pub fn push(&mut self, frame: TimedFrame) {
        self.frames.push_back(frame);
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl LandmarkSource for ScriptedSource {
    fn status(&self) -> SourceStatus {
        self.status.clone()
    }

    fn next_frame(&mut self) -> Option<TimedFrame> {
        if self.status != SourceStatus::Available {
            return None;
        }
        while let Some(mut timed) = self.frames.pop_front() {
            if let Some(last) = self.last_timestamp_ms {
                if timed.timestamp_ms < last {
                    warn!(
                        "Dropping frame at {:.0}ms: timestamp went backwards (last {:.0}ms)",
                        timed.timestamp_ms, last
                    );
                    continue;
                }
            }
            self.last_timestamp_ms = Some(timed.timestamp_ms);
            timed.frame.truncate(self.options.max_num_hands);
            return Some(timed);
        }
        None
    }
}

// ── Driver ─────────────────────────────────────────────────

/// Summary of one `drive` run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriveReport {
    pub frames: usize,
    pub events: usize,
    pub activations: usize,
    /// Set when the source was unavailable; the engine saw no frames.
    pub unavailable: Option<String>,
}

/// Feed every frame from `source` into `engine`, calling `on_event` for
/// each emitted event before the next frame is pulled.
pub fn drive<S, F>(
    engine: &mut InteractionEngine,
    source: &mut S,
    surface: Surface,
    mut on_event: F,
) -> DriveReport
where
    S: LandmarkSource,
    F: FnMut(&InteractionEvent),
{
    let mut report = DriveReport::default();

    if let SourceStatus::Unavailable { reason } = source.status() {
        warn!("Landmark source unavailable: {}", reason);
        report.unavailable = Some(reason);
        return report;
    }

    while let Some(timed) = source.next_frame() {
        let events = engine.process_frame(&timed.frame, timed.timestamp_ms, surface);
        report.frames += 1;
        for event in &events {
            if matches!(event, InteractionEvent::Activated { .. }) {
                report.activations += 1;
            }
            on_event(event);
        }
        report.events += events.len();
    }

    debug!("Landmark source drained after {} frames", report.frames);
    info!(
        "Drive finished: {} frames, {} events, {} activations",
        report.frames, report.events, report.activations
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::engine::TargetSpec;
    use crate::interaction::hit_test::{HitPolicy, Shape};
    use crate::interaction::landmarks::{HandLandmarkSet, Landmark};

    const SURFACE: Surface = Surface::new(100.0, 100.0, false);

    fn inside_frame(t: f64) -> TimedFrame {
        let hand = HandLandmarkSet::uniform(Landmark::new(0.5, 0.5, 0.0));
        TimedFrame::new(LandmarkFrame::new(vec![hand]), t)
    }

    fn engine_with_target(dwell_ms: f64) -> InteractionEngine {
        let mut engine = InteractionEngine::default();
        engine
            .register_target(TargetSpec::new(
                "center",
                Shape::circle(50.0, 50.0, 10.0),
                dwell_ms,
                HitPolicy::AnyLandmark,
            ))
            .unwrap();
        engine
    }

    #[test]
    fn test_drive_synthetic_sequence() {
        let mut engine = engine_with_target(200.0);
        let frames = (0..=4).map(|i| inside_frame(i as f64 * 50.0)).collect();
        let mut source = ScriptedSource::new(frames, SourceOptions::default());

        let mut seen = Vec::new();
        let report = drive(&mut engine, &mut source, SURFACE, |e| seen.push(e.clone()));

        assert_eq!(report.frames, 5);
        assert_eq!(report.activations, 1);
        assert_eq!(report.events, seen.len());
        assert!(matches!(seen.last(), Some(InteractionEvent::Activated { .. })));
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_unavailable_source_reported_once() {
        let mut engine = engine_with_target(200.0);
        let mut source = ScriptedSource::unavailable("camera permission denied");

        let mut calls = 0;
        let report = drive(&mut engine, &mut source, SURFACE, |_| calls += 1);

        assert_eq!(report.unavailable.as_deref(), Some("camera permission denied"));
        assert_eq!(report.frames, 0);
        assert_eq!(calls, 0);
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_backwards_timestamps_dropped() {
        let mut source = ScriptedSource::new(
            vec![inside_frame(100.0), inside_frame(50.0), inside_frame(150.0)],
            SourceOptions::default(),
        );
        assert_eq!(source.next_frame().map(|f| f.timestamp_ms), Some(100.0));
        assert_eq!(source.next_frame().map(|f| f.timestamp_ms), Some(150.0));
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_pushed_frames_are_queued() {
        let mut source = ScriptedSource::new(Vec::new(), SourceOptions::default());
        assert_eq!(source.remaining(), 0);
        source.push(inside_frame(0.0));
        source.push(inside_frame(50.0));
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_frame().map(|f| f.timestamp_ms), Some(0.0));
        assert_eq!(source.remaining(), 1);
    }

    #[test]
    fn test_max_hands_enforced() {
        let hand = HandLandmarkSet::uniform(Landmark::default());
        let frame = LandmarkFrame::new(vec![hand.clone(), hand.clone(), hand]);
        let options = SourceOptions {
            max_num_hands: 2,
            ..SourceOptions::default()
        };
        let mut source = ScriptedSource::new(vec![TimedFrame::new(frame, 0.0)], options);
        assert_eq!(source.next_frame().unwrap().frame.hands().len(), 2);
    }

    #[test]
    fn test_empty_frames_keep_targets_idle() {
        let mut engine = engine_with_target(200.0);
        let frames = (0..10)
            .map(|i| TimedFrame::new(LandmarkFrame::empty(), i as f64 * 30.0))
            .collect();
        let mut source = ScriptedSource::new(frames, SourceOptions::default());
        let report = drive(&mut engine, &mut source, SURFACE, |_| {});
        assert_eq!(report.frames, 10);
        assert_eq!(report.events, 0);
    }

    #[test]
    fn test_options_sexp() {
        let sexp = SourceOptions::default().config_sexp();
        assert!(sexp.contains(":max-hands 2"));
        assert!(sexp.contains(":min-detection-confidence 0.50"));
    }
}
