//! Interaction engine: target registry plus per-frame hit/dwell pipeline.
//!
//! For every frame: map each hand onto the surface, OR the hit verdict over
//! all hands per target, drive that target's `DwellTracker`, and return the
//! resulting events. No timers, no loop: the landmark source pushes frames
//! and waits for the events before sending the next one.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::dwell::{DwellPhase, DwellPolicy, DwellState, DwellTracker};
use super::hit_test::{evaluate_hand, HitPolicy, Shape};
use super::landmarks::LandmarkFrame;
use super::mapper::Surface;
use crate::config::EngineConfig;
use crate::error::InteractionError;
use crate::sexp::escape_string;

/// Number of activation dwell durations kept for averaging.
const DWELL_HISTORY: usize = 100;

// ── Target ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Registration request for a hover target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpec {
    pub id: TargetId,
    pub shape: Shape,
    pub required_dwell_ms: f64,
    pub hit_policy: HitPolicy,
}

impl TargetSpec {
    pub fn new(
        id: impl Into<String>,
        shape: Shape,
        required_dwell_ms: f64,
        hit_policy: HitPolicy,
    ) -> Self {
        Self {
            id: TargetId::new(id),
            shape,
            required_dwell_ms,
            hit_policy,
        }
    }

    fn validate(&self) -> Result<(), InteractionError> {
        let id = self.id.as_str();
        if id.is_empty() {
            return Err(InteractionError::invalid_target(id, "id must not be empty"));
        }
        self.shape
            .validate()
            .map_err(|reason| InteractionError::invalid_target(id, reason))?;
        validate_dwell(id, self.required_dwell_ms)?;
        self.hit_policy
            .validate()
            .map_err(|reason| InteractionError::invalid_target(id, reason))
    }
}

fn validate_dwell(id: &str, dwell_ms: f64) -> Result<(), InteractionError> {
    if dwell_ms.is_finite() && dwell_ms > 0.0 {
        Ok(())
    } else {
        Err(InteractionError::invalid_target(
            id,
            format!("required dwell must be positive, got {dwell_ms}"),
        ))
    }
}

#[derive(Debug, Clone)]
struct Target {
    spec: TargetSpec,
    tracker: DwellTracker,
}

// ── Events ─────────────────────────────────────────────────

/// Events emitted by `process_frame`, in target registration order.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    /// Hover progress for UI rendering, ratio in [0, 1].
    HoverProgress { target_id: TargetId, ratio: f64 },
    /// Dwell episode completed.
    Activated { target_id: TargetId, dwell_ms: f64 },
}

impl InteractionEvent {
    pub fn target_id(&self) -> &TargetId {
        match self {
            Self::HoverProgress { target_id, .. } | Self::Activated { target_id, .. } => target_id,
        }
    }

    /// Progress as a 0-100 percentage; activations report 100.
    pub fn percent(&self) -> f64 {
        match self {
            Self::HoverProgress { ratio, .. } => ratio * 100.0,
            Self::Activated { .. } => 100.0,
        }
    }

    /// Convert the event to an s-expression.
    pub fn to_sexp(&self) -> String {
        match self {
            Self::HoverProgress { target_id, ratio } => format!(
                "(:type :event :event :hover-progress :target \"{}\" :ratio {:.2})",
                escape_string(target_id.as_str()),
                ratio
            ),
            Self::Activated {
                target_id,
                dwell_ms,
            } => format!(
                "(:type :event :event :activate :target \"{}\" :dwell-ms {:.0})",
                escape_string(target_id.as_str()),
                dwell_ms
            ),
        }
    }
}

// ── Stats ──────────────────────────────────────────────────

/// Counters for interaction quality monitoring.
#[derive(Debug, Clone, Default)]
pub struct InteractionStats {
    pub frames: u64,
    pub activations: u64,
    /// Episodes reset before completion.
    pub cancellations: u64,
    /// Malformed hands excluded from hit-testing.
    pub dropped_hands: u64,
    /// Recent activation dwell durations (ms).
    pub dwell_durations: Vec<f64>,
}

impl InteractionStats {
    fn record_activation(&mut self, dwell_ms: f64) {
        self.activations += 1;
        if self.dwell_durations.len() >= DWELL_HISTORY {
            self.dwell_durations.remove(0);
        }
        self.dwell_durations.push(dwell_ms);
    }

    pub fn average_dwell_ms(&self) -> f64 {
        if self.dwell_durations.is_empty() {
            return 0.0;
        }
        self.dwell_durations.iter().sum::<f64>() / self.dwell_durations.len() as f64
    }

    pub fn status_sexp(&self) -> String {
        format!(
            "(:frames {} :activations {} :cancellations {} :dropped-hands {} :avg-dwell-ms {:.0} :samples {})",
            self.frames,
            self.activations,
            self.cancellations,
            self.dropped_hands,
            self.average_dwell_ms(),
            self.dwell_durations.len(),
        )
    }
}

// ── Clock ──────────────────────────────────────────────────

/// Monotonic millisecond clock for callers without frame timestamps.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

// ── Engine ─────────────────────────────────────────────────

/// Owns the target registry and every target's dwell state.
pub struct InteractionEngine {
    config: EngineConfig,
    targets: Vec<Target>,
    stats: InteractionStats,
    clock: MonotonicClock,
}

impl InteractionEngine {
    pub fn new(config: EngineConfig) -> Self {
        info!("Interaction engine initialized");
        Self {
            config,
            targets: Vec::new(),
            stats: InteractionStats::default(),
            clock: MonotonicClock::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> &InteractionStats {
        &self.stats
    }

    /// Add a target. Nothing is created when validation fails.
    pub fn register_target(&mut self, spec: TargetSpec) -> Result<TargetId, InteractionError> {
        spec.validate()?;
        if self.find(&spec.id).is_some() {
            return Err(InteractionError::DuplicateTarget(spec.id.to_string()));
        }

        info!(
            "Target registered: {} ({}, dwell {:.0}ms)",
            spec.id,
            spec.shape.as_str(),
            spec.required_dwell_ms
        );
        let id = spec.id.clone();
        let tracker = DwellTracker::new(spec.required_dwell_ms, self.config.dwell);
        self.targets.push(Target { spec, tracker });
        Ok(id)
    }

    /// Remove a target and its dwell state. Unknown ids are a no-op.
    /// Returns whether a target was removed.
    pub fn unregister_target(&mut self, id: &TargetId) -> bool {
        match self.find(id) {
            Some(index) => {
                let target = self.targets.remove(index);
                if target.tracker.phase() == DwellPhase::Hovering {
                    debug!(
                        "Target {} unregistered mid-dwell at progress {:.2}",
                        id,
                        target.tracker.progress()
                    );
                }
                info!("Target unregistered: {}", id);
                true
            }
            None => {
                debug!("Unregister of unknown target {} ignored", id);
                false
            }
        }
    }

    /// Change a target's required dwell. The current episode keeps its
    /// start time and is measured against the new value.
    pub fn set_required_dwell(
        &mut self,
        id: &TargetId,
        dwell_ms: f64,
    ) -> Result<(), InteractionError> {
        validate_dwell(id.as_str(), dwell_ms)?;
        let index = self
            .find(id)
            .ok_or_else(|| InteractionError::UnknownTarget(id.to_string()))?;
        let target = &mut self.targets[index];
        target.spec.required_dwell_ms = dwell_ms;
        target.tracker.set_required_ms(dwell_ms);
        info!("Target {} dwell set to {:.0}ms", id, dwell_ms);
        Ok(())
    }

    /// Replace the dwell policy for every target.
    pub fn set_dwell_policy(&mut self, policy: DwellPolicy) {
        self.config.dwell = policy;
        for target in &mut self.targets {
            target.tracker.set_policy(policy);
        }
        info!(
            "Dwell policy set: gap tolerance {:.0}ms, cooldown {:.0}ms",
            policy.gap_tolerance_ms, policy.reactivation_cooldown_ms
        );
    }

    /// Core update pipeline: hit-test every target against every hand,
    /// then advance its dwell state.
    ///
    /// `timestamp_ms` must come from a monotonic clock. Frames with a
    /// non-finite timestamp are skipped.
    pub fn process_frame(
        &mut self,
        frame: &LandmarkFrame,
        timestamp_ms: f64,
        surface: Surface,
    ) -> Vec<InteractionEvent> {
        if !timestamp_ms.is_finite() {
            warn!("Skipping frame with non-finite timestamp {}", timestamp_ms);
            return Vec::new();
        }
        self.stats.frames += 1;
        self.stats.dropped_hands += frame.dropped_hands() as u64;

        let mut events = Vec::new();
        for target in &mut self.targets {
            let hit = frame.hands().iter().any(|hand| {
                evaluate_hand(hand, &target.spec.shape, target.spec.hit_policy, &surface)
            });

            let step = target.tracker.update(hit, timestamp_ms);
            if step.cancelled {
                self.stats.cancellations += 1;
            }
            if let Some(ratio) = step.progress {
                events.push(InteractionEvent::HoverProgress {
                    target_id: target.spec.id.clone(),
                    ratio,
                });
            }
            if let Some(dwell_ms) = step.activated {
                info!("Target activated: {} after {:.0}ms", target.spec.id, dwell_ms);
                self.stats.record_activation(dwell_ms);
                events.push(InteractionEvent::Activated {
                    target_id: target.spec.id.clone(),
                    dwell_ms,
                });
            }
        }
        events
    }

    /// `process_frame` stamped with the engine's own monotonic clock.
    pub fn process_frame_now(
        &mut self,
        frame: &LandmarkFrame,
        surface: Surface,
    ) -> Vec<InteractionEvent> {
        let now_ms = self.clock.now_ms();
        self.process_frame(frame, now_ms, surface)
    }

    /// Return every target to Idle without unregistering. Emits nothing.
    pub fn reset(&mut self) {
        for target in &mut self.targets {
            target.tracker.reset();
        }
        info!("Interaction engine reset ({} targets)", self.targets.len());
    }

    /// Registered ids in registration order.
    pub fn target_ids(&self) -> Vec<TargetId> {
        self.targets.iter().map(|t| t.spec.id.clone()).collect()
    }

    pub fn target(&self, id: &TargetId) -> Option<&TargetSpec> {
        self.find(id).map(|i| &self.targets[i].spec)
    }

    pub fn dwell_state(&self, id: &TargetId) -> Option<&DwellState> {
        self.find(id).map(|i| self.targets[i].tracker.state())
    }

    pub fn progress(&self, id: &TargetId) -> Option<f64> {
        self.dwell_state(id).map(|s| s.progress)
    }

    /// Engine state as an s-expression.
    pub fn status_sexp(&self) -> String {
        let targets: Vec<String> = self
            .targets
            .iter()
            .map(|t| {
                let state = t.tracker.state();
                format!(
                    "(:id \"{}\" :phase :{} :progress {:.2} :dwell-ms {:.0} :policy {} :geometry {})",
                    escape_string(t.spec.id.as_str()),
                    state.phase.as_str(),
                    state.progress,
                    t.spec.required_dwell_ms,
                    t.spec.hit_policy.to_sexp(),
                    t.spec.shape.to_sexp(),
                )
            })
            .collect();
        format!(
            "(:targets ({}) :stats {})",
            targets.join(" "),
            self.stats.status_sexp()
        )
    }

    fn find(&self, id: &TargetId) -> Option<usize> {
        self.targets.iter().position(|t| &t.spec.id == id)
    }
}

impl Default for InteractionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::landmarks::{HandLandmark, HandLandmarkSet, Landmark};

    const SURFACE: Surface = Surface::new(640.0, 480.0, false);

    /// Hand whose landmarks all sit at surface pixel (px, py) on `SURFACE`.
    fn hand_at(px: f32, py: f32) -> HandLandmarkSet {
        HandLandmarkSet::uniform(Landmark::new(px / 640.0, py / 480.0, 0.0))
    }

    fn frame_with(hands: Vec<HandLandmarkSet>) -> LandmarkFrame {
        LandmarkFrame::new(hands)
    }

    fn rect_target(id: &str, dwell_ms: f64) -> TargetSpec {
        TargetSpec::new(
            id,
            Shape::rect(100.0, 100.0, 50.0, 50.0),
            dwell_ms,
            HitPolicy::fingertip(),
        )
    }

    fn activations(events: &[InteractionEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, InteractionEvent::Activated { .. }))
            .count()
    }

    #[test]
    fn test_register_rejects_invalid() {
        let mut engine = InteractionEngine::default();

        let bad_rect = TargetSpec::new("a", Shape::rect(0.0, 0.0, 0.0, 10.0), 100.0, HitPolicy::AnyLandmark);
        assert!(matches!(
            engine.register_target(bad_rect),
            Err(InteractionError::InvalidTarget { .. })
        ));

        let bad_radius = TargetSpec::new("b", Shape::circle(0.0, 0.0, -5.0), 100.0, HitPolicy::AnyLandmark);
        assert!(engine.register_target(bad_radius).is_err());

        let bad_dwell = rect_target("c", 0.0);
        assert!(matches!(
            engine.register_target(bad_dwell),
            Err(InteractionError::InvalidTarget { .. })
        ));

        let bad_index = TargetSpec::new(
            "d",
            Shape::rect(0.0, 0.0, 10.0, 10.0),
            100.0,
            HitPolicy::DesignatedLandmark(21),
        );
        assert!(engine.register_target(bad_index).is_err());

        assert!(engine.target_ids().is_empty(), "no partial state on failure");
    }

    #[test]
    fn test_register_rejects_duplicate_id() {
        let mut engine = InteractionEngine::default();
        engine.register_target(rect_target("ok", 100.0)).unwrap();
        assert_eq!(
            engine.register_target(rect_target("ok", 200.0)),
            Err(InteractionError::DuplicateTarget("ok".to_string()))
        );
        assert_eq!(engine.target(&"ok".into()).unwrap().required_dwell_ms, 100.0);
    }

    #[test]
    fn test_end_to_end_fingertip_rect() {
        let mut engine = InteractionEngine::default();
        let id = engine.register_target(rect_target("ok", 2500.0)).unwrap();

        // Only the index fingertip is inside the rect
        let hand = hand_at(400.0, 400.0).with_landmark(
            HandLandmark::IndexTip,
            Landmark::new(125.0 / 640.0, 125.0 / 480.0, 0.0),
        );
        let frame = frame_with(vec![hand]);

        let mut fired_at = Vec::new();
        let mut last_ratio = -1.0;
        for i in 0..=60u32 {
            let t = i as f64 * 50.0;
            let events = engine.process_frame(&frame, t, SURFACE);
            for event in &events {
                match event {
                    InteractionEvent::HoverProgress { ratio, .. } => {
                        if *ratio > 0.0 && last_ratio >= 0.0 && *ratio < 1.0 {
                            assert!((ratio - last_ratio - 0.02).abs() < 1e-9);
                        }
                        last_ratio = *ratio;
                    }
                    InteractionEvent::Activated { target_id, dwell_ms } => {
                        assert_eq!(target_id, &id);
                        assert_eq!(*dwell_ms, 2500.0);
                        fired_at.push(i);
                    }
                }
            }
            if i == 50 {
                break;
            }
        }
        assert_eq!(fired_at, vec![50], "exactly one activation at 2500ms");
        assert_eq!(engine.stats().activations, 1);
    }

    #[test]
    fn test_continuous_hit_fires_once_per_episode() {
        let mut engine = InteractionEngine::default();
        engine.register_target(rect_target("ok", 500.0)).unwrap();
        let frame = frame_with(vec![hand_at(120.0, 120.0)]);

        let mut fire_times = Vec::new();
        for i in 0..=40u32 {
            let t = i as f64 * 50.0;
            let events = engine.process_frame(&frame, t, SURFACE);
            if activations(&events) > 0 {
                fire_times.push(t);
            }
            assert!(activations(&events) <= 1);
        }
        // 0 -> 500 fires, re-arms at 550, fires at 1050, re-arms at 1100, fires at 1600
        assert_eq!(fire_times, vec![500.0, 1050.0, 1600.0]);
    }

    #[test]
    fn test_gap_resets_progress() {
        let mut engine = InteractionEngine::default();
        let id = engine.register_target(rect_target("ok", 1000.0)).unwrap();
        let inside = frame_with(vec![hand_at(120.0, 120.0)]);
        let empty = LandmarkFrame::empty();

        engine.process_frame(&inside, 0.0, SURFACE);
        engine.process_frame(&inside, 600.0, SURFACE);
        assert!((engine.progress(&id).unwrap() - 0.6).abs() < 1e-9);

        let events = engine.process_frame(&empty, 650.0, SURFACE);
        assert_eq!(
            events,
            vec![InteractionEvent::HoverProgress {
                target_id: id.clone(),
                ratio: 0.0
            }]
        );
        assert_eq!(engine.stats().cancellations, 1);

        let events = engine.process_frame(&inside, 700.0, SURFACE);
        assert_eq!(events.len(), 1);
        assert_eq!(engine.progress(&id), Some(0.0));
        assert_eq!(engine.dwell_state(&id).unwrap().episode_start_ms, Some(700.0));
    }

    #[test]
    fn test_non_finite_timestamp_skipped() {
        let mut engine = InteractionEngine::default();
        let id = engine.register_target(rect_target("ok", 1000.0)).unwrap();
        let inside = frame_with(vec![hand_at(120.0, 120.0)]);

        assert!(engine.process_frame(&inside, f64::NAN, SURFACE).is_empty());
        assert_eq!(engine.dwell_state(&id).unwrap().phase, DwellPhase::Idle);
        assert_eq!(engine.stats().frames, 0);

        engine.process_frame(&inside, 0.0, SURFACE);
        let events = engine.process_frame(&inside, 1000.0, SURFACE);
        assert_eq!(activations(&events), 1);
    }

    #[test]
    fn test_long_absence_restarts_with_gap_tolerance() {
        let mut engine = InteractionEngine::default();
        engine.set_dwell_policy(DwellPolicy {
            gap_tolerance_ms: 100.0,
            reactivation_cooldown_ms: 0.0,
        });
        let id = engine.register_target(rect_target("ok", 1000.0)).unwrap();
        let inside = frame_with(vec![hand_at(120.0, 120.0)]);

        engine.process_frame(&inside, 0.0, SURFACE);
        assert!(engine.process_frame(&LandmarkFrame::empty(), 90.0, SURFACE).is_empty());
        let events = engine.process_frame(&inside, 5000.0, SURFACE);
        assert_eq!(activations(&events), 0);
        assert_eq!(engine.dwell_state(&id).unwrap().episode_start_ms, Some(5000.0));
        assert_eq!(engine.stats().cancellations, 1);
    }

    #[test]
    fn test_multi_hand_or() {
        let mut engine = InteractionEngine::default();
        let id = engine.register_target(rect_target("ok", 1000.0)).unwrap();
        let frame = frame_with(vec![hand_at(500.0, 400.0), hand_at(120.0, 120.0)]);

        let events = engine.process_frame(&frame, 0.0, SURFACE);
        assert_eq!(events.len(), 1);
        assert_eq!(engine.dwell_state(&id).unwrap().phase, DwellPhase::Hovering);
    }

    #[test]
    fn test_switching_hands_keeps_timer() {
        let mut engine = InteractionEngine::default();
        engine.register_target(rect_target("ok", 1000.0)).unwrap();
        let left_in = frame_with(vec![hand_at(120.0, 120.0), hand_at(500.0, 400.0)]);
        let right_in = frame_with(vec![hand_at(500.0, 400.0), hand_at(130.0, 130.0)]);

        let mut fired = 0;
        for i in 0..=10u32 {
            let frame = if i % 2 == 0 { &left_in } else { &right_in };
            fired += activations(&engine.process_frame(frame, i as f64 * 100.0, SURFACE));
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_malformed_hand_is_absent() {
        let mut engine = InteractionEngine::default();
        let id = engine.register_target(rect_target("ok", 1000.0)).unwrap();
        let frame = LandmarkFrame::from_raw(vec![vec![Landmark::new(0.19, 0.25, 0.0); 8]]);

        let events = engine.process_frame(&frame, 0.0, SURFACE);
        assert!(events.is_empty());
        assert_eq!(engine.dwell_state(&id).unwrap().phase, DwellPhase::Idle);
        assert_eq!(engine.stats().dropped_hands, 1);
    }

    #[test]
    fn test_unregister_mid_dwell_is_silent() {
        let mut engine = InteractionEngine::default();
        let id = engine.register_target(rect_target("ok", 1000.0)).unwrap();
        let inside = frame_with(vec![hand_at(120.0, 120.0)]);

        engine.process_frame(&inside, 0.0, SURFACE);
        engine.process_frame(&inside, 900.0, SURFACE);
        assert!((engine.progress(&id).unwrap() - 0.9).abs() < 1e-9);

        assert!(engine.unregister_target(&id));
        for i in 0..20 {
            let events = engine.process_frame(&inside, 950.0 + i as f64 * 100.0, SURFACE);
            assert!(events.iter().all(|e| e.target_id() != &id));
        }
        assert!(engine.dwell_state(&id).is_none());

        // Idempotent
        assert!(!engine.unregister_target(&id));
    }

    #[test]
    fn test_reset_returns_targets_to_idle() {
        let mut engine = InteractionEngine::default();
        let a = engine.register_target(rect_target("a", 1000.0)).unwrap();
        let b = engine
            .register_target(TargetSpec::new(
                "b",
                Shape::circle(125.0, 125.0, 30.0),
                1000.0,
                HitPolicy::AnyLandmark,
            ))
            .unwrap();
        let inside = frame_with(vec![hand_at(125.0, 125.0)]);

        engine.process_frame(&inside, 0.0, SURFACE);
        engine.process_frame(&inside, 500.0, SURFACE);
        engine.reset();

        assert_eq!(engine.target_ids(), vec![a.clone(), b.clone()]);
        assert_eq!(engine.dwell_state(&a), Some(&DwellState::default()));
        assert_eq!(engine.dwell_state(&b), Some(&DwellState::default()));

        // No trailing event from the cancelled episodes
        let events = engine.process_frame(&LandmarkFrame::empty(), 600.0, SURFACE);
        assert!(events.is_empty());
    }

    #[test]
    fn test_events_follow_registration_order() {
        let mut engine = InteractionEngine::default();
        engine.register_target(rect_target("first", 1000.0)).unwrap();
        engine
            .register_target(TargetSpec::new(
                "second",
                Shape::rect(0.0, 0.0, 640.0, 480.0),
                1000.0,
                HitPolicy::AnyLandmark,
            ))
            .unwrap();
        let events = engine.process_frame(&frame_with(vec![hand_at(120.0, 120.0)]), 0.0, SURFACE);
        let ids: Vec<&str> = events.iter().map(|e| e.target_id().as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_set_required_dwell() {
        let mut engine = InteractionEngine::default();
        let id = engine.register_target(rect_target("ok", 1000.0)).unwrap();
        engine.set_required_dwell(&id, 200.0).unwrap();
        assert_eq!(engine.target(&id).unwrap().required_dwell_ms, 200.0);

        assert_eq!(
            engine.set_required_dwell(&"missing".into(), 200.0),
            Err(InteractionError::UnknownTarget("missing".to_string()))
        );
        assert!(engine.set_required_dwell(&id, -1.0).is_err());

        let inside = frame_with(vec![hand_at(120.0, 120.0)]);
        engine.process_frame(&inside, 0.0, SURFACE);
        let events = engine.process_frame(&inside, 200.0, SURFACE);
        assert_eq!(activations(&events), 1);
    }

    #[test]
    fn test_cooldown_policy_applies_to_existing_targets() {
        let mut engine = InteractionEngine::default();
        engine.register_target(rect_target("ok", 100.0)).unwrap();
        engine.set_dwell_policy(DwellPolicy {
            gap_tolerance_ms: 0.0,
            reactivation_cooldown_ms: 1000.0,
        });
        let inside = frame_with(vec![hand_at(120.0, 120.0)]);

        let mut fired = 0;
        for i in 0..=20u32 {
            fired += activations(&engine.process_frame(&inside, i as f64 * 50.0, SURFACE));
        }
        // Fires at 100, blocked until 1100 > 1000
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_event_sexp_and_percent() {
        let progress = InteractionEvent::HoverProgress {
            target_id: "ok".into(),
            ratio: 0.4,
        };
        assert_eq!(
            progress.to_sexp(),
            "(:type :event :event :hover-progress :target \"ok\" :ratio 0.40)"
        );
        assert!((progress.percent() - 40.0).abs() < 1e-9);

        let activated = InteractionEvent::Activated {
            target_id: "ok".into(),
            dwell_ms: 2500.0,
        };
        assert_eq!(
            activated.to_sexp(),
            "(:type :event :event :activate :target \"ok\" :dwell-ms 2500)"
        );
        assert_eq!(activated.percent(), 100.0);
    }

    #[test]
    fn test_status_sexp_is_parseable() {
        let mut engine = InteractionEngine::default();
        engine.register_target(rect_target("ok", 1000.0)).unwrap();
        let status = engine.status_sexp();
        assert!(status.contains(":id \"ok\""));
        assert!(status.contains(":phase :idle"));
        assert!(lexpr::from_str(&status).is_ok());
    }

    #[test]
    fn test_stats_average_dwell() {
        let mut stats = InteractionStats::default();
        assert_eq!(stats.average_dwell_ms(), 0.0);
        stats.record_activation(200.0);
        stats.record_activation(400.0);
        assert_eq!(stats.activations, 2);
        assert_eq!(stats.average_dwell_ms(), 300.0);
        assert!(stats.status_sexp().contains(":activations 2"));
    }

    #[test]
    fn test_process_frame_now_uses_monotonic_clock() {
        let mut engine = InteractionEngine::default();
        let id = engine.register_target(rect_target("ok", 60_000.0)).unwrap();
        let inside = frame_with(vec![hand_at(120.0, 120.0)]);
        engine.process_frame_now(&inside, SURFACE);
        let start = engine.dwell_state(&id).unwrap().episode_start_ms.unwrap();
        engine.process_frame_now(&inside, SURFACE);
        assert!(engine.dwell_state(&id).unwrap().last_hit_ms.unwrap() >= start);
    }
}
