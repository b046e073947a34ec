//! Per-target dwell state machine.
//!
//! Turns a per-frame boolean "hit" into hover progress and activation.
//! Elapsed time is always `now - episode_start` from caller timestamps
//! (milliseconds, monotonic), never a frame count, so frame rate does not
//! change the meaning of the required dwell.
//!
//! Phases: `Idle` -> `Hovering` -> (`Activated` -> `Idle`). `Activated` is
//! passed through within the frame that completes the episode.

use tracing::debug;

// ── Phase / state ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwellPhase {
    /// No sustained hit. Progress is zero.
    Idle,
    /// Hit continuously since `episode_start_ms`.
    Hovering,
    /// Episode completed this frame; re-enters `Idle` before returning.
    Activated,
}

impl DwellPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Hovering => "hovering",
            Self::Activated => "activated",
        }
    }
}

/// Inspectable dwell state of one target.
#[derive(Debug, Clone, PartialEq)]
pub struct DwellState {
    pub phase: DwellPhase,
    /// Set on Idle -> Hovering, cleared on every return to Idle.
    pub episode_start_ms: Option<f64>,
    /// Timestamp of the most recent hit frame in this episode.
    pub last_hit_ms: Option<f64>,
    /// Hits before this timestamp cannot start an episode.
    pub rearm_at_ms: Option<f64>,
    /// A tolerated miss arrived after `last_hit_ms`.
    pub missed_since_hit: bool,
    /// Last reported progress ratio in [0, 1].
    pub progress: f64,
}

impl Default for DwellState {
    fn default() -> Self {
        Self {
            phase: DwellPhase::Idle,
            episode_start_ms: None,
            last_hit_ms: None,
            rearm_at_ms: None,
            missed_since_hit: false,
            progress: 0.0,
        }
    }
}

// ── Policy ─────────────────────────────────────────────────

/// Dropout tolerance and re-arm cooldown. Zero for both reproduces the
/// strict reset / immediate re-arm behaviour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DwellPolicy {
    /// Misses closer than this to the last hit keep the episode alive.
    pub gap_tolerance_ms: f64,
    /// Minimum time after an activation before a new episode may start.
    pub reactivation_cooldown_ms: f64,
}

impl Default for DwellPolicy {
    fn default() -> Self {
        Self {
            gap_tolerance_ms: 0.0,
            reactivation_cooldown_ms: 0.0,
        }
    }
}

// ── Step output ────────────────────────────────────────────

/// What one frame produced for one target.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DwellStep {
    /// Progress to report this frame, if any.
    pub progress: Option<f64>,
    /// Set when the episode completed; holds the dwell duration in ms.
    pub activated: Option<f64>,
    /// Set when a hovering episode was reset before completion.
    pub cancelled: bool,
}

impl DwellStep {
    fn none() -> Self {
        Self::default()
    }

    fn progress(ratio: f64) -> Self {
        Self {
            progress: Some(ratio),
            ..Self::default()
        }
    }
}

// ── Tracker ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DwellTracker {
    required_ms: f64,
    policy: DwellPolicy,
    state: DwellState,
}

impl DwellTracker {
    /// `required_ms` must be positive; the engine validates it on
    /// registration.
    pub fn new(required_ms: f64, policy: DwellPolicy) -> Self {
        Self {
            required_ms,
            policy,
            state: DwellState::default(),
        }
    }

    pub fn state(&self) -> &DwellState {
        &self.state
    }

    pub fn phase(&self) -> DwellPhase {
        self.state.phase
    }

    pub fn progress(&self) -> f64 {
        self.state.progress
    }

    pub fn required_ms(&self) -> f64 {
        self.required_ms
    }

    pub fn set_required_ms(&mut self, required_ms: f64) {
        self.required_ms = required_ms;
    }

    pub fn set_policy(&mut self, policy: DwellPolicy) {
        self.policy = policy;
    }

    /// Feed one frame's hit verdict at `now_ms`. Non-finite timestamps are
    /// ignored.
    pub fn update(&mut self, hit: bool, now_ms: f64) -> DwellStep {
        if !now_ms.is_finite() {
            return DwellStep::none();
        }
        match self.state.phase {
            DwellPhase::Idle | DwellPhase::Activated => {
                self.state.phase = DwellPhase::Idle;
                if !hit {
                    return DwellStep::none();
                }
                if let Some(rearm_at) = self.state.rearm_at_ms {
                    if now_ms < rearm_at {
                        return DwellStep::none();
                    }
                    self.state.rearm_at_ms = None;
                }
                self.start_episode(now_ms);
                self.advance(now_ms)
            }
            DwellPhase::Hovering if hit => {
                let gap_ms = self.gap_since_last_hit(now_ms);
                if self.state.missed_since_hit && gap_ms >= self.policy.gap_tolerance_ms {
                    // The hand was gone longer than tolerated between frames
                    debug!(
                        "Dwell episode restarted after {:.0}ms absence at progress {:.2}",
                        gap_ms, self.state.progress
                    );
                    self.to_idle();
                    self.start_episode(now_ms);
                    let mut step = self.advance(now_ms);
                    step.cancelled = true;
                    return step;
                }
                self.state.missed_since_hit = false;
                self.state.last_hit_ms = Some(now_ms);
                self.advance(now_ms)
            }
            DwellPhase::Hovering => {
                let gap_ms = self.gap_since_last_hit(now_ms);
                if self.policy.gap_tolerance_ms > 0.0
                    && gap_ms >= 0.0
                    && gap_ms < self.policy.gap_tolerance_ms
                {
                    self.state.missed_since_hit = true;
                    return DwellStep::none();
                }
                debug!(
                    "Dwell episode reset after {:.0}ms gap at progress {:.2}",
                    gap_ms, self.state.progress
                );
                self.to_idle();
                DwellStep {
                    progress: Some(0.0),
                    activated: None,
                    cancelled: true,
                }
            }
        }
    }

    /// Drop any episode in progress without reporting it.
    pub fn reset(&mut self) {
        self.state = DwellState::default();
    }

    fn start_episode(&mut self, now_ms: f64) {
        self.state.phase = DwellPhase::Hovering;
        self.state.episode_start_ms = Some(now_ms);
        self.state.last_hit_ms = Some(now_ms);
        self.state.missed_since_hit = false;
        self.state.progress = 0.0;
        debug!("Dwell episode started at {:.0}ms", now_ms);
    }

    fn gap_since_last_hit(&self, now_ms: f64) -> f64 {
        now_ms - self.state.last_hit_ms.unwrap_or(now_ms)
    }

    fn advance(&mut self, now_ms: f64) -> DwellStep {
        let start = self.state.episode_start_ms.unwrap_or(now_ms);
        let elapsed_ms = (now_ms - start).max(0.0);
        let ratio = (elapsed_ms / self.required_ms).min(1.0).max(self.state.progress);

        if elapsed_ms >= self.required_ms {
            self.state.phase = DwellPhase::Activated;
            self.state.progress = 1.0;
            debug!("Dwell episode completed after {:.0}ms", elapsed_ms);

            self.to_idle();
            if self.policy.reactivation_cooldown_ms > 0.0 {
                self.state.rearm_at_ms = Some(now_ms + self.policy.reactivation_cooldown_ms);
            }
            return DwellStep {
                progress: Some(1.0),
                activated: Some(elapsed_ms),
                cancelled: false,
            };
        }

        self.state.progress = ratio;
        DwellStep::progress(ratio)
    }

    fn to_idle(&mut self) {
        self.state.phase = DwellPhase::Idle;
        self.state.episode_start_ms = None;
        self.state.last_hit_ms = None;
        self.state.missed_since_hit = false;
        self.state.progress = 0.0;
    }
}
