//! Dwell-based spatial interaction: landmark frames in, hover progress and
//! activation events out.
//!
//! Provides:
//! - `landmarks`: 21-point hand model and per-frame hand sets
//! - `mapper`: normalized → surface pixel mapping (mirror aware)
//! - `hit_test`: circle/rect regions and per-target hit policies
//! - `dwell`: per-target dwell state machine
//! - `engine`: target registry and per-frame orchestration
//! - `source`: landmark source boundary and frame driver

pub mod dwell;
pub mod engine;
pub mod landmarks;
pub mod mapper;
pub mod source;

pub use dwell::{DwellPhase, DwellPolicy, DwellState, DwellTracker};
pub use engine::{InteractionEngine, InteractionEvent, InteractionStats, TargetId, TargetSpec};
pub use hit_test::{HitPolicy, Shape};
pub use landmarks::{HandLandmark, HandLandmarkSet, Landmark, LandmarkFrame};
pub use mapper::{DisplayRect, Point, Surface};
pub use source::{drive, LandmarkSource, ScriptedSource, SourceOptions, SourceStatus, TimedFrame};
