//! Dwell-based hover-to-activate interaction engine.
//!
//! Hand landmarks from an external pose estimator are mapped onto a drawing
//! surface, hit-tested against registered targets and fed through per-target
//! dwell timers. Holding a hand over a target long enough activates it.

pub mod config;
pub mod error;
pub mod interaction;
pub mod replay;
pub mod sexp;

pub use config::EngineConfig;
pub use error::InteractionError;
pub use interaction::{
    DwellPolicy, HitPolicy, InteractionEngine, InteractionEvent, LandmarkFrame, Shape, Surface,
    TargetId, TargetSpec,
};
