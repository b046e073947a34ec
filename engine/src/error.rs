//! Typed errors for target registration, configuration and script loading.
//!
//! Frame processing has no error path: bad detections are filtered out
//! before they reach the engine.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InteractionError {
    /// Target geometry, dwell time or hit policy is unusable.
    #[error("invalid target {id:?}: {reason}")]
    InvalidTarget { id: String, reason: String },

    /// A target with this id is already registered.
    #[error("target {0:?} is already registered")]
    DuplicateTarget(String),

    /// Operation referenced an id that is not registered.
    #[error("unknown target {0:?}")]
    UnknownTarget(String),

    /// Configuration value out of range or unparseable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Replay script line could not be parsed.
    #[error("script line {line}: {reason}")]
    Script { line: usize, reason: String },
}

impl InteractionError {
    pub(crate) fn invalid_target(id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
