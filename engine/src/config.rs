//! Engine configuration, loadable from an s-expression plist.
//!
//! ```text
//! (:gap-tolerance-ms 0 :reactivation-cooldown-ms 0 :default-dwell-ms 2500
//!  :max-hands 2 :model-complexity 1
//!  :min-detection-confidence 0.5 :min-tracking-confidence 0.5)
//! ```
//!
//! Missing keys keep their defaults, which reproduce the strict-reset,
//! immediate re-arm behaviour.

use std::path::Path;

use tracing::info;

use crate::error::InteractionError;
use crate::interaction::dwell::DwellPolicy;
use crate::interaction::source::SourceOptions;
use crate::sexp::{get_float, get_int, get_value};

/// Required dwell used for targets that do not name one.
pub const DEFAULT_DWELL_MS: f64 = 2500.0;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub dwell: DwellPolicy,
    pub default_dwell_ms: f64,
    pub source: SourceOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dwell: DwellPolicy::default(),
            default_dwell_ms: DEFAULT_DWELL_MS,
            source: SourceOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a config plist. Unknown keys are ignored.
    pub fn from_sexp(raw: &str) -> Result<Self, InteractionError> {
        let value = lexpr::from_str(raw)
            .map_err(|e| InteractionError::InvalidConfig(format!("malformed s-expression: {e}")))?;

        let mut config = Self::default();

        if let Some(ms) = read_ms(&value, "gap-tolerance-ms")? {
            config.dwell.gap_tolerance_ms = ms;
        }
        if let Some(ms) = read_ms(&value, "reactivation-cooldown-ms")? {
            config.dwell.reactivation_cooldown_ms = ms;
        }
        if let Some(ms) = read_ms(&value, "default-dwell-ms")? {
            if ms == 0.0 {
                return Err(InteractionError::InvalidConfig(
                    ":default-dwell-ms must be positive".to_string(),
                ));
            }
            config.default_dwell_ms = ms;
        }

        if get_value(&value, "max-hands").is_some() {
            match get_int(&value, "max-hands") {
                Some(n) if n >= 1 => config.source.max_num_hands = n as usize,
                _ => {
                    return Err(InteractionError::InvalidConfig(
                        ":max-hands must be a positive integer".to_string(),
                    ))
                }
            }
        }
        if get_value(&value, "model-complexity").is_some() {
            match get_int(&value, "model-complexity") {
                Some(n) if (0..=2).contains(&n) => config.source.model_complexity = n as u8,
                _ => {
                    return Err(InteractionError::InvalidConfig(
                        ":model-complexity must be 0, 1 or 2".to_string(),
                    ))
                }
            }
        }
        if let Some(c) = read_confidence(&value, "min-detection-confidence")? {
            config.source.min_detection_confidence = c;
        }
        if let Some(c) = read_confidence(&value, "min-tracking-confidence")? {
            config.source.min_tracking_confidence = c;
        }

        Ok(config)
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, InteractionError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            InteractionError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_sexp(&raw)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Active configuration as an s-expression.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:gap-tolerance-ms {:.0} :reactivation-cooldown-ms {:.0} :default-dwell-ms {:.0} :source {})",
            self.dwell.gap_tolerance_ms,
            self.dwell.reactivation_cooldown_ms,
            self.default_dwell_ms,
            self.source.config_sexp(),
        )
    }
}

fn read_ms(value: &lexpr::Value, key: &str) -> Result<Option<f64>, InteractionError> {
    if get_value(value, key).is_none() {
        return Ok(None);
    }
    match get_float(value, key) {
        Some(ms) if ms.is_finite() && ms >= 0.0 => Ok(Some(ms)),
        _ => Err(InteractionError::InvalidConfig(format!(
            ":{key} must be a non-negative number of milliseconds"
        ))),
    }
}

fn read_confidence(value: &lexpr::Value, key: &str) -> Result<Option<f32>, InteractionError> {
    if get_value(value, key).is_none() {
        return Ok(None);
    }
    match get_float(value, key) {
        Some(c) if (0.0..=1.0).contains(&c) => Ok(Some(c as f32)),
        _ => Err(InteractionError::InvalidConfig(format!(
            ":{key} must be between 0.0 and 1.0"
        ))),
    }
}
