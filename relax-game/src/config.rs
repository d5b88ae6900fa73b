//! Serde-backed tuning for the timed games.
//!
//! Defaults mirror `constants`; JSON overrides are validated before use.
use crate::constants::{
    REACTION_CLICKED_DISPLAY_MS, REACTION_DELAY_MIN_MS, REACTION_DELAY_SPAN_MS,
    REACTION_FALSE_START_DISPLAY_MS, REACTION_LEAD_IN_MS, TARGET_HIT_RADIUS_PCT,
    TARGET_MARGIN_PCT, TARGET_SPAN_PCT,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when tuning invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum TuningError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("platform thresholds must be ordered: fragile {fragile:.2} <= hazard {hazard:.2} <= spring {spring:.2}")]
    ThresholdOrder { fragile: f64, hazard: f64, spring: f64 },
    #[error("invalid tuning json: {0}")]
    Json(String),
}

pub(crate) fn ensure_min(field: &'static str, value: f64, min: f64) -> Result<(), TuningError> {
    if value.is_finite() && value >= min {
        Ok(())
    } else {
        Err(TuningError::MinViolation { field, min, value })
    }
}

pub(crate) fn ensure_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), TuningError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(TuningError::RangeViolation {
            field,
            min,
            max,
            value,
        })
    }
}

pub(crate) fn parse_json<T: DeserializeOwned>(json: &str) -> Result<T, TuningError> {
    serde_json::from_str(json).map_err(|err| TuningError::Json(err.to_string()))
}

/// Timing of the reaction sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionConfig {
    pub delay_min_ms: f64,
    pub delay_span_ms: f64,
    pub lead_in_ms: f64,
    pub false_start_display_ms: f64,
    pub clicked_display_ms: f64,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            delay_min_ms: REACTION_DELAY_MIN_MS,
            delay_span_ms: REACTION_DELAY_SPAN_MS,
            lead_in_ms: REACTION_LEAD_IN_MS,
            false_start_display_ms: REACTION_FALSE_START_DISPLAY_MS,
            clicked_display_ms: REACTION_CLICKED_DISPLAY_MS,
        }
    }
}

impl ReactionConfig {
    /// Parse and validate a JSON override; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or violates tuning limits.
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let cfg: Self = parse_json(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    ///
    /// Returns an error if any duration is negative or non-finite.
    pub fn validate(&self) -> Result<(), TuningError> {
        ensure_min("delay_min_ms", self.delay_min_ms, 0.0)?;
        ensure_min("delay_span_ms", self.delay_span_ms, 0.0)?;
        ensure_min("lead_in_ms", self.lead_in_ms, 0.0)?;
        ensure_min("false_start_display_ms", self.false_start_display_ms, 0.0)?;
        ensure_min("clicked_display_ms", self.clicked_display_ms, 0.0)
    }
}

/// Placement and hit-testing of the target frenzy play area, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub margin_pct: f64,
    pub span_pct: f64,
    pub hit_radius_pct: f64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            margin_pct: TARGET_MARGIN_PCT,
            span_pct: TARGET_SPAN_PCT,
            hit_radius_pct: TARGET_HIT_RADIUS_PCT,
        }
    }
}

impl TargetConfig {
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or violates tuning limits.
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let cfg: Self = parse_json(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    ///
    /// Returns an error if the safe interior does not fit in the play area.
    pub fn validate(&self) -> Result<(), TuningError> {
        ensure_range("margin_pct", self.margin_pct, 0.0, 50.0)?;
        ensure_range("span_pct", self.span_pct, 0.0, 100.0 - 2.0 * self.margin_pct)?;
        ensure_range("hit_radius_pct", self.hit_radius_pct, 0.0, 50.0)
    }

    #[must_use]
    pub fn upper_bound(&self) -> f64 {
        100.0 - self.margin_pct
    }
}
