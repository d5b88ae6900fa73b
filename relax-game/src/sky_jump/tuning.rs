//! Per-device tuning for the climb.
use crate::config::{TuningError, ensure_min, ensure_range, parse_json};
use crate::constants::DESKTOP_MIN_WIDTH;
use serde::{Deserialize, Serialize};

/// Play area size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const FALLBACK: Self = Self {
        width: 320.0,
        height: 426.0,
    };

    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// # Errors
    ///
    /// Returns an error if either side is smaller than one pixel.
    pub fn validate(&self) -> Result<(), TuningError> {
        ensure_min("viewport.width", self.width, 1.0)?;
        ensure_min("viewport.height", self.height, 1.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Physics, spawn sizes and platform probabilities for one device profile.
///
/// The three platform thresholds are cumulative: a draw below
/// `fragile_threshold` is fragile, below `hazard_threshold` a spike, below
/// `spring_threshold` a spring, anything else normal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyJumpTuning {
    pub is_desktop: bool,
    pub gap_scale: f64,
    pub width_scale: f64,
    pub helper_chance: f64,
    pub player_scale: f64,
    pub fragile_threshold: f64,
    pub hazard_threshold: f64,
    pub spring_threshold: f64,
    pub coin_probability: f64,
    pub shield_probability: f64,
    pub move_speed: f64,
    pub gravity: f64,
    pub jump_velocity: f64,
    pub spring_velocity: f64,
    pub rise_multiplier: f64,
    pub fall_multiplier: f64,
    pub max_fall: f64,
    pub friction: f64,
}

impl SkyJumpTuning {
    #[must_use]
    pub const fn desktop() -> Self {
        Self {
            is_desktop: true,
            gap_scale: 1.0,
            width_scale: 1.2,
            helper_chance: 0.2,
            player_scale: 1.12,
            fragile_threshold: 0.10,
            hazard_threshold: 0.15,
            spring_threshold: 0.25,
            coin_probability: 0.35,
            shield_probability: 0.12,
            move_speed: 4.6,
            gravity: 0.2,
            jump_velocity: -8.0,
            spring_velocity: -12.8,
            rise_multiplier: 1.15,
            fall_multiplier: 1.65,
            max_fall: 13.5,
            friction: 0.9,
        }
    }

    #[must_use]
    pub const fn touch() -> Self {
        Self {
            is_desktop: false,
            gap_scale: 1.0,
            width_scale: 1.0,
            helper_chance: 0.0,
            player_scale: 1.0,
            fragile_threshold: 0.12,
            hazard_threshold: 0.18,
            spring_threshold: 0.24,
            coin_probability: 0.28,
            shield_probability: 0.08,
            move_speed: 3.25,
            gravity: 0.22,
            jump_velocity: -7.4,
            spring_velocity: -11.6,
            rise_multiplier: 1.1,
            fall_multiplier: 1.5,
            max_fall: 12.0,
            friction: 0.9,
        }
    }

    /// Desktop profile when a fine pointer is present and the play area is wide enough.
    #[must_use]
    pub fn for_viewport(width: f64, fine_pointer: bool) -> Self {
        if fine_pointer && width >= DESKTOP_MIN_WIDTH {
            Self::desktop()
        } else {
            Self::touch()
        }
    }

    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or violates tuning limits.
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Self = parse_json(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// # Errors
    ///
    /// Returns an error when a probability leaves `[0, 1]`, the platform
    /// thresholds are out of order, or a physics value has the wrong sign.
    pub fn validate(&self) -> Result<(), TuningError> {
        ensure_min("gap_scale", self.gap_scale, 0.1)?;
        ensure_min("width_scale", self.width_scale, 0.1)?;
        ensure_min("player_scale", self.player_scale, 0.1)?;
        for (field, value) in [
            ("helper_chance", self.helper_chance),
            ("fragile_threshold", self.fragile_threshold),
            ("hazard_threshold", self.hazard_threshold),
            ("spring_threshold", self.spring_threshold),
            ("coin_probability", self.coin_probability),
            ("shield_probability", self.shield_probability),
        ] {
            ensure_range(field, value, 0.0, 1.0)?;
        }
        if self.fragile_threshold > self.hazard_threshold
            || self.hazard_threshold > self.spring_threshold
        {
            return Err(TuningError::ThresholdOrder {
                fragile: self.fragile_threshold,
                hazard: self.hazard_threshold,
                spring: self.spring_threshold,
            });
        }
        ensure_min("move_speed", self.move_speed, 0.0)?;
        ensure_min("gravity", self.gravity, 0.001)?;
        ensure_range("jump_velocity", self.jump_velocity, -100.0, -0.001)?;
        ensure_range("spring_velocity", self.spring_velocity, -100.0, -0.001)?;
        ensure_min("rise_multiplier", self.rise_multiplier, 0.0)?;
        ensure_min("fall_multiplier", self.fall_multiplier, 0.0)?;
        ensure_min("max_fall", self.max_fall, 0.001)?;
        ensure_range("friction", self.friction, 0.0, 1.0)
    }
}

impl Default for SkyJumpTuning {
    fn default() -> Self {
        Self::touch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_selection_needs_pointer_and_width() {
        assert!(SkyJumpTuning::for_viewport(560.0, true).is_desktop);
        assert!(!SkyJumpTuning::for_viewport(519.0, true).is_desktop);
        assert!(!SkyJumpTuning::for_viewport(900.0, false).is_desktop);
    }

    #[test]
    fn builtin_profiles_validate() {
        assert!(SkyJumpTuning::desktop().validate().is_ok());
        assert!(SkyJumpTuning::touch().validate().is_ok());
    }

    #[test]
    fn unordered_thresholds_are_rejected() {
        let tuning = SkyJumpTuning {
            hazard_threshold: 0.05,
            ..SkyJumpTuning::desktop()
        };
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::ThresholdOrder { .. })
        ));
    }

    #[test]
    fn json_round_trips_through_validation() {
        let json = serde_json::to_string(&SkyJumpTuning::desktop()).unwrap();
        assert_eq!(
            SkyJumpTuning::from_json(&json).unwrap(),
            SkyJumpTuning::desktop()
        );
        let bad = json.replace("\"gravity\":0.2", "\"gravity\":-1.0");
        assert!(matches!(
            SkyJumpTuning::from_json(&bad),
            Err(TuningError::MinViolation { field: "gravity", .. })
        ));
    }

    #[test]
    fn tiny_viewport_is_rejected() {
        assert!(Viewport::new(0.0, 400.0).validate().is_err());
        assert!(Viewport::default().validate().is_ok());
    }
}
