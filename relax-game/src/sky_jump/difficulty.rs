//! Continuous difficulty curve driven by climbed altitude.
use super::tuning::SkyJumpTuning;
use crate::constants::DIFFICULTY_FULL_SCROLL;
use serde::{Deserialize, Serialize};

/// Multipliers applied to the base tuning at a given progress ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    pub progress: f64,
    pub horizontal: f64,
    pub gravity: f64,
    pub jump: f64,
    pub spring: f64,
    pub rise: f64,
    pub fall: f64,
    pub hazard_band: f64,
}

/// Progress ratio in `[0, 1]` for a cumulative scroll distance.
#[must_use]
pub fn progress_for_scroll(scroll_distance: f64) -> f64 {
    if scroll_distance.is_finite() {
        (scroll_distance / DIFFICULTY_FULL_SCROLL).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// Multipliers at `progress`, which is clamped into `[0, 1]`.
#[must_use]
pub fn difficulty_at(progress: f64) -> Difficulty {
    let p = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };
    Difficulty {
        progress: p,
        horizontal: 1.0 + p * 1.5,
        gravity: 1.0 + p * 0.5,
        jump: 1.0 + p * 0.35,
        spring: 1.0 + p * 0.35,
        rise: 1.0 + p * 0.35,
        fall: 1.0 + p * 0.6,
        hazard_band: 1.0 + p * 0.5,
    }
}

/// Physics constants for one frame after scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePhysics {
    pub move_speed: f64,
    pub gravity: f64,
    pub jump_velocity: f64,
    pub spring_velocity: f64,
    pub rise_multiplier: f64,
    pub fall_multiplier: f64,
    pub max_fall: f64,
    pub friction: f64,
}

/// Cumulative platform-kind thresholds after scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformThresholds {
    pub fragile: f64,
    pub hazard: f64,
    pub spring: f64,
}

impl Difficulty {
    #[must_use]
    pub fn physics(&self, tuning: &SkyJumpTuning) -> FramePhysics {
        FramePhysics {
            move_speed: tuning.move_speed * self.horizontal,
            gravity: tuning.gravity * self.gravity,
            jump_velocity: tuning.jump_velocity * self.jump,
            spring_velocity: tuning.spring_velocity * self.spring,
            rise_multiplier: tuning.rise_multiplier * self.rise,
            fall_multiplier: tuning.fall_multiplier * self.fall,
            max_fall: tuning.max_fall * self.fall,
            friction: tuning.friction,
        }
    }

    /// Widen the spike band; the spring band keeps its width and shifts up.
    #[must_use]
    pub fn thresholds(&self, tuning: &SkyJumpTuning) -> PlatformThresholds {
        let fragile = tuning.fragile_threshold;
        let band = (tuning.hazard_threshold - fragile) * self.hazard_band;
        let hazard = (fragile + band).min(1.0);
        let spring = (hazard + (tuning.spring_threshold - tuning.hazard_threshold)).min(1.0);
        PlatformThresholds {
            fragile,
            hazard,
            spring,
        }
    }
}
