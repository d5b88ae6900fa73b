//! Entities of the climb and the row generator.
use super::difficulty::{Difficulty, PlatformThresholds, difficulty_at, progress_for_scroll};
use super::tuning::{SkyJumpTuning, Viewport};
use crate::constants::{
    COIN_LIFT, COIN_RADIUS, HELPER_MIN_SEPARATION, HELPER_NUDGE_RATIO, HELPER_WIDTH_RATIO,
    INITIAL_ROW_OFFSET, INITIAL_ROWS, PLATFORM_BASE_WIDTH, PLATFORM_HEIGHT, PLATFORM_SIDE_PAD,
    PLATFORM_WIDTH_SPAN, PLAYER_HEIGHT, PLAYER_START_OFFSET, PLAYER_WIDTH, ROW_GAP_BASE,
    ROW_GAP_SPAN, SHIELD_EDGE_PAD, SHIELD_LIFT, SHIELD_RADIUS, SHIELD_SHIFT, START_PLATFORM_OFFSET,
    START_PLATFORM_WIDTH,
};
use crate::seed::DailyRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Normal,
    Fragile,
    Spike,
    Spring,
}

impl PlatformKind {
    /// Pick a kind from a uniform draw using cumulative thresholds.
    #[must_use]
    pub fn from_draw(r: f64, thresholds: &PlatformThresholds) -> Self {
        if r < thresholds.fragile {
            Self::Fragile
        } else if r < thresholds.hazard {
            Self::Spike
        } else if r < thresholds.spring {
            Self::Spring
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub kind: PlatformKind,
    #[serde(default)]
    pub broken: bool,
}

impl Platform {
    #[must_use]
    pub const fn new(x: f64, y: f64, w: f64, kind: PlatformKind) -> Self {
        Self {
            x,
            y,
            w,
            h: PLATFORM_HEIGHT,
            kind,
            broken: false,
        }
    }

    /// Broken fragile platforms no longer collide.
    #[must_use]
    pub fn is_solid(&self) -> bool {
        !(self.kind == PlatformKind::Fragile && self.broken)
    }
}

/// A round pickup. Taken pickups stay in their queue until evicted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    pub x: f64,
    pub y: f64,
    pub r: f64,
    #[serde(default)]
    pub taken: bool,
}

impl Collectible {
    #[must_use]
    pub const fn new(x: f64, y: f64, r: f64) -> Self {
        Self {
            x,
            y,
            r,
            taken: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub vx: f64,
    pub vy: f64,
}

impl Player {
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }
}

/// Everything that moves in one run, oldest entities at the front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub viewport: Viewport,
    pub platforms: VecDeque<Platform>,
    pub coins: VecDeque<Collectible>,
    pub shields: VecDeque<Collectible>,
    pub player: Player,
    pub scroll_distance: f64,
    pub coins_collected: u32,
    pub shield_held: bool,
}

impl World {
    /// Start platform, player above it and the initial rows.
    #[must_use]
    pub fn setup(viewport: Viewport, tuning: &SkyJumpTuning, rng: &mut DailyRng) -> Self {
        let Viewport { width, height } = viewport;
        let start_w = START_PLATFORM_WIDTH * tuning.width_scale;
        let start = Platform::new(
            width / 2.0 - start_w / 2.0,
            height - START_PLATFORM_OFFSET,
            start_w,
            PlatformKind::Normal,
        );
        let ps = tuning.player_scale;
        let player = Player {
            x: width / 2.0 - PLAYER_WIDTH / 2.0 * ps,
            y: height - PLAYER_START_OFFSET * ps,
            w: PLAYER_WIDTH * ps,
            h: PLAYER_HEIGHT * ps,
            vx: 0.0,
            vy: 0.0,
        };
        let mut world = Self {
            viewport,
            platforms: VecDeque::from([start]),
            coins: VecDeque::new(),
            shields: VecDeque::new(),
            player,
            scroll_distance: 0.0,
            coins_collected: 0,
            shield_held: false,
        };

        let diff = world.difficulty();
        let mut y = height - INITIAL_ROW_OFFSET;
        for _ in 0..INITIAL_ROWS {
            y -= row_gap(rng, tuning);
            world.spawn_platform_row(y, tuning, &diff, rng);
        }
        world
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        difficulty_at(progress_for_scroll(self.scroll_distance))
    }

    /// Append one row at height `y`: a main platform, maybe a helper, maybe pickups.
    pub fn spawn_platform_row(
        &mut self,
        y: f64,
        tuning: &SkyJumpTuning,
        diff: &Difficulty,
        rng: &mut DailyRng,
    ) {
        let width = self.viewport.width;
        let pad = PLATFORM_SIDE_PAD;
        let usable = (width - pad * 2.0).max(0.0);

        let base_w = PLATFORM_BASE_WIDTH + rng.next_f64() * PLATFORM_WIDTH_SPAN;
        let w = (base_w * tuning.width_scale).min(usable);
        let x = pad + rng.next_f64() * (usable - w);
        let kind = PlatformKind::from_draw(rng.next_f64(), &diff.thresholds(tuning));
        self.platforms.push_back(Platform::new(x, y, w, kind));

        if tuning.is_desktop && rng.next_f64() < tuning.helper_chance {
            let w2 = (w * HELPER_WIDTH_RATIO).min(usable);
            let mut x2 = pad + rng.next_f64() * (usable - w2);
            if (x2 - x).abs() < HELPER_MIN_SEPARATION.min(w) {
                let dir = if x2 < x { -1.0 } else { 1.0 };
                x2 = clamp_lenient(x2 + dir * w * HELPER_NUDGE_RATIO, pad, width - pad - w2);
            }
            self.platforms
                .push_back(Platform::new(x2, y, w2, PlatformKind::Normal));
        }

        if rng.next_f64() < tuning.coin_probability {
            self.coins
                .push_back(Collectible::new(x + w / 2.0, y - COIN_LIFT, COIN_RADIUS));
        }
        if rng.next_f64() < tuning.shield_probability {
            let sx = clamp_lenient(
                x + w / 2.0 + SHIELD_SHIFT,
                pad + SHIELD_EDGE_PAD,
                width - pad - SHIELD_EDGE_PAD,
            );
            self.shields
                .push_back(Collectible::new(sx, y - SHIELD_LIFT, SHIELD_RADIUS));
        }
    }

    /// Highest (smallest y) platform, if any remain.
    #[must_use]
    pub fn topmost_platform_y(&self) -> Option<f64> {
        self.platforms.iter().map(|p| p.y).reduce(f64::min)
    }
}

/// Vertical distance between two rows.
pub fn row_gap(rng: &mut DailyRng, tuning: &SkyJumpTuning) -> f64 {
    (ROW_GAP_BASE + rng.next_f64() * ROW_GAP_SPAN) * tuning.gap_scale
}

/// Clamp that tolerates `lo > hi` on very narrow viewports.
fn clamp_lenient(v: f64, lo: f64, hi: f64) -> f64 {
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}
