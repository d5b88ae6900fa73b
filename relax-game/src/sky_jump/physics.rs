//! One frame of the climb: movement, landing, pickups, camera and cleanup.
use super::difficulty::FramePhysics;
use super::tuning::SkyJumpTuning;
use super::world::{Platform, PlatformKind, World, row_gap};
use crate::constants::{
    CAMERA_THRESHOLD_RATIO, COLLECTIBLE_EVICT_MARGIN, EMPTY_WORLD_ROW_RATIO,
    FALL_OUT_MARGIN, FALLBACK_FRAME_SECS, HAPTIC_COIN_MS, HAPTIC_DEATH_MS, HAPTIC_FRAGILE_MS,
    HAPTIC_SHIELD_CONSUMED_MS, HAPTIC_SHIELD_PICKUP_MS, HAPTIC_SPRING_MS, MAX_FRAME_SECS,
    PLATFORM_EVICT_MARGIN, PLAYER_FOOT_INSET, SPAWN_TRIGGER_Y, STEPS_PER_SECOND,
};
use crate::seed::DailyRng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Held directions for this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
}

impl InputState {
    pub const NONE: Self = Self {
        left: false,
        right: false,
    };
    pub const LEFT: Self = Self {
        left: true,
        right: false,
    };
    pub const RIGHT: Self = Self {
        left: false,
        right: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    FellOut,
    Spike,
}

/// Something noteworthy that happened during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrameEvent {
    Bounce { kind: PlatformKind },
    FragileBroken,
    CoinCollected { x: f64, y: f64, coins: u32 },
    ShieldCollected,
    ShieldConsumed,
    Died { cause: DeathCause },
}

impl FrameEvent {
    /// Vibration pulse a device should play for this event.
    #[must_use]
    pub const fn haptic_ms(&self) -> Option<u32> {
        match self {
            Self::Bounce {
                kind: PlatformKind::Spring,
            } => Some(HAPTIC_SPRING_MS),
            Self::FragileBroken => Some(HAPTIC_FRAGILE_MS),
            Self::CoinCollected { .. } => Some(HAPTIC_COIN_MS),
            Self::ShieldCollected => Some(HAPTIC_SHIELD_PICKUP_MS),
            Self::ShieldConsumed => Some(HAPTIC_SHIELD_CONSUMED_MS),
            Self::Died { .. } => Some(HAPTIC_DEATH_MS),
            Self::Bounce { .. } => None,
        }
    }
}

pub type FrameEvents = SmallVec<[FrameEvent; 4]>;

/// Clamp a raw frame delta in seconds: invalid deltas fall back to 1/60 s,
/// long frames are capped at 1/30 s.
#[must_use]
pub fn clamp_frame_secs(dt_secs: f64) -> f64 {
    if !dt_secs.is_finite() || dt_secs <= 0.0 {
        FALLBACK_FRAME_SECS
    } else {
        dt_secs.min(MAX_FRAME_SECS)
    }
}

/// Circle vs axis-aligned rectangle overlap, edges inclusive.
#[must_use]
pub fn circle_rect_intersect(cx: f64, cy: f64, r: f64, rx: f64, ry: f64, rw: f64, rh: f64) -> bool {
    let dx = (cx - (rx + rw / 2.0)).abs();
    let dy = (cy - (ry + rh / 2.0)).abs();
    if dx > rw / 2.0 + r || dy > rh / 2.0 + r {
        return false;
    }
    if dx <= rw / 2.0 || dy <= rh / 2.0 {
        return true;
    }
    let corner = (dx - rw / 2.0).powi(2) + (dy - rh / 2.0).powi(2);
    corner <= r * r
}

/// Index of the platform whose top edge the feet cross this frame.
/// The smallest overshoot past the top edge wins.
fn landing_platform(
    platforms: &VecDeque<Platform>,
    left: f64,
    right: f64,
    bottom_prev: f64,
    bottom_target: f64,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, p) in platforms.iter().enumerate() {
        if !p.is_solid() {
            continue;
        }
        let top = p.y;
        if bottom_prev > top || bottom_target < top {
            continue;
        }
        if right < p.x || left > p.x + p.w {
            continue;
        }
        let cross = bottom_target - top;
        if best.is_none_or(|(_, min)| cross < min) {
            best = Some((idx, cross));
        }
    }
    best.map(|(idx, _)| idx)
}

impl World {
    /// Score right now: floored altitude plus the coin bonus.
    #[must_use]
    pub fn score(&self) -> u64 {
        crate::result::climb_score(self.scroll_distance, self.coins_collected)
    }

    /// Advance by `step` frame units (1.0 = one 60 Hz frame).
    ///
    /// Returns the events of the frame. A `Died` event is always last and
    /// nothing is moved after it.
    pub fn advance(
        &mut self,
        step: f64,
        input: InputState,
        tuning: &SkyJumpTuning,
        rng: &mut DailyRng,
    ) -> FrameEvents {
        let mut events = FrameEvents::new();
        let physics = self.difficulty().physics(tuning);

        self.move_horizontally(step, input, &physics);
        if let Some(cause) = self.move_vertically(step, &physics, &mut events) {
            events.push(FrameEvent::Died { cause });
            return events;
        }
        self.collect_pickups(&mut events);
        self.follow_camera();
        self.evict_offscreen();
        self.spawn_if_needed(tuning, rng);

        if self.player.y > self.viewport.height + FALL_OUT_MARGIN {
            events.push(FrameEvent::Died {
                cause: DeathCause::FellOut,
            });
        }
        events
    }

    fn move_horizontally(&mut self, step: f64, input: InputState, physics: &FramePhysics) {
        let width = self.viewport.width;
        let player = &mut self.player;
        player.vx = match (input.left, input.right) {
            (true, false) => -physics.move_speed,
            (false, true) => physics.move_speed,
            _ => player.vx * physics.friction.powf(step),
        };
        player.x += player.vx * step;

        if player.x < -player.w / 2.0 {
            player.x = width + player.w / 2.0;
        }
        if player.x > width + player.w / 2.0 {
            player.x = -player.w / 2.0;
        }
    }

    /// Gravity and landing. Returns a death cause when a bare spike is hit.
    fn move_vertically(
        &mut self,
        step: f64,
        physics: &FramePhysics,
        events: &mut FrameEvents,
    ) -> Option<DeathCause> {
        let bottom_prev = self.player.bottom();
        let accel = if self.player.vy < 0.0 {
            physics.gravity * physics.rise_multiplier
        } else {
            physics.gravity * physics.fall_multiplier
        };
        self.player.vy = (self.player.vy + accel * step).min(physics.max_fall);
        let y_target = self.player.y + self.player.vy * step;

        if self.player.vy <= 0.0 {
            self.player.y = y_target;
            return None;
        }

        let left = self.player.x + PLAYER_FOOT_INSET;
        let right = self.player.x + self.player.w - PLAYER_FOOT_INSET;
        let bottom_target = y_target + self.player.h;
        let hit = landing_platform(
            &self.platforms,
            left,
            right,
            bottom_prev,
            bottom_target,
        );
        let Some(idx) = hit else {
            self.player.y = y_target;
            return None;
        };
        let Some(platform) = self.platforms.get_mut(idx) else {
            self.player.y = y_target;
            return None;
        };

        self.player.y = platform.y - self.player.h;
        match platform.kind {
            PlatformKind::Spike if self.shield_held => {
                self.shield_held = false;
                self.player.vy = physics.jump_velocity;
                events.push(FrameEvent::ShieldConsumed);
                log::debug!("shield absorbed a spike at altitude {:.0}", self.scroll_distance);
            }
            PlatformKind::Spike => {
                log::debug!("spike hit at altitude {:.0}", self.scroll_distance);
                return Some(DeathCause::Spike);
            }
            PlatformKind::Fragile => {
                platform.broken = true;
                self.player.vy = physics.jump_velocity;
                events.push(FrameEvent::FragileBroken);
            }
            PlatformKind::Spring => {
                self.player.vy = physics.spring_velocity;
                events.push(FrameEvent::Bounce {
                    kind: PlatformKind::Spring,
                });
            }
            PlatformKind::Normal => {
                self.player.vy = physics.jump_velocity;
                events.push(FrameEvent::Bounce {
                    kind: PlatformKind::Normal,
                });
            }
        }
        None
    }

    fn collect_pickups(&mut self, events: &mut FrameEvents) {
        let p = &self.player;
        let (px, py, pw, ph) = (p.x, p.y, p.w, p.h);

        for coin in &mut self.coins {
            if !coin.taken && circle_rect_intersect(coin.x, coin.y, coin.r, px, py, pw, ph) {
                coin.taken = true;
                self.coins_collected = self.coins_collected.saturating_add(1);
                events.push(FrameEvent::CoinCollected {
                    x: coin.x,
                    y: coin.y,
                    coins: self.coins_collected,
                });
            }
        }
        for shield in &mut self.shields {
            if !shield.taken && circle_rect_intersect(shield.x, shield.y, shield.r, px, py, pw, ph)
            {
                shield.taken = true;
                self.shield_held = true;
                events.push(FrameEvent::ShieldCollected);
            }
        }
    }

    fn follow_camera(&mut self) {
        let threshold = self.viewport.height * CAMERA_THRESHOLD_RATIO;
        if self.player.y >= threshold {
            return;
        }
        let dy = threshold - self.player.y;
        self.player.y = threshold;
        for p in &mut self.platforms {
            p.y += dy;
        }
        for c in self.coins.iter_mut().chain(self.shields.iter_mut()) {
            c.y += dy;
        }
        self.scroll_distance += dy;
    }

    fn evict_offscreen(&mut self) {
        let h = self.viewport.height;
        while self
            .platforms
            .front()
            .is_some_and(|p| p.y > h + PLATFORM_EVICT_MARGIN)
        {
            self.platforms.pop_front();
        }
        for queue in [&mut self.coins, &mut self.shields] {
            while queue
                .front()
                .is_some_and(|c| c.y > h + COLLECTIBLE_EVICT_MARGIN)
            {
                queue.pop_front();
            }
        }
    }

    fn spawn_if_needed(&mut self, tuning: &SkyJumpTuning, rng: &mut DailyRng) {
        let diff = self.difficulty();
        match self.topmost_platform_y() {
            None => {
                let y = self.viewport.height * EMPTY_WORLD_ROW_RATIO;
                self.spawn_platform_row(y, tuning, &diff, rng);
            }
            Some(top) if top > SPAWN_TRIGGER_Y => {
                let y = top - row_gap(rng, tuning);
                self.spawn_platform_row(y, tuning, &diff, rng);
            }
            Some(_) => {}
        }
    }
}

/// Frame units for a clamped delta.
#[must_use]
pub fn frame_step(dt_secs: f64) -> f64 {
    clamp_frame_secs(dt_secs) * STEPS_PER_SECOND
}
