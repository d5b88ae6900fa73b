//! Sky Jump: an endless vertical climb driven one animation frame at a time.
//!
//! The host calls [`SkyJump::step`] once per frame with the elapsed time and
//! the held directions. The session owns its world, its generator and its
//! run timeline; nothing is shared with other sessions.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::TuningError;
use crate::constants::COIN_SCORE;
use crate::numbers::floor_f64_to_u64;
use crate::result::ClimbRunResult;
use crate::seed::{DailyKey, DailyRng};

mod difficulty;
mod physics;
mod tuning;
mod world;

pub use difficulty::{
    Difficulty, FramePhysics, PlatformThresholds, difficulty_at, progress_for_scroll,
};
pub use physics::{
    DeathCause, FrameEvent, FrameEvents, InputState, circle_rect_intersect, clamp_frame_secs,
    frame_step,
};
pub use tuning::{SkyJumpTuning, Viewport};
pub use world::{Collectible, Platform, PlatformKind, Player, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkyState {
    Idle,
    Running,
    Paused,
    Finished,
}

/// Noteworthy moments of a run, for replays and history detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimelineEntry {
    Coin {
        #[serde(rename = "t")]
        elapsed_ms: u64,
        x: f64,
        y: f64,
        #[serde(rename = "coinsCollected")]
        coins_collected: u32,
        #[serde(rename = "scoreAdded")]
        score_added: u64,
        #[serde(rename = "totalScore")]
        total_score: u64,
    },
    End {
        #[serde(rename = "t")]
        elapsed_ms: u64,
        #[serde(rename = "finalScore")]
        final_score: u64,
        #[serde(rename = "coinsCollected")]
        coins_collected: u32,
    },
}

/// What one frame produced, for the HUD and the device.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub state: SkyState,
    pub score: u64,
    pub coins: u32,
    pub shield_held: bool,
    pub events: FrameEvents,
    pub haptics: SmallVec<[u32; 4]>,
    /// Set on the frame the run ends.
    pub death: Option<DeathCause>,
}

#[derive(Debug, Clone)]
pub struct SkyJump {
    day: DailyKey,
    tuning: SkyJumpTuning,
    rng: DailyRng,
    world: World,
    state: SkyState,
    elapsed_ms: f64,
    frames: u64,
    timeline: Vec<TimelineEntry>,
    final_score: Option<(u64, u32)>,
}

impl SkyJump {
    /// Build an idle session with a preview world.
    ///
    /// # Errors
    ///
    /// Returns an error if the viewport or the tuning is invalid.
    pub fn new(
        day: DailyKey,
        locale: &str,
        viewport: Viewport,
        tuning: SkyJumpTuning,
    ) -> Result<Self, TuningError> {
        viewport.validate()?;
        tuning.validate()?;
        let mut rng = DailyRng::for_day(day, locale);
        let world = World::setup(viewport, &tuning, &mut rng);
        Ok(Self {
            day,
            tuning,
            rng,
            world,
            state: SkyState::Idle,
            elapsed_ms: 0.0,
            frames: 0,
            timeline: Vec::new(),
            final_score: None,
        })
    }

    /// Fresh world and a running state. The generator keeps its position,
    /// so each run of a session climbs a different tower.
    pub fn start(&mut self) {
        self.world = World::setup(self.world.viewport, &self.tuning, &mut self.rng);
        self.state = SkyState::Running;
        self.elapsed_ms = 0.0;
        self.frames = 0;
        self.timeline.clear();
        self.final_score = None;
    }

    pub fn restart(&mut self) {
        self.start();
    }

    pub fn pause(&mut self) {
        if self.state == SkyState::Running {
            self.state = SkyState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == SkyState::Paused {
            self.state = SkyState::Running;
        }
    }

    /// Abandon the current run without a result. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if matches!(self.state, SkyState::Running | SkyState::Paused) {
            self.state = SkyState::Idle;
        }
    }

    /// Resize the play area. The live world uses the new bounds from the
    /// next step on; platforms already spawned keep their positions.
    ///
    /// # Errors
    ///
    /// Returns an error if the viewport is invalid.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), TuningError> {
        viewport.validate()?;
        self.world.viewport = viewport;
        Ok(())
    }

    /// Run one frame. Outside `running` nothing moves and no events fire.
    pub fn step(&mut self, dt_secs: f64, input: InputState) -> StepReport {
        if self.state != SkyState::Running {
            return self.report(FrameEvents::new(), None);
        }

        if dt_secs.is_finite() && dt_secs > 0.0 {
            self.elapsed_ms += dt_secs * 1_000.0;
        }
        self.frames = self.frames.saturating_add(1);
        let step = frame_step(dt_secs);
        let events = self
            .world
            .advance(step, input, &self.tuning, &mut self.rng);

        let mut death = None;
        for event in &events {
            match *event {
                FrameEvent::CoinCollected { x, y, coins } => {
                    self.timeline.push(TimelineEntry::Coin {
                        elapsed_ms: self.elapsed_whole_ms(),
                        x,
                        y,
                        coins_collected: coins,
                        score_added: COIN_SCORE,
                        total_score: self.world.score(),
                    });
                }
                FrameEvent::Died { cause } => death = Some(cause),
                _ => {}
            }
        }
        if let Some(cause) = death {
            self.finish(cause);
        }
        self.report(events, death)
    }

    fn finish(&mut self, cause: DeathCause) {
        let score = self.world.score();
        let coins = self.world.coins_collected;
        self.timeline.push(TimelineEntry::End {
            elapsed_ms: self.elapsed_whole_ms(),
            final_score: score,
            coins_collected: coins,
        });
        self.final_score = Some((score, coins));
        self.state = SkyState::Finished;
        log::debug!(
            "sky jump run over ({cause:?}) after {} frames: score {score}, {coins} coins",
            self.frames
        );
    }

    fn report(&self, events: FrameEvents, death: Option<DeathCause>) -> StepReport {
        let haptics = events.iter().filter_map(FrameEvent::haptic_ms).collect();
        StepReport {
            state: self.state,
            score: self.score(),
            coins: self.coins(),
            shield_held: self.world.shield_held,
            events,
            haptics,
            death,
        }
    }

    fn elapsed_whole_ms(&self) -> u64 {
        floor_f64_to_u64(self.elapsed_ms)
    }

    #[must_use]
    pub const fn state(&self) -> SkyState {
        self.state
    }

    #[must_use]
    pub const fn day(&self) -> DailyKey {
        self.day
    }

    #[must_use]
    pub const fn tuning(&self) -> &SkyJumpTuning {
        &self.tuning
    }

    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access for hosts that script a scene.
    pub const fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[must_use]
    pub fn score(&self) -> u64 {
        self.final_score
            .map_or_else(|| self.world.score(), |(score, _)| score)
    }

    #[must_use]
    pub fn coins(&self) -> u32 {
        self.final_score
            .map_or(self.world.coins_collected, |(_, coins)| coins)
    }

    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    #[must_use]
    pub fn result(&self, created_at_epoch_ms: i64) -> Option<ClimbRunResult> {
        let (score, coins) = self.final_score?;
        Some(ClimbRunResult {
            date_key: self.day,
            score,
            coins_collected: coins,
            created_at_epoch_ms,
        })
    }
}
