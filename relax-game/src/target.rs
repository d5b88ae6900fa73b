//! Target frenzy: click twenty daily-placed targets as fast as possible.
use crate::config::{TargetConfig, TuningError};
use crate::constants::TARGET_COUNT;
use crate::numbers::count_to_f64;
use crate::result::TargetRunResult;
use crate::seed::{DailyKey, DailyRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    Idle,
    Running,
    Finished,
}

/// Target centre in percent of the play area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPoint {
    pub x: f64,
    pub y: f64,
}

impl TargetPoint {
    #[must_use]
    pub fn distance_to(self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

/// What a click did to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetClick {
    Ignored,
    Hit { hits: u32 },
    Miss { misses: u32 },
    Finished { hits: u32, misses: u32 },
}

/// Draw the day's target positions, x before y for each target.
///
/// Coordinates are pinned to `[margin, 100 - margin]`; an unvalidated config
/// whose bounds cross yields the upper bound rather than panicking.
#[must_use]
pub fn daily_targets(day: DailyKey, locale: &str, config: &TargetConfig) -> Vec<TargetPoint> {
    let mut rng = DailyRng::for_day(day, locale);
    let lo = config.margin_pct;
    let hi = config.upper_bound();
    let mut coord = move || (lo + rng.next_f64() * config.span_pct).max(lo).min(hi);
    (0..TARGET_COUNT)
        .map(|_| {
            let x = coord();
            let y = coord();
            TargetPoint { x, y }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct TargetFrenzy {
    config: TargetConfig,
    day: DailyKey,
    targets: Vec<TargetPoint>,
    state: TargetState,
    index: usize,
    hits: u32,
    misses: u32,
    started_at: Option<f64>,
    raw_elapsed_ms: Option<f64>,
}

impl TargetFrenzy {
    /// Lay out the day's board.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(day: DailyKey, locale: &str, config: TargetConfig) -> Result<Self, TuningError> {
        config.validate()?;
        let targets = daily_targets(day, locale, &config);
        Ok(Self {
            config,
            day,
            targets,
            state: TargetState::Idle,
            index: 0,
            hits: 0,
            misses: 0,
            started_at: None,
            raw_elapsed_ms: None,
        })
    }

    /// Begin a new run at `now_ms`. The target layout is the day's layout.
    pub fn start(&mut self, now_ms: f64) {
        self.reset();
        self.state = TargetState::Running;
        self.started_at = Some(now_ms);
    }

    pub fn reset(&mut self) {
        self.state = TargetState::Idle;
        self.index = 0;
        self.hits = 0;
        self.misses = 0;
        self.started_at = None;
        self.raw_elapsed_ms = None;
    }

    /// Register a click on the active target.
    pub fn hit(&mut self, now_ms: f64) -> TargetClick {
        if self.state != TargetState::Running {
            return TargetClick::Ignored;
        }
        self.hits = self.hits.saturating_add(1);
        self.index += 1;
        if self.index < self.targets.len() {
            return TargetClick::Hit { hits: self.hits };
        }
        let started = self.started_at.unwrap_or(now_ms);
        self.raw_elapsed_ms = Some((now_ms - started).max(0.0));
        self.state = TargetState::Finished;
        log::debug!(
            "target run finished: {:.0} ms raw, {} misses",
            self.raw_elapsed_ms.unwrap_or_default(),
            self.misses
        );
        TargetClick::Finished {
            hits: self.hits,
            misses: self.misses,
        }
    }

    /// Register a click anywhere but the active target.
    pub fn miss(&mut self) -> TargetClick {
        if self.state != TargetState::Running {
            return TargetClick::Ignored;
        }
        self.misses = self.misses.saturating_add(1);
        TargetClick::Miss {
            misses: self.misses,
        }
    }

    /// Hit-test a click at `(x, y)` percent against the active target.
    pub fn click_at(&mut self, now_ms: f64, x: f64, y: f64) -> TargetClick {
        match self.current_target() {
            Some(target) if target.distance_to(x, y) <= self.config.hit_radius_pct => {
                self.hit(now_ms)
            }
            Some(_) => self.miss(),
            None => TargetClick::Ignored,
        }
    }

    /// The active target while running.
    #[must_use]
    pub fn current_target(&self) -> Option<TargetPoint> {
        if self.state == TargetState::Running {
            self.targets.get(self.index).copied()
        } else {
            None
        }
    }

    #[must_use]
    pub fn targets(&self) -> &[TargetPoint] {
        &self.targets
    }

    #[must_use]
    pub const fn state(&self) -> TargetState {
        self.state
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn hits(&self) -> u32 {
        self.hits
    }

    #[must_use]
    pub const fn misses(&self) -> u32 {
        self.misses
    }

    /// Fraction of targets cleared, for progress bars.
    #[must_use]
    pub fn progress(&self) -> f64 {
        count_to_f64(self.index) / count_to_f64(self.targets.len().max(1))
    }

    /// Elapsed time so far, or the sealed time once finished.
    #[must_use]
    pub fn elapsed_ms(&self, now_ms: f64) -> f64 {
        match (self.raw_elapsed_ms, self.started_at) {
            (Some(sealed), _) => sealed,
            (None, Some(started)) => (now_ms - started).max(0.0),
            (None, None) => 0.0,
        }
    }

    #[must_use]
    pub fn result(&self, created_at_epoch_ms: i64) -> Option<TargetRunResult> {
        let raw = self.raw_elapsed_ms?;
        Some(TargetRunResult::from_elapsed(
            self.day,
            raw,
            self.hits,
            self.misses,
            created_at_epoch_ms,
        ))
    }
}
