//! Reaction sprint: a fixed number of trials, each waiting out a seeded
//! delay before the player may click.
//!
//! The machine never owns a real timer. It holds at most one pending
//! deadline, exposed through [`ReactionSprint::next_deadline`], and is
//! advanced by [`ReactionSprint::tick`] with the host's monotonic clock.
//! Every transition replaces or clears that deadline, so a stale callback
//! can never fire into a later run.

use crate::config::ReactionConfig;
use crate::constants::{FALSE_START_PENALTY_MS, REACTION_TRIALS_PER_RUN};
use crate::i18n::Locale;
use crate::numbers::u32_to_f64;
use crate::result::RunResult;
use crate::seed::{DailyKey, DailyRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrialState {
    Idle,
    Arming,
    Ready,
    Clicked,
    FalseStart,
    Finished,
}

impl TrialState {
    #[must_use]
    pub const fn label(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::Idle, Locale::Fr) => "Prêt",
            (Self::Idle, Locale::En) => "Ready",
            (Self::Arming, Locale::Fr) => "Attends…",
            (Self::Arming, Locale::En) => "Wait…",
            (Self::Ready, Locale::Fr) => "CLIQUE !",
            (Self::Ready, Locale::En) => "CLICK!",
            (Self::FalseStart, Locale::Fr) => "Trop tôt !",
            (Self::FalseStart, Locale::En) => "Too early!",
            (Self::Clicked, Locale::Fr) => "Bien joué",
            (Self::Clicked, Locale::En) => "Nice",
            (Self::Finished, Locale::Fr) => "Terminé",
            (Self::Finished, Locale::En) => "Finished",
        }
    }
}

/// Result of a player click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    /// Not in a clickable state (idle, lead-in, display pauses, finished).
    Ignored,
    /// Clicked during the countdown; the same trial re-arms.
    FalseStart { count: u32 },
    /// Clicked after the signal.
    Recorded { trial: usize, duration_ms: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingAction {
    BeginTrial,
    BecomeReady,
    Rearm,
    Advance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Deadline {
    due_at_ms: f64,
    action: PendingAction,
}

/// Draw the per-trial arming delays for a day and locale.
#[must_use]
pub fn daily_delays(day: DailyKey, locale: &str, config: &ReactionConfig) -> Vec<f64> {
    let mut rng = DailyRng::for_day(day, locale);
    (0..REACTION_TRIALS_PER_RUN)
        .map(|_| config.delay_min_ms + (rng.next_f64() * config.delay_span_ms).floor())
        .collect()
}

/// One reaction sprint session; reusable across runs via [`start`](Self::start).
#[derive(Debug, Clone)]
pub struct ReactionSprint {
    config: ReactionConfig,
    day: DailyKey,
    delays: Vec<f64>,
    state: TrialState,
    trial_index: usize,
    trial_times: Vec<f64>,
    false_starts: u32,
    ready_at: Option<f64>,
    pressed_at: Option<f64>,
    pending: Option<Deadline>,
}

impl ReactionSprint {
    #[must_use]
    pub fn new(day: DailyKey, locale: &str, config: ReactionConfig) -> Self {
        let delays = daily_delays(day, locale, &config);
        Self {
            config,
            day,
            delays,
            state: TrialState::Idle,
            trial_index: 0,
            trial_times: Vec::with_capacity(REACTION_TRIALS_PER_RUN),
            false_starts: 0,
            ready_at: None,
            pressed_at: None,
            pending: None,
        }
    }

    /// Begin a fresh run; the first trial arms after the lead-in.
    pub fn start(&mut self, now_ms: f64) {
        self.reset();
        self.schedule(now_ms + self.config.lead_in_ms, PendingAction::BeginTrial);
    }

    /// Cancel any pending deadline and return to idle.
    pub fn reset(&mut self) {
        self.stop();
        self.state = TrialState::Idle;
        self.trial_index = 0;
        self.trial_times.clear();
        self.false_starts = 0;
        self.ready_at = None;
        self.pressed_at = None;
    }

    /// Cancel the pending deadline. Safe to call any number of times.
    pub fn stop(&mut self) {
        self.pending = None;
    }

    /// When the host should next call [`tick`](Self::tick), if at all.
    #[must_use]
    pub fn next_deadline(&self) -> Option<f64> {
        self.pending.map(|d| d.due_at_ms)
    }

    /// Fire every deadline due at or before `now_ms`.
    pub fn tick(&mut self, now_ms: f64) -> TrialState {
        while let Some(deadline) = self.pending {
            if deadline.due_at_ms > now_ms {
                break;
            }
            self.pending = None;
            self.fire(deadline);
        }
        self.state
    }

    /// Handle a click on the play area.
    pub fn click(&mut self, now_ms: f64) -> ClickOutcome {
        self.tick(now_ms);
        match self.state {
            TrialState::Arming => {
                self.false_starts = self.false_starts.saturating_add(1);
                self.state = TrialState::FalseStart;
                self.schedule(
                    now_ms + self.config.false_start_display_ms,
                    PendingAction::Rearm,
                );
                log::debug!(
                    "false start on trial {} ({} so far)",
                    self.trial_index,
                    self.false_starts
                );
                ClickOutcome::FalseStart {
                    count: self.false_starts,
                }
            }
            TrialState::Ready => {
                let ready_at = self.ready_at.unwrap_or(now_ms);
                let duration_ms = (now_ms - ready_at).max(0.0);
                self.pressed_at = Some(now_ms);
                self.trial_times.push(duration_ms);
                self.state = TrialState::Clicked;
                self.schedule(
                    now_ms + self.config.clicked_display_ms,
                    PendingAction::Advance,
                );
                ClickOutcome::Recorded {
                    trial: self.trial_index,
                    duration_ms,
                }
            }
            TrialState::Idle
            | TrialState::Clicked
            | TrialState::FalseStart
            | TrialState::Finished => ClickOutcome::Ignored,
        }
    }

    fn schedule(&mut self, due_at_ms: f64, action: PendingAction) {
        self.pending = Some(Deadline { due_at_ms, action });
    }

    fn current_delay(&self) -> f64 {
        self.delays
            .get(self.trial_index)
            .copied()
            .unwrap_or(self.config.delay_min_ms)
    }

    fn fire(&mut self, deadline: Deadline) {
        let at = deadline.due_at_ms;
        match deadline.action {
            PendingAction::BeginTrial | PendingAction::Rearm => {
                self.state = TrialState::Arming;
                self.ready_at = None;
                self.schedule(at + self.current_delay(), PendingAction::BecomeReady);
            }
            PendingAction::BecomeReady => {
                self.state = TrialState::Ready;
                self.ready_at = Some(at);
            }
            PendingAction::Advance => {
                let next = self.trial_index + 1;
                if next >= REACTION_TRIALS_PER_RUN {
                    self.state = TrialState::Finished;
                    log::debug!(
                        "reaction run finished: {:.0} ms with {} false starts",
                        self.final_ms(),
                        self.false_starts
                    );
                } else {
                    self.trial_index = next;
                    self.ready_at = None;
                    self.pressed_at = None;
                    self.state = TrialState::Arming;
                    self.schedule(at + self.current_delay(), PendingAction::BecomeReady);
                }
            }
        }
    }

    #[must_use]
    pub const fn state(&self) -> TrialState {
        self.state
    }

    #[must_use]
    pub const fn day(&self) -> DailyKey {
        self.day
    }

    #[must_use]
    pub const fn trial_index(&self) -> usize {
        self.trial_index
    }

    #[must_use]
    pub fn trial_times(&self) -> &[f64] {
        &self.trial_times
    }

    #[must_use]
    pub fn delays(&self) -> &[f64] {
        &self.delays
    }

    #[must_use]
    pub const fn false_starts(&self) -> u32 {
        self.false_starts
    }

    #[must_use]
    pub const fn ready_at(&self) -> Option<f64> {
        self.ready_at
    }

    #[must_use]
    pub const fn pressed_at(&self) -> Option<f64> {
        self.pressed_at
    }

    #[must_use]
    pub fn base_ms(&self) -> f64 {
        self.trial_times.iter().sum()
    }

    #[must_use]
    pub fn penalty_ms(&self) -> f64 {
        u32_to_f64(self.false_starts) * FALSE_START_PENALTY_MS
    }

    #[must_use]
    pub fn final_ms(&self) -> f64 {
        self.base_ms() + self.penalty_ms()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == TrialState::Finished
    }

    /// The finished run, stamped with `created_at_epoch_ms`.
    #[must_use]
    pub fn result(&self, created_at_epoch_ms: i64) -> Option<RunResult> {
        self.is_finished().then(|| {
            RunResult::from_trials(
                self.day,
                &self.trial_times,
                self.false_starts,
                created_at_epoch_ms,
            )
        })
    }
}
