//! Relaxation games engine
//!
//! Platform-agnostic core of three daily mini-games: a reaction sprint, a
//! target frenzy and the Sky Jump climb. Every game is seeded from the
//! calendar day and locale, so all players face the same challenge on a
//! given day. This crate has no UI or browser dependencies; hosts drive the
//! state machines with their own clock and inject storage.

pub mod config;
pub mod constants;
pub mod contact;
pub mod i18n;
pub mod numbers;
pub mod reaction;
pub mod result;
pub mod seed;
pub mod sky_jump;
pub mod store;
pub mod target;

// Re-export commonly used types
pub use config::{ReactionConfig, TargetConfig, TuningError};
pub use contact::{
    ClientInfo, ContactEmail, ContactError, ContactRequest, ContactResponse, MailTransport,
    RelayConfig, encode_uri_component, escape_html, first_forwarded_ip, handle_contact,
};
pub use i18n::Locale;
pub use reaction::{ClickOutcome, ReactionSprint, TrialState, daily_delays};
pub use result::{
    ClimbRunResult, GameKind, RunRecord, RunResult, TargetRunResult, climb_score,
};
pub use seed::{DailyKey, DailyKeyError, DailyRng, daily_rng, daily_seed, fnv1a32};
pub use sky_jump::{
    DeathCause, FrameEvent, InputState, SkyJump, SkyJumpTuning, SkyState, StepReport,
    TimelineEntry, Viewport, difficulty_at,
};
pub use store::{KeyValueStore, MemoryStore, RecordOutcome, ResultStore, StoreError};
pub use target::{TargetClick, TargetFrenzy, TargetPoint, TargetState, daily_targets};

/// Binds a locale, a day and a store; creates seeded sessions and records
/// their results.
pub struct RelaxEngine<S>
where
    S: KeyValueStore,
{
    locale: Locale,
    day: DailyKey,
    results: ResultStore<S>,
    reaction: ReactionConfig,
    target: TargetConfig,
}

impl<S> RelaxEngine<S>
where
    S: KeyValueStore,
{
    /// Engine for today in the local timezone.
    pub fn new(locale: Locale, storage: S) -> Self {
        Self::for_day(locale, DailyKey::today(), storage)
    }

    pub fn for_day(locale: Locale, day: DailyKey, storage: S) -> Self {
        Self {
            locale,
            day,
            results: ResultStore::new(storage),
            reaction: ReactionConfig::default(),
            target: TargetConfig::default(),
        }
    }

    /// Override the timed-game tuning.
    ///
    /// # Errors
    ///
    /// Returns an error if either config fails validation.
    pub fn with_configs(
        mut self,
        reaction: ReactionConfig,
        target: TargetConfig,
    ) -> Result<Self, TuningError> {
        reaction.validate()?;
        target.validate()?;
        self.reaction = reaction;
        self.target = target;
        Ok(self)
    }

    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.locale
    }

    #[must_use]
    pub const fn day(&self) -> DailyKey {
        self.day
    }

    #[must_use]
    pub const fn results(&self) -> &ResultStore<S> {
        &self.results
    }

    /// Generator for this engine's day and locale.
    #[must_use]
    pub fn rng(&self) -> DailyRng {
        DailyRng::for_day(self.day, self.locale.code())
    }

    #[must_use]
    pub fn reaction_sprint(&self) -> ReactionSprint {
        ReactionSprint::new(self.day, self.locale.code(), self.reaction.clone())
    }

    /// # Errors
    ///
    /// Returns an error if the target tuning is invalid.
    pub fn target_frenzy(&self) -> Result<TargetFrenzy, TuningError> {
        TargetFrenzy::new(self.day, self.locale.code(), self.target.clone())
    }

    /// Climb session sized for the host's play area.
    ///
    /// # Errors
    ///
    /// Returns an error if the viewport or tuning is invalid.
    pub fn sky_jump(
        &self,
        viewport: Viewport,
        tuning: SkyJumpTuning,
    ) -> Result<SkyJump, TuningError> {
        SkyJump::new(self.day, self.locale.code(), viewport, tuning)
    }

    /// Save best-of-day and prepend to history.
    pub fn record<R: RunRecord>(&self, result: &R) -> RecordOutcome<R> {
        self.results.record(result)
    }

    #[must_use]
    pub fn best_today<R: RunRecord>(&self) -> Option<R> {
        self.results.load_best(self.day)
    }

    #[must_use]
    pub fn history<R: RunRecord>(&self) -> Vec<R> {
        self.results.load_history()
    }

    pub fn clear_history(&self, game: GameKind) {
        self.results.clear_history(game);
    }
}

/// Current wall-clock time in epoch milliseconds, for result timestamps.
#[must_use]
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RelaxEngine<MemoryStore> {
        let day = DailyKey::from_ymd(2024, 3, 1).unwrap();
        RelaxEngine::for_day(Locale::Fr, day, MemoryStore::new())
    }

    #[test]
    fn sessions_share_the_engine_day() {
        let engine = engine();
        assert_eq!(engine.reaction_sprint().day(), engine.day());
        assert_eq!(
            engine.reaction_sprint().delays(),
            daily_delays(engine.day(), "fr", &ReactionConfig::default()).as_slice()
        );
        assert_eq!(
            engine.target_frenzy().unwrap().targets(),
            engine.target_frenzy().unwrap().targets()
        );
        let climb = engine
            .sky_jump(Viewport::default(), SkyJumpTuning::touch())
            .unwrap();
        assert_eq!(climb.day(), engine.day());
    }

    #[test]
    fn locale_changes_the_daily_layout() {
        let day = DailyKey::from_ymd(2024, 3, 1).unwrap();
        let fr = RelaxEngine::for_day(Locale::Fr, day, MemoryStore::new());
        let en = RelaxEngine::for_day(Locale::En, day, MemoryStore::new());
        assert_ne!(
            fr.target_frenzy().unwrap().targets(),
            en.target_frenzy().unwrap().targets()
        );
    }

    #[test]
    fn engine_records_and_reads_back() {
        let engine = engine();
        assert!(engine.best_today::<RunResult>().is_none());

        let run = RunResult::from_trials(engine.day(), &[200.0, 220.0], 0, now_epoch_ms());
        let outcome = engine.record(&run);
        assert!(outcome.new_best);
        assert_eq!(engine.best_today::<RunResult>(), Some(run));
        assert_eq!(engine.history::<RunResult>().len(), 1);

        engine.clear_history(GameKind::ReactionSprint);
        assert!(engine.history::<RunResult>().is_empty());
        assert!(engine.best_today::<RunResult>().is_some());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let bad = TargetConfig {
            margin_pct: 60.0,
            ..TargetConfig::default()
        };
        assert!(
            engine()
                .with_configs(ReactionConfig::default(), bad)
                .is_err()
        );
    }
}
