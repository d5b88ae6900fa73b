//! Terminal results of each game and the ordering that decides best-of-day.
use crate::constants::{
    COIN_SCORE, FALSE_START_PENALTY_MS, MISS_PENALTY_MS, REACTION_PREFIX, REACTION_TRIALS_PER_RUN,
    SKY_JUMP_PREFIX, TARGET_COUNT, TARGET_PREFIX,
};
use crate::numbers::{floor_f64_to_u64, u32_to_f64};
use crate::seed::DailyKey;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::fmt::Write as _;

const SHARE_FOOTER: &str = "#Relaxation #Portfolio";

/// The three games, each owning a storage namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameKind {
    ReactionSprint,
    TargetFrenzy,
    SkyJump,
}

impl GameKind {
    pub const ALL: [Self; 3] = [Self::ReactionSprint, Self::TargetFrenzy, Self::SkyJump];

    /// Storage key prefix for this game.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::ReactionSprint => REACTION_PREFIX,
            Self::TargetFrenzy => TARGET_PREFIX,
            Self::SkyJump => SKY_JUMP_PREFIX,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ReactionSprint => "Reaction Sprint",
            Self::TargetFrenzy => "Target Frenzy",
            Self::SkyJump => "Sky Jump",
        }
    }

    #[must_use]
    pub fn best_key(self, day: DailyKey) -> String {
        format!("{}:best:{day}", self.prefix())
    }

    #[must_use]
    pub fn history_key(self) -> String {
        format!("{}:history", self.prefix())
    }

    /// Parse CLI/route spellings such as `reaction`, `target-frenzy` or `sky_jump`.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "reaction" | "reaction-sprint" => Some(Self::ReactionSprint),
            "target" | "target-frenzy" => Some(Self::TargetFrenzy),
            "sky" | "sky-jump" | "climb" => Some(Self::SkyJump),
            _ => None,
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Behaviour shared by every persisted result.
pub trait RunRecord: Serialize + DeserializeOwned + Clone + fmt::Debug {
    const GAME: GameKind;

    fn date_key(&self) -> DailyKey;

    fn created_at(&self) -> i64;

    /// Whether `self` should replace `current` as best-of-day.
    fn improves_on(&self, current: &Self) -> bool;

    /// Plain-text summary suitable for the clipboard.
    fn share_text(&self) -> String;
}

/// Completed reaction sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(rename = "dateKey")]
    pub date_key: DailyKey,
    #[serde(rename = "totalMs")]
    pub total_duration_ms: f64,
    #[serde(rename = "trials")]
    pub trial_durations: SmallVec<[f64; REACTION_TRIALS_PER_RUN]>,
    #[serde(rename = "falseStarts")]
    pub false_start_count: u32,
    #[serde(rename = "timestamp")]
    pub created_at_epoch_ms: i64,
}

impl RunResult {
    /// Build a result, deriving the total from trials and false starts.
    #[must_use]
    pub fn from_trials(
        date_key: DailyKey,
        trial_durations: &[f64],
        false_start_count: u32,
        created_at_epoch_ms: i64,
    ) -> Self {
        let base: f64 = trial_durations.iter().sum();
        Self {
            date_key,
            total_duration_ms: base + penalty_ms(false_start_count, FALSE_START_PENALTY_MS),
            trial_durations: SmallVec::from_slice(trial_durations),
            false_start_count,
            created_at_epoch_ms,
        }
    }

    #[must_use]
    pub fn penalty_ms(&self) -> f64 {
        penalty_ms(self.false_start_count, FALSE_START_PENALTY_MS)
    }
}

impl RunRecord for RunResult {
    const GAME: GameKind = GameKind::ReactionSprint;

    fn date_key(&self) -> DailyKey {
        self.date_key
    }

    fn created_at(&self) -> i64 {
        self.created_at_epoch_ms
    }

    fn improves_on(&self, current: &Self) -> bool {
        self.total_duration_ms < current.total_duration_ms
    }

    fn share_text(&self) -> String {
        let trials = self
            .trial_durations
            .iter()
            .map(|t| format!("{t:.0}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut body = format!(
            "{} — {}\nTotal: {:.0} ms ({trials})",
            Self::GAME.label(),
            self.date_key,
            self.total_duration_ms
        );
        if self.false_start_count > 0 {
            let _ = write!(
                body,
                " • +{:.0} ms penalty ({}×{FALSE_START_PENALTY_MS:.0}ms)",
                self.penalty_ms(),
                self.false_start_count
            );
        }
        let _ = write!(body, "\n{SHARE_FOOTER}");
        body
    }
}

/// Completed target frenzy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRunResult {
    #[serde(rename = "dateKey")]
    pub date_key: DailyKey,
    #[serde(rename = "ms")]
    pub total_duration_ms: f64,
    #[serde(rename = "hits")]
    pub hit_count: u32,
    #[serde(rename = "misses")]
    pub miss_count: u32,
    #[serde(rename = "timestamp")]
    pub created_at_epoch_ms: i64,
}

impl TargetRunResult {
    #[must_use]
    pub fn from_elapsed(
        date_key: DailyKey,
        raw_elapsed_ms: f64,
        hit_count: u32,
        miss_count: u32,
        created_at_epoch_ms: i64,
    ) -> Self {
        Self {
            date_key,
            total_duration_ms: raw_elapsed_ms + penalty_ms(miss_count, MISS_PENALTY_MS),
            hit_count,
            miss_count,
            created_at_epoch_ms,
        }
    }

    #[must_use]
    pub fn penalty_ms(&self) -> f64 {
        penalty_ms(self.miss_count, MISS_PENALTY_MS)
    }

    #[must_use]
    pub fn raw_elapsed_ms(&self) -> f64 {
        self.total_duration_ms - self.penalty_ms()
    }
}

impl RunRecord for TargetRunResult {
    const GAME: GameKind = GameKind::TargetFrenzy;

    fn date_key(&self) -> DailyKey {
        self.date_key
    }

    fn created_at(&self) -> i64 {
        self.created_at_epoch_ms
    }

    fn improves_on(&self, current: &Self) -> bool {
        self.total_duration_ms < current.total_duration_ms
    }

    fn share_text(&self) -> String {
        let mut body = format!(
            "{} — {}\nTotal: {:.0} ms (base {:.0} ms",
            Self::GAME.label(),
            self.date_key,
            self.total_duration_ms,
            self.raw_elapsed_ms()
        );
        if self.miss_count > 0 {
            let _ = write!(body, " + {}×{MISS_PENALTY_MS:.0} ms", self.miss_count);
        }
        let _ = write!(
            body,
            ")\nHits: {}/{TARGET_COUNT}, Misses: {}\n{SHARE_FOOTER}",
            self.hit_count, self.miss_count
        );
        body
    }
}

/// Completed sky jump climb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClimbRunResult {
    #[serde(rename = "dateKey")]
    pub date_key: DailyKey,
    pub score: u64,
    #[serde(rename = "coins")]
    pub coins_collected: u32,
    #[serde(rename = "timestamp")]
    pub created_at_epoch_ms: i64,
}

impl ClimbRunResult {
    #[must_use]
    pub fn from_progress(
        date_key: DailyKey,
        scroll_distance: f64,
        coins_collected: u32,
        created_at_epoch_ms: i64,
    ) -> Self {
        Self {
            date_key,
            score: climb_score(scroll_distance, coins_collected),
            coins_collected,
            created_at_epoch_ms,
        }
    }
}

impl RunRecord for ClimbRunResult {
    const GAME: GameKind = GameKind::SkyJump;

    fn date_key(&self) -> DailyKey {
        self.date_key
    }

    fn created_at(&self) -> i64 {
        self.created_at_epoch_ms
    }

    fn improves_on(&self, current: &Self) -> bool {
        self.score > current.score
    }

    fn share_text(&self) -> String {
        format!(
            "{} — {}\nScore: {} ({} coins)\n{SHARE_FOOTER}",
            Self::GAME.label(),
            self.date_key,
            self.score,
            self.coins_collected
        )
    }
}

/// Altitude plus coin bonus.
#[must_use]
pub fn climb_score(scroll_distance: f64, coins_collected: u32) -> u64 {
    floor_f64_to_u64(scroll_distance)
        .saturating_add(COIN_SCORE.saturating_mul(u64::from(coins_collected)))
}

fn penalty_ms(count: u32, per_unit: f64) -> f64 {
    u32_to_f64(count) * per_unit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> DailyKey {
        DailyKey::from_ymd(2024, 3, 1).unwrap()
    }

    #[test]
    fn reaction_total_includes_false_start_penalty() {
        let run = RunResult::from_trials(day(), &[210.0, 180.0, 250.0, 190.0, 230.0], 1, 1);
        assert!((run.total_duration_ms - 1_260.0).abs() < f64::EPSILON);
        assert!((run.penalty_ms() - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn target_total_includes_miss_penalty() {
        let run = TargetRunResult::from_elapsed(day(), 5_000.0, 20, 3, 1);
        assert!((run.total_duration_ms - 5_600.0).abs() < f64::EPSILON);
        assert!((run.raw_elapsed_ms() - 5_000.0).abs() < f64::EPSILON);
        assert_eq!(run.hit_count, 20);
    }

    #[test]
    fn climb_score_floors_altitude_and_adds_coins() {
        assert_eq!(climb_score(1_234.9, 3), 1_534);
        assert_eq!(climb_score(-5.0, 0), 0);
        let run = ClimbRunResult::from_progress(day(), 99.5, 2, 7);
        assert_eq!(run.score, 299);
    }

    #[test]
    fn best_ordering_depends_on_game() {
        let fast = RunResult::from_trials(day(), &[100.0], 0, 1);
        let slow = RunResult::from_trials(day(), &[300.0], 0, 2);
        assert!(fast.improves_on(&slow));
        assert!(!slow.improves_on(&fast));
        assert!(!fast.improves_on(&fast));

        let high = ClimbRunResult::from_progress(day(), 500.0, 0, 1);
        let low = ClimbRunResult::from_progress(day(), 100.0, 0, 2);
        assert!(high.improves_on(&low));
        assert!(!low.improves_on(&high));
    }

    #[test]
    fn persisted_shape_uses_browser_field_names() {
        let run = RunResult::from_trials(day(), &[200.0, 210.0], 0, 1_709_251_200_000);
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["dateKey"], "2024-03-01");
        assert_eq!(value["falseStarts"], 0);
        assert_eq!(value["trials"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["timestamp"], 1_709_251_200_000_i64);

        let target: TargetRunResult = serde_json::from_str(
            r#"{"dateKey":"2024-03-01","ms":5600,"hits":20,"misses":3,"timestamp":5}"#,
        )
        .unwrap();
        assert_eq!(target.miss_count, 3);

        let climb: ClimbRunResult = serde_json::from_str(
            r#"{"dateKey":"2024-03-01","score":420,"coins":1,"timestamp":5}"#,
        )
        .unwrap();
        assert_eq!(climb.coins_collected, 1);
    }

    #[test]
    fn share_texts_mention_penalties() {
        let run = RunResult::from_trials(day(), &[210.0, 180.0], 2, 1);
        let text = run.share_text();
        assert!(text.starts_with("Reaction Sprint — 2024-03-01"));
        assert!(text.contains("+400 ms penalty (2×200ms)"));
        assert!(text.ends_with(SHARE_FOOTER));

        let target = TargetRunResult::from_elapsed(day(), 5_000.0, 20, 3, 1);
        let text = target.share_text();
        assert!(text.contains("base 5000 ms + 3×200 ms"));
        assert!(text.contains("Hits: 20/20, Misses: 3"));

        let climb = ClimbRunResult::from_progress(day(), 40.0, 1, 1);
        assert!(climb.share_text().contains("Score: 140 (1 coins)"));
    }

    #[test]
    fn game_kind_keys_and_parsing() {
        assert_eq!(
            GameKind::ReactionSprint.best_key(day()),
            "relax-reaction-sprint:best:2024-03-01"
        );
        assert_eq!(GameKind::SkyJump.history_key(), "relax-sky-jump:history");
        assert_eq!(GameKind::parse("target_frenzy"), Some(GameKind::TargetFrenzy));
        assert_eq!(GameKind::parse("climb"), Some(GameKind::SkyJump));
        assert_eq!(GameKind::parse("chess"), None);
    }
}
