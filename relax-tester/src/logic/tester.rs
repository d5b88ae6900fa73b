use anyhow::{Result, bail, ensure};
use colored::Colorize;
use relax_game::constants::{FALSE_START_PENALTY_MS, HISTORY_CAPACITY, MISS_PENALTY_MS};
use relax_game::{
    ClimbRunResult, DailyRng, GameKind, MemoryStore, RelaxEngine, RunRecord, RunResult,
    SkyJumpTuning, TargetConfig, TargetRunResult, TimelineEntry, Viewport, climb_score,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::bots::{bot_rng, iteration_seed, play_climb, play_reaction, play_target};
use super::selection::Scenario;

/// Ten minutes of play at 60 frames per second.
pub const CLIMB_FRAME_BUDGET: u64 = 36_000;
const DETERMINISM_DRAWS: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    verbose: bool,
}

impl LogicTester {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn run_scenarios(&self, scenarios: &[Scenario], iterations: usize) -> Vec<ScenarioResult> {
        scenarios
            .iter()
            .map(|scenario| {
                if self.verbose {
                    println!("🧪 Testing scenario: {}", scenario.name().bright_white());
                }
                self.run_scenario(scenario, iterations)
            })
            .collect()
    }

    /// Run `iterations` bot games of one scenario against a shared
    /// in-memory store, checking every invariant after each run.
    pub fn run_scenario(&self, scenario: &Scenario, iterations: usize) -> ScenarioResult {
        let engine = RelaxEngine::for_day(scenario.locale, scenario.day, MemoryStore::new());
        let mut ledger = RecordLedger::default();
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        if let Err(err) = check_generator(scenario) {
            failures.push(format!("Generator: {err}"));
        }

        for i in 0..iterations {
            let start_time = Instant::now();
            let outcome = run_iteration(&engine, scenario, i, &mut ledger);
            let duration = start_time.elapsed();

            match outcome {
                Ok(summary) => {
                    successes += 1;
                    performance_data.push(duration);
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) {summary}",
                            i + 1,
                            iterations
                        );
                    }
                }
                Err(err) => {
                    let seed = iteration_seed(scenario.day, scenario.locale, i);
                    failures.push(format!("Iteration {} (seed {seed}): {err:#}", i + 1));
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{} failed: {}",
                            i + 1,
                            iterations,
                            format!("{err:#}").red()
                        );
                    }
                }
            }
        }

        let avg_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name(),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration: avg_duration,
            performance_data,
        }
    }
}

/// Best-of-day values seen so far in a scenario, per game.
#[derive(Debug, Default)]
struct RecordLedger {
    reaction: Option<f64>,
    target: Option<f64>,
    climb: Option<u64>,
}

fn run_iteration(
    engine: &RelaxEngine<MemoryStore>,
    scenario: &Scenario,
    iteration: usize,
    ledger: &mut RecordLedger,
) -> Result<String> {
    let seed = iteration_seed(scenario.day, scenario.locale, iteration);
    let created_at = i64::try_from(iteration).unwrap_or(i64::MAX);

    match scenario.game {
        GameKind::ReactionSprint => {
            let play = play_reaction(
                &mut engine.reaction_sprint(),
                &mut bot_rng(seed, scenario.game),
                created_at,
            )?;
            let run = &play.run;
            let expected = play.reactions.iter().sum::<f64>()
                + f64::from(play.false_starts) * FALSE_START_PENALTY_MS;
            ensure!(
                (run.total_duration_ms - expected).abs() < 1e-6,
                "total {} != trials + penalty {expected}",
                run.total_duration_ms
            );
            ensure!(
                run.trial_durations.as_slice() == play.reactions.as_slice(),
                "recorded trials {:?} differ from bot reactions {:?}",
                run.trial_durations,
                play.reactions
            );
            let replay = play_reaction(
                &mut engine.reaction_sprint(),
                &mut bot_rng(seed, scenario.game),
                created_at,
            )?;
            ensure!(replay.run == play.run, "replay diverged from first run");

            check_record(engine, run, created_at)?;
            let best_total = engine
                .best_today::<RunResult>()
                .map_or(f64::INFINITY, |b| b.total_duration_ms);
            if let Some(previous) = ledger.reaction {
                ensure!(
                    best_total <= previous,
                    "best rose from {previous} to {best_total}"
                );
            }
            ledger.reaction = Some(best_total);
            Ok(format!(
                "total:{:.0}ms false_starts:{}",
                run.total_duration_ms, run.false_start_count
            ))
        }
        GameKind::TargetFrenzy => {
            let mut game = engine.target_frenzy()?;
            let margin = TargetConfig::default().margin_pct;
            let on_board = margin..=100.0 - margin;
            ensure!(
                game.targets()
                    .iter()
                    .all(|t| on_board.contains(&t.x) && on_board.contains(&t.y)),
                "target outside the {margin}% margin"
            );
            let play = play_target(&mut game, &mut bot_rng(seed, scenario.game), created_at)?;
            let run = &play.run;
            ensure!(
                u32::try_from(game.targets().len()) == Ok(run.hit_count),
                "finished with {} hits",
                run.hit_count
            );
            ensure!(
                run.miss_count == play.misses,
                "recorded {} misses, bot made {}",
                run.miss_count,
                play.misses
            );
            let expected = play.finished_at + f64::from(play.misses) * MISS_PENALTY_MS;
            ensure!(
                (run.total_duration_ms - expected).abs() < 1e-6,
                "total {} != elapsed + penalty {expected}",
                run.total_duration_ms
            );

            check_record(engine, run, created_at)?;
            let best_total = engine
                .best_today::<TargetRunResult>()
                .map_or(f64::INFINITY, |b| b.total_duration_ms);
            if let Some(previous) = ledger.target {
                ensure!(
                    best_total <= previous,
                    "best rose from {previous} to {best_total}"
                );
            }
            ledger.target = Some(best_total);
            Ok(format!(
                "total:{:.0}ms misses:{}",
                run.total_duration_ms, run.miss_count
            ))
        }
        GameKind::SkyJump => {
            let (viewport, tuning) = if iteration % 2 == 0 {
                (Viewport::FALLBACK, SkyJumpTuning::touch())
            } else {
                (Viewport::new(560.0, 746.0), SkyJumpTuning::desktop())
            };
            let mut game = engine.sky_jump(viewport, tuning)?;
            let play = play_climb(
                &mut game,
                &mut bot_rng(seed, scenario.game),
                CLIMB_FRAME_BUDGET,
                created_at,
            );
            ensure!(
                play.score_drops == 0,
                "score dropped {} time(s)",
                play.score_drops
            );
            let Some(run) = play.run else {
                bail!("climb still running after {} frames", play.frames);
            };
            let world = game.world();
            ensure!(
                run.score == climb_score(world.scroll_distance, world.coins_collected),
                "score {} does not match altitude {:.1} and {} coins",
                run.score,
                world.scroll_distance,
                world.coins_collected
            );
            ensure!(
                run.score == play.last_score,
                "result {} != HUD {}",
                run.score,
                play.last_score
            );
            ensure!(
                run.coins_collected == play.coin_events,
                "{} coins recorded, {} pickups seen",
                run.coins_collected,
                play.coin_events
            );
            match game.timeline().last() {
                Some(TimelineEntry::End { final_score, .. }) if *final_score == run.score => {}
                other => bail!("timeline does not end with the final score: {other:?}"),
            }

            check_record(engine, &run, created_at)?;
            let best_score = engine
                .best_today::<ClimbRunResult>()
                .map_or(0, |b| b.score);
            if let Some(previous) = ledger.climb {
                ensure!(
                    best_score >= previous,
                    "best fell from {previous} to {best_score}"
                );
            }
            ledger.climb = Some(best_score);
            Ok(format!(
                "score:{} coins:{} frames:{}",
                run.score, run.coins_collected, play.frames
            ))
        }
    }
}

/// Record a finished run and check the best-of-day and history rules.
fn check_record<R: RunRecord + PartialEq>(
    engine: &RelaxEngine<MemoryStore>,
    run: &R,
    created_at: i64,
) -> Result<()> {
    let outcome = engine.record(run);
    ensure!(
        !run.improves_on(&outcome.best),
        "stored best {:?} is worse than the run just played",
        outcome.best
    );
    ensure!(
        outcome.history.len() <= HISTORY_CAPACITY,
        "history holds {} entries",
        outcome.history.len()
    );
    ensure!(
        outcome.history.first() == Some(run),
        "history does not start with the run just played"
    );
    ensure!(
        outcome
            .history
            .windows(2)
            .all(|pair| pair[0].created_at() >= pair[1].created_at()),
        "history is not newest first"
    );
    let persisted = engine.history::<R>();
    ensure!(
        persisted.first().map(RunRecord::created_at) == Some(created_at),
        "persisted history lost the latest run"
    );
    Ok(())
}

/// Same day and locale must reproduce the stream; the draws stay in [0, 1).
fn check_generator(scenario: &Scenario) -> Result<()> {
    let mut first = DailyRng::for_day(scenario.day, scenario.locale.code());
    let mut second = DailyRng::for_day(scenario.day, scenario.locale.code());
    for draw in 0..DETERMINISM_DRAWS {
        let (a, b) = (first.next_f64(), second.next_f64());
        ensure!(a.to_bits() == b.to_bits(), "draw {draw} differs: {a} vs {b}");
        ensure!((0.0..1.0).contains(&a), "draw {draw} out of range: {a}");
    }
    Ok(())
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relax_game::{DailyKey, Locale};

    fn scenario(game: GameKind) -> Scenario {
        Scenario {
            game,
            day: DailyKey::from_ymd(2024, 3, 1).unwrap(),
            locale: Locale::Fr,
        }
    }

    #[test]
    fn timed_games_pass_every_invariant() {
        let tester = LogicTester::new(false);
        for game in [GameKind::ReactionSprint, GameKind::TargetFrenzy] {
            let result = tester.run_scenario(&scenario(game), 20);
            assert!(result.passed, "{}: {:?}", result.scenario_name, result.failures);
            assert_eq!(result.successful_iterations, 20);
            assert_eq!(result.performance_data.len(), 20);
        }
    }

    #[test]
    fn climb_failures_are_reported_not_panicked() {
        let result = LogicTester::new(false).run_scenario(&scenario(GameKind::SkyJump), 2);
        assert_eq!(result.iterations_run, 2);
        assert_eq!(
            result.successful_iterations + result.failures.len(),
            2,
            "{:?}",
            result.failures
        );
    }

    #[test]
    fn generator_check_accepts_every_locale() {
        for locale in Locale::ALL {
            let scenario = Scenario {
                locale,
                ..scenario(GameKind::SkyJump)
            };
            assert!(check_generator(&scenario).is_ok());
        }
    }

    #[test]
    fn scenario_result_serializes_durations_as_millis() {
        let result = ScenarioResult {
            scenario_name: "Reaction Sprint 2024-03-01 [fr]".to_string(),
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 12);
        assert_eq!(json["performance_data"][0], 12);
        let back: ScenarioResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.average_duration, result.average_duration);
    }
}
