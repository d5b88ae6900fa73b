//! Deterministic bot players. Each bot draws from its own `ChaCha20Rng`
//! stream so a (day, locale, iteration) triple always replays the same run.

use anyhow::{Context, Result, bail, ensure};
use hmac::{Hmac, Mac};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use relax_game::{
    ClickOutcome, ClimbRunResult, DailyKey, FrameEvent, GameKind, InputState, Locale,
    ReactionSprint, RunResult, SkyJump, SkyState, TargetClick, TargetFrenzy, TargetRunResult,
    TrialState, daily_seed,
};
use sha2::Sha256;
use std::f64::consts::TAU;

pub type BotRng = ChaCha20Rng;

const FALSE_START_CHANCE: f64 = 0.12;
const MISS_CHANCE: f64 = 0.2;
/// Well inside the default hit radius.
const AIM_JITTER_PCT: f64 = 2.5;
const HITCH_CHANCE: f64 = 0.01;
const MAX_REACTION_STEPS: usize = 10_000;
const MAX_TARGET_CLICKS: usize = 10_000;

/// HMAC-SHA256 of `domain_tag` keyed by `seed`, folded to 64 bits.
#[must_use]
pub fn derive_stream_seed(seed: u64, domain_tag: &[u8]) -> u64 {
    // HMAC takes keys of any length, so the fallback is unreachable.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&seed.to_le_bytes()) else {
        return seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Seed for one iteration of a scenario.
#[must_use]
pub fn iteration_seed(day: DailyKey, locale: Locale, iteration: usize) -> u64 {
    u64::from(daily_seed(day, locale.code()))
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(u64::try_from(iteration).unwrap_or(u64::MAX))
}

#[must_use]
pub fn bot_rng(seed: u64, game: GameKind) -> BotRng {
    BotRng::seed_from_u64(derive_stream_seed(seed, game.prefix().as_bytes()))
}

/// What the reaction bot did and what the game recorded.
#[derive(Debug, Clone)]
pub struct ReactionPlay {
    pub run: RunResult,
    pub reactions: Vec<f64>,
    pub false_starts: u32,
}

/// Play a full sprint, sometimes jumping the gun during the countdown.
pub fn play_reaction(
    game: &mut ReactionSprint,
    rng: &mut BotRng,
    created_at: i64,
) -> Result<ReactionPlay> {
    let mut now = 0.0;
    let mut reactions = Vec::new();
    let mut false_starts = 0;
    game.start(now);

    for _ in 0..MAX_REACTION_STEPS {
        match game.state() {
            TrialState::Finished => {
                let run = game
                    .result(created_at)
                    .context("finished sprint produced no result")?;
                return Ok(ReactionPlay {
                    run,
                    reactions,
                    false_starts,
                });
            }
            TrialState::Ready => {
                now += rng.gen_range(140.0..480.0);
                match game.click(now) {
                    ClickOutcome::Recorded { duration_ms, .. } => reactions.push(duration_ms),
                    other => bail!("click on the signal was not recorded: {other:?}"),
                }
            }
            TrialState::Arming if rng.gen_bool(FALSE_START_CHANCE) => {
                let due = game
                    .next_deadline()
                    .context("countdown running with no signal scheduled")?;
                now += (due - now) * rng.gen_range(0.05..0.95);
                match game.click(now) {
                    ClickOutcome::FalseStart { count } => {
                        false_starts += 1;
                        ensure!(
                            count == false_starts,
                            "false start count {count} != {false_starts}"
                        );
                    }
                    other => bail!("early click was not a false start: {other:?}"),
                }
            }
            state => {
                let due = game
                    .next_deadline()
                    .with_context(|| format!("stalled in {state:?} with nothing scheduled"))?;
                now = now.max(due);
                game.tick(now);
            }
        }
    }
    bail!("sprint did not finish within {MAX_REACTION_STEPS} steps")
}

/// What the target bot did and what the game recorded.
#[derive(Debug, Clone)]
pub struct TargetPlay {
    pub run: TargetRunResult,
    pub misses: u32,
    pub finished_at: f64,
}

/// Click through every target, aiming near the centre and sometimes
/// clicking the far side of the board.
pub fn play_target(
    game: &mut TargetFrenzy,
    rng: &mut BotRng,
    created_at: i64,
) -> Result<TargetPlay> {
    let mut now = 0.0;
    let mut misses = 0;
    game.start(now);

    for _ in 0..MAX_TARGET_CLICKS {
        let target = game
            .current_target()
            .context("running board has no active target")?;
        now += rng.gen_range(120.0..700.0);
        let (x, y) = if rng.gen_bool(MISS_CHANCE) {
            ((target.x + 50.0) % 100.0, target.y)
        } else {
            let angle = rng.gen_range(0.0..TAU);
            let radius = rng.gen_range(0.0..AIM_JITTER_PCT);
            (target.x + radius * angle.cos(), target.y + radius * angle.sin())
        };
        match game.click_at(now, x, y) {
            TargetClick::Hit { .. } => {}
            TargetClick::Miss { .. } => misses += 1,
            TargetClick::Finished { .. } => {
                let run = game
                    .result(created_at)
                    .context("finished board produced no result")?;
                return Ok(TargetPlay {
                    run,
                    misses,
                    finished_at: now,
                });
            }
            TargetClick::Ignored => bail!("click at ({x:.1}, {y:.1}) ignored mid-run"),
        }
    }
    bail!("board not cleared within {MAX_TARGET_CLICKS} clicks")
}

/// Summary of one climb.
#[derive(Debug, Clone)]
pub struct ClimbPlay {
    pub run: Option<ClimbRunResult>,
    pub frames: u64,
    pub last_score: u64,
    pub score_drops: u32,
    pub coin_events: u32,
}

/// Hold a direction for a few dozen frames at a time with jittery frame
/// times until the run ends or `frame_budget` frames have passed.
pub fn play_climb(
    game: &mut SkyJump,
    rng: &mut BotRng,
    frame_budget: u64,
    created_at: i64,
) -> ClimbPlay {
    game.start();
    let mut last_score = 0;
    let mut score_drops = 0;
    let mut coin_events = 0;
    let mut input = InputState::NONE;
    let mut hold = 0_u32;

    while game.state() == SkyState::Running && game.frames() < frame_budget {
        if hold == 0 {
            input = match rng.gen_range(0..5) {
                0 | 1 => InputState::LEFT,
                2 | 3 => InputState::RIGHT,
                _ => InputState::NONE,
            };
            hold = rng.gen_range(6..45);
        }
        hold -= 1;

        let dt = if rng.gen_bool(HITCH_CHANCE) {
            rng.gen_range(0.05..0.25)
        } else {
            rng.gen_range(0.012..0.024)
        };
        let report = game.step(dt, input);
        if report.score < last_score {
            score_drops += 1;
        }
        coin_events += u32::try_from(
            report
                .events
                .iter()
                .filter(|event| matches!(event, FrameEvent::CoinCollected { .. }))
                .count(),
        )
        .unwrap_or(u32::MAX);
        last_score = report.score;
    }

    ClimbPlay {
        run: game.result(created_at),
        frames: game.frames(),
        last_score,
        score_drops,
        coin_events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relax_game::{MemoryStore, RelaxEngine, SkyJumpTuning, Viewport};

    fn engine() -> RelaxEngine<MemoryStore> {
        RelaxEngine::for_day(
            Locale::En,
            DailyKey::from_ymd(2024, 3, 1).unwrap(),
            MemoryStore::new(),
        )
    }

    #[test]
    fn stream_seeds_depend_on_domain_tag() {
        let a = derive_stream_seed(1337, b"relax-reaction-sprint");
        let b = derive_stream_seed(1337, b"relax-sky-jump");
        assert_ne!(a, b);
        assert_eq!(a, derive_stream_seed(1337, b"relax-reaction-sprint"));
        assert_ne!(a, derive_stream_seed(1338, b"relax-reaction-sprint"));
    }

    #[test]
    fn iteration_seeds_differ_per_iteration_and_locale() {
        let day = DailyKey::from_ymd(2024, 3, 1).unwrap();
        assert_ne!(
            iteration_seed(day, Locale::Fr, 0),
            iteration_seed(day, Locale::Fr, 1)
        );
        assert_ne!(
            iteration_seed(day, Locale::Fr, 0),
            iteration_seed(day, Locale::En, 0)
        );
    }

    #[test]
    fn reaction_bot_totals_add_up() {
        let engine = engine();
        let mut rng = bot_rng(7, GameKind::ReactionSprint);
        let play = play_reaction(&mut engine.reaction_sprint(), &mut rng, 0).unwrap();
        assert_eq!(play.reactions.len(), 5);
        let expected = play.reactions.iter().sum::<f64>() + f64::from(play.false_starts) * 200.0;
        assert!((play.run.total_duration_ms - expected).abs() < 1e-6);
        assert_eq!(play.run.false_start_count, play.false_starts);
    }

    #[test]
    fn target_bot_clears_the_board() {
        let engine = engine();
        let mut rng = bot_rng(7, GameKind::TargetFrenzy);
        let play = play_target(&mut engine.target_frenzy().unwrap(), &mut rng, 0).unwrap();
        assert_eq!(play.run.hit_count, 20);
        assert_eq!(play.run.miss_count, play.misses);
    }

    #[test]
    fn climb_bot_respects_the_frame_budget() {
        let engine = engine();
        let mut game = engine
            .sky_jump(Viewport::FALLBACK, SkyJumpTuning::touch())
            .unwrap();
        let mut rng = bot_rng(7, GameKind::SkyJump);
        let play = play_climb(&mut game, &mut rng, 120, 0);
        assert!(play.frames <= 120);
        assert_eq!(play.score_drops, 0);
    }
}
