use anyhow::{Context, Result, bail, ensure};
use chrono::NaiveDate;
use relax_game::{DailyKey, GameKind, Locale};

/// Longest span a single `a..b` date range may expand to.
const MAX_RANGE_DAYS: i64 = 366;

/// One (game, day, locale) combination the tester exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub game: GameKind,
    pub day: DailyKey,
    pub locale: Locale,
}

impl Scenario {
    #[must_use]
    pub fn name(&self) -> String {
        format!("{} {} [{}]", self.game.label(), self.day, self.locale)
    }
}

/// Resolve `--games` tokens. `all` expands to every game.
pub fn resolve_games(tokens: &[String]) -> Result<Vec<GameKind>> {
    let mut games = Vec::new();
    for token in tokens {
        if token.eq_ignore_ascii_case("all") {
            games.extend(GameKind::ALL);
            continue;
        }
        let Some(game) = GameKind::parse(token) else {
            bail!("Unrecognized game: {token}");
        };
        games.push(game);
    }
    dedup_in_order(&mut games);
    ensure!(!games.is_empty(), "no games selected");
    Ok(games)
}

/// Resolve `--dates` tokens: `today`, `YYYY-MM-DD`, or an inclusive
/// `YYYY-MM-DD..YYYY-MM-DD` range.
pub fn resolve_dates(tokens: &[String]) -> Result<Vec<DailyKey>> {
    let mut days = Vec::new();
    for token in tokens {
        if token.eq_ignore_ascii_case("today") {
            days.push(DailyKey::today());
            continue;
        }
        if let Some((from, to)) = token.split_once("..") {
            days.extend(expand_range(parse_day(from)?, parse_day(to)?)?);
            continue;
        }
        days.push(parse_day(token)?);
    }
    dedup_in_order(&mut days);
    if days.is_empty() {
        days.push(DailyKey::today());
    }
    log::debug!("resolved {} test day(s)", days.len());
    Ok(days)
}

/// Resolve `--locales` tokens. `all` expands to every supported locale.
pub fn resolve_locales(tokens: &[String]) -> Result<Vec<Locale>> {
    let mut locales = Vec::new();
    for token in tokens {
        if token.eq_ignore_ascii_case("all") {
            locales.extend(Locale::ALL);
            continue;
        }
        let Some(locale) = Locale::parse(token) else {
            bail!("Unsupported locale: {token}");
        };
        locales.push(locale);
    }
    dedup_in_order(&mut locales);
    if locales.is_empty() {
        locales.push(Locale::default());
    }
    Ok(locales)
}

/// Cartesian product in game, day, locale order.
#[must_use]
pub fn scenarios_for(games: &[GameKind], days: &[DailyKey], locales: &[Locale]) -> Vec<Scenario> {
    let mut scenarios = Vec::with_capacity(games.len() * days.len() * locales.len());
    for &game in games {
        for &day in days {
            for &locale in locales {
                scenarios.push(Scenario { game, day, locale });
            }
        }
    }
    scenarios
}

fn parse_day(token: &str) -> Result<DailyKey> {
    token
        .parse::<DailyKey>()
        .with_context(|| format!("failed to parse date: {token}"))
}

fn expand_range(from: DailyKey, to: DailyKey) -> Result<Vec<DailyKey>> {
    let (start, end): (NaiveDate, NaiveDate) = (from.date(), to.date());
    let span = end.signed_duration_since(start).num_days();
    ensure!(span >= 0, "date range {from}..{to} runs backwards");
    ensure!(
        span < MAX_RANGE_DAYS,
        "date range {from}..{to} exceeds {MAX_RANGE_DAYS} days"
    );
    Ok(start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(DailyKey::from_date)
        .collect())
}

fn dedup_in_order<T: PartialEq + Copy>(items: &mut Vec<T>) {
    let mut seen: Vec<T> = Vec::with_capacity(items.len());
    items.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(*item);
            true
        }
    });
}
