mod logic;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use relax_game::GameKind;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::{LogicTester, resolve_dates, resolve_games, resolve_locales, scenarios_for};
use util::split_csv;

#[derive(Debug, Parser)]
#[command(name = "relax-tester", version = "0.1.0")]
#[command(
    about = "Automated QA testing for the relaxation mini-games - deterministic bot runs and invariant checks"
)]
struct Args {
    /// Games to run (comma-separated, or `all`)
    #[arg(long, default_value = "all")]
    games: String,

    /// List all available games and exit
    #[arg(long)]
    list_games: bool,

    /// Days to test: `today`, YYYY-MM-DD or YYYY-MM-DD..YYYY-MM-DD (comma-separated)
    #[arg(long, default_value = "today")]
    dates: String,

    /// Locales to test (comma-separated, or `all`)
    #[arg(long, default_value = "fr,en")]
    locales: String,

    /// Number of bot runs per scenario
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_games(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let games = resolve_games(&split_csv(&args.games))?;
    let days = resolve_dates(&split_csv(&args.dates))?;
    let locales = resolve_locales(&split_csv(&args.locales))?;
    let scenarios = scenarios_for(&games, &days, &locales);
    log::info!(
        "running {} scenario(s) x {} iteration(s)",
        scenarios.len(),
        args.iterations
    );

    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());
    let results = LogicTester::new(args.verbose).run_scenarios(&scenarios, args.iterations);

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_games(args: &Args) -> Result<bool> {
    if !args.list_games {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available games:")?;
    for game in GameKind::ALL {
        writeln!(output_target.writer(), "  {:25} - {}", game.prefix(), game.label())?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎮 Relax Games Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
            output_target.flush_inner()?;
            return Ok(());
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Relax Games Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(&mut output_target, results, duration)?;
            }
        }
    }

    let duration = start_time.elapsed();
    writeln!(&mut output_target)?;
    writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ScenarioResult;
    use std::time::Duration;

    fn base_args() -> Args {
        Args {
            games: "reaction".to_string(),
            list_games: false,
            dates: "2024-03-01".to_string(),
            locales: "fr".to_string(),
            iterations: 1,
            report: "json".to_string(),
            verbose: false,
            output: None,
        }
    }

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Reaction Sprint 2024-03-01 [fr]".to_string(),
            passed,
            iterations_run: 1,
            successful_iterations: usize::from(passed),
            failures: Vec::new(),
            average_duration: Duration::ZERO,
            performance_data: Vec::new(),
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("relax-tester-{}-{name}", std::process::id()))
    }

    #[test]
    fn args_parse_defaults() {
        let args = Args::try_parse_from(["relax-tester"]).unwrap();
        assert_eq!(args.games, "all");
        assert_eq!(args.dates, "today");
        assert_eq!(args.locales, "fr,en");
        assert_eq!(args.iterations, 10);
        assert_eq!(args.report, "console");
        assert!(Args::try_parse_from(["relax-tester", "--report", "csv"]).is_err());
    }

    #[test]
    fn write_reports_emits_json_output() {
        let temp = temp_file("empty.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert_eq!(content.trim(), "[]");
    }

    #[test]
    fn write_reports_emits_json_for_results() {
        let temp = temp_file("full.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(true)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        let parsed: Vec<ScenarioResult> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed[0].scenario_name, "Reaction Sprint 2024-03-01 [fr]");
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let temp = temp_file("empty.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("No scenarios executed"));
    }

    #[test]
    fn write_reports_console_includes_total_time() {
        let temp = temp_file("console.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(false)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Logic Test Results Summary"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn maybe_list_games_writes_output() {
        let temp = temp_file("games.txt");
        let args = Args {
            list_games: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_games(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available games"));
        assert!(content.contains("Sky Jump"));
    }

    #[test]
    fn maybe_list_games_returns_false_when_disabled() {
        assert!(!maybe_list_games(&base_args()).unwrap());
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
