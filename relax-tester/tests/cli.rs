use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "relax-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_games_writes_output() {
    let exe = env!("CARGO_BIN_EXE_relax-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-games", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available games"));
    assert!(content.contains("relax-reaction-sprint"));
}

#[test]
fn cli_runs_timed_games_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_relax-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--games",
            "reaction,target",
            "--dates",
            "2024-03-01",
            "--locales",
            "all",
            "--iterations",
            "3",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Relax Games Automated Tester"));

    let content = std::fs::read_to_string(output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let scenarios = report.as_array().expect("array");
    assert_eq!(scenarios.len(), 4);
    assert!(scenarios.iter().all(|s| s["passed"] == true));
    assert!(scenarios.iter().all(|s| s["iterations_run"] == 3));
}

#[test]
fn cli_rejects_malformed_dates() {
    let exe = env!("CARGO_BIN_EXE_relax-tester");
    let output = Command::new(exe)
        .args(["--games", "reaction", "--dates", "2024-13-40"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse date"));
}

#[test]
fn cli_rejects_unknown_games() {
    let exe = env!("CARGO_BIN_EXE_relax-tester");
    let output = Command::new(exe)
        .args(["--games", "snake", "--dates", "2024-03-01"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unrecognized game"));
}
