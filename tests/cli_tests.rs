#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use std::fs;
use tempfile::NamedTempFile;

const SCENARIO: &str = r#"{
  "config": { "project_start": "2025-10-29T08:00:00" },
  "activities": [
    { "id": "A", "name": "Prepare", "duration": 2 },
    { "id": "B", "name": "Lift", "duration": 3, "predecessors": ["A"] },
    { "id": "C", "name": "Ballast", "duration": 1, "predecessors": ["B", "GHOST"] }
  ]
}"#;

fn scenario_file() -> NamedTempFile {
    let tmp = NamedTempFile::new().expect("create temp file");
    fs::write(tmp.path(), SCENARIO).expect("write scenario");
    tmp
}

#[allow(deprecated)]
fn run_cli(args: &[&str], script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.args(args).write_stdin(script.to_string()).assert()
}

#[test]
fn cli_requires_a_scenario_before_computing() {
    run_cli(&[], "compute\nquit\n")
        .success()
        .stdout(str_contains("No scenario loaded."));
}

#[test]
fn cli_computes_loaded_scenario() {
    let tmp = scenario_file();
    let path = tmp.path().to_string_lossy().to_string();
    run_cli(&[&path], "compute\nquit\n")
        .success()
        .stdout(str_contains("Loaded 3 activities"))
        .stdout(str_contains("activities=3, critical=3"))
        .stdout(str_contains("crit_path=A->B->C"));
}

#[test]
fn cli_anchor_and_shift() {
    let tmp = scenario_file();
    let script = format!(
        "load {}\nanchor B 2025-10-29T12:00\nshift B\nquit\n",
        tmp.path().to_string_lossy()
    );
    run_cli(&[], &script)
        .success()
        .stdout(str_contains("anchor=B"))
        .stdout(str_contains("start=2025-10-29 10:00"))
        .stdout(str_contains("A -2.00h -> +0.00h"));
}

#[test]
fn cli_lists_missing_predecessor_warnings() {
    let tmp = scenario_file();
    let path = tmp.path().to_string_lossy().to_string();
    run_cli(&[&path], "compute\nwarnings\nquit\n")
        .success()
        .stdout(str_contains("predecessor 'GHOST' not found"));
}

#[test]
fn cli_saves_computed_schedule_as_csv() {
    let tmp = scenario_file();
    let out = NamedTempFile::new().expect("create output file");
    let script = format!(
        "load {}\ncompute\nsave csv {}\nquit\n",
        tmp.path().to_string_lossy(),
        out.path().to_string_lossy()
    );
    run_cli(&[], &script).success().stdout(str_contains("Saved."));
    let written = fs::read_to_string(out.path()).expect("read csv");
    assert!(written.contains("2025-10-29 13:00"));
}

#[test]
fn cli_reports_unknown_anchor() {
    let tmp = scenario_file();
    let path = tmp.path().to_string_lossy().to_string();
    run_cli(&[&path], "anchor Z 2025-10-29T12:00\nquit\n")
        .success()
        .stdout(str_contains("anchor activity 'Z' not found"));
}
