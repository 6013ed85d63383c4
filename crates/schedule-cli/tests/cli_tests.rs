//! Integration tests for the `schedule` CLI binary.
//!
//! These drive the expand, check, calendar and import subcommands through the
//! built binary, covering stdin piping, exit codes and error reporting.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

fn weekly_rule_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/weekly_rule.json")
}

fn existing_rules_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/existing_rules.json")
}

fn room_conflict_path() -> &'static str {
    concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/candidate_room_conflict.json"
    )
}

fn clear_candidate_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/candidate_clear.json")
}

fn import_rules_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/import_rules.json")
}

fn look_ahead_config_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/look_ahead.json")
}

fn schedule() -> Command {
    Command::cargo_bin("schedule").unwrap()
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout must be JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// Expand subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn expand_first_week_of_february() {
    let output = schedule()
        .args(["expand", "-i", weekly_rule_path()])
        .args(["--from", "2024-02-01", "--to", "2024-02-07"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let occurrences = stdout_json(&output);
    let occurrences = occurrences.as_array().unwrap();

    // Thu 1st and Mon 5th, two slots each.
    assert_eq!(occurrences.len(), 4);
    assert_eq!(occurrences[0]["date"], "2024-02-01");
    assert_eq!(occurrences[0]["startTime"]["hour"], 9);
    assert_eq!(occurrences[0]["endTime"]["hour"], 10);
    assert_eq!(occurrences[3]["date"], "2024-02-05");
    assert_eq!(occurrences[3]["startTime"]["hour"], 17);
}

#[test]
fn expand_from_stdin_grouped_by_day() {
    let rule = std::fs::read_to_string(weekly_rule_path()).unwrap();

    let output = schedule()
        .args(["expand", "--from", "2024-02-01", "--to", "2024-02-29", "--by-day"])
        .write_stdin(rule)
        .output()
        .unwrap();

    assert!(output.status.success());
    let days = stdout_json(&output);
    let days = days.as_array().unwrap();

    // Every Monday and Thursday in February 2024.
    assert_eq!(days.len(), 8);
    assert_eq!(days[0]["timeSlots"].as_array().unwrap().len(), 2);
}

#[test]
fn expand_to_output_file() {
    let dir = std::env::temp_dir().join("schedule_cli_expand_output");
    std::fs::create_dir_all(&dir).unwrap();
    let out = dir.join("occurrences.json");

    schedule()
        .args(["expand", "-i", weekly_rule_path(), "-o", out.to_str().unwrap()])
        .args(["--from", "2024-02-01", "--to", "2024-02-01"])
        .assert()
        .success();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written.as_array().unwrap().len(), 2);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn expand_rejects_inverted_window() {
    schedule()
        .args(["expand", "-i", weekly_rule_path()])
        .args(["--from", "2024-02-10", "--to", "2024-02-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to expand rule"));
}

#[test]
fn expand_rejects_malformed_date_argument() {
    schedule()
        .args(["expand", "-i", weekly_rule_path()])
        .args(["--from", "2024-13-01", "--to", "2024-02-01"])
        .assert()
        .failure();
}

#[test]
fn expand_rejects_unknown_recurrence_kind() {
    let rule = r#"{
        "classType": "Yoga",
        "instructorRef": "ana",
        "roomRef": "studio-1",
        "durationMinutes": 60,
        "startDate": "2024-02-01",
        "endDate": "2024-02-29",
        "recurrenceKind": "YEARLY",
        "timeSlots": ["09:00"]
    }"#;

    schedule()
        .args(["expand", "--from", "2024-02-01", "--to", "2024-02-29"])
        .write_stdin(rule)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse rule"));
}

#[test]
fn expand_missing_file_reports_path() {
    schedule()
        .args(["expand", "-i", "/nonexistent/rule.json"])
        .args(["--from", "2024-02-01", "--to", "2024-02-29"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/nonexistent/rule.json"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Check subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn check_reports_room_conflict_and_exits_nonzero() {
    let output = schedule()
        .args(["check", "-i", room_conflict_path(), "--existing", existing_rules_path()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let conflict = stdout_json(&output);
    assert_eq!(conflict["kind"], "room");
    assert_eq!(conflict["date"], "2024-02-05");
    assert_eq!(
        conflict["existingRule"],
        "8f0c1a52-6d1e-4c1b-9a57-3b9f1e2d4c11"
    );
    assert_eq!(conflict["overlapMinutes"], 30);
}

#[test]
fn check_all_lists_every_overlapping_monday() {
    let output = schedule()
        .args(["check", "-i", room_conflict_path(), "--existing", existing_rules_path()])
        .arg("--all")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let conflicts = stdout_json(&output);
    let dates: Vec<&str> = conflicts
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, ["2024-02-05", "2024-02-12", "2024-02-19", "2024-02-26"]);
}

#[test]
fn check_back_to_back_class_is_clear() {
    schedule()
        .args(["check", "-i", clear_candidate_path(), "--existing", existing_rules_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("null"));
}

#[test]
fn check_with_look_ahead_ignores_later_conflicts() {
    // Feb 20..=23 holds no Monday, so the clash on Mondays is out of view.
    schedule()
        .args(["check", "-i", room_conflict_path(), "--existing", existing_rules_path()])
        .args(["--horizon-days", "3", "--today", "2024-02-20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("null"));
}

#[test]
fn check_with_look_ahead_config_file() {
    let output = schedule()
        .args(["check", "-i", room_conflict_path(), "--existing", existing_rules_path()])
        .args(["--config", look_ahead_config_path(), "--today", "2024-02-17"])
        .output()
        .unwrap();

    // Feb 17..=20 reaches Monday the 19th.
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_json(&output)["date"], "2024-02-19");
}

#[test]
fn check_rejects_invalid_config() {
    let dir = std::env::temp_dir().join("schedule_cli_bad_config");
    std::fs::create_dir_all(&dir).unwrap();
    let config = dir.join("config.json");
    std::fs::write(&config, r#"{ "horizon": { "mode": "forever" } }"#).unwrap();

    schedule()
        .args(["check", "-i", room_conflict_path(), "--existing", existing_rules_path()])
        .args(["--config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config"));

    let _ = std::fs::remove_dir_all(&dir);
}

// ─────────────────────────────────────────────────────────────────────────────
// Calendar subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn calendar_merges_rules_chronologically() {
    let output = schedule()
        .args(["calendar", "-i", existing_rules_path()])
        .args(["--from", "2024-02-05", "--to", "2024-02-06"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let events = stdout_json(&output);
    let summary: Vec<(&str, &str)> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| (e["date"].as_str().unwrap(), e["classType"].as_str().unwrap()))
        .collect();

    // Spin runs every other day from Feb 1: the 5th is on, the 6th is off.
    assert_eq!(
        summary,
        [("2024-02-05", "Morning Yoga"), ("2024-02-05", "Spin")]
    );
}

#[test]
fn calendar_empty_window_outside_rules() {
    schedule()
        .args(["calendar", "-i", existing_rules_path()])
        .args(["--from", "2025-01-01", "--to", "2025-01-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Import subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn import_skips_conflicting_rule() {
    let output = schedule()
        .args(["import", "-i", import_rules_path()])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Rejected Advanced Yoga"));
    assert!(stderr.contains("Accepted 2 rule(s), rejected 1"));

    let accepted = stdout_json(&output);
    let names: Vec<&str> = accepted
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["classType"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Morning Yoga", "Strength Workshop"]);
}

#[test]
fn import_rejects_invalid_rule() {
    let rules = r#"[{
        "classType": "Yoga",
        "instructorRef": "ana",
        "roomRef": "studio-1",
        "durationMinutes": 0,
        "startDate": "2024-02-01",
        "endDate": "2024-02-29",
        "timeSlots": ["09:00"]
    }]"#;

    schedule()
        .arg("import")
        .write_stdin(rules)
        .assert()
        .success()
        .stderr(predicate::str::contains("Rejected Yoga"))
        .stderr(predicate::str::contains("Accepted 0 rule(s), rejected 1"));
}

// ─────────────────────────────────────────────────────────────────────────────
// General
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn help_lists_subcommands() {
    schedule()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("expand"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("calendar"))
        .stdout(predicate::str::contains("import"));
}
