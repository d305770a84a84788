//! End-to-end tests for the movieshop-etl binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::path::Path;

fn etl(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("movieshop-etl").unwrap();
    cmd.current_dir(dir)
        .env("MOVIESHOP_RAW_PATH", dir.join("raw"))
        .env("MOVIESHOP_BRONZE_ROOT", dir.join("bronze"))
        .env("MOVIESHOP_SILVER_ROOT", dir.join("silver"))
        .env_remove("MOVIESHOP_DATA_SOURCE")
        .env_remove("MOVIESHOP_MATCH_KEY")
        .env("LOG_LEVEL", "warn");
    cmd
}

fn write_raw(dir: &Path) {
    let raw = dir.join("raw");
    std::fs::create_dir_all(&raw).unwrap();
    let movies = json!({"movie": [
        {"Id": "5", "Title": "X", "Budget": 500000, "RunTime": 90},
        {"Id": 8, "Title": "Y", "Budget": 2000000, "RunTime": -30}
    ]});
    std::fs::write(raw.join("movies.json"), movies.to_string()).unwrap();
}

#[test]
fn test_help() {
    let dir = tempfile::tempdir().unwrap();
    etl(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("repair-quarantine"));
}

#[test]
fn test_missing_subcommand() {
    let dir = tempfile::tempdir().unwrap();
    etl(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("A subcommand is required"));
}

#[test]
fn test_run_show_and_repair() {
    let dir = tempfile::tempdir().unwrap();
    write_raw(dir.path());

    etl(dir.path())
        .args(["run", "--entity", "movies"])
        .assert()
        .success()
        .stdout(predicate::str::contains("movies_delta"))
        .stdout(predicate::str::contains("Quarantined: 1"));

    etl(dir.path())
        .args(["show", "movies_bronze", "--status", "quarantine"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"quarantine\""))
        .stdout(predicate::str::contains("\"RunTime\":-30"));

    etl(dir.path())
        .arg("repair-quarantine")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"Repaired:\s+1").unwrap());

    etl(dir.path())
        .args(["show", "movies_delta"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"runtime\":30"));
}

#[test]
fn test_missing_raw_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    etl(dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ingestion failed"));
}

#[test]
fn test_tables_empty() {
    let dir = tempfile::tempdir().unwrap();
    etl(dir.path())
        .arg("tables")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tables registered"));
}
