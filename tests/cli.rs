//! Integration tests for the `nearest` binary.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn nearest() -> Command {
    let mut cmd = Command::cargo_bin("nearest").unwrap();
    cmd.env_remove("GEO_NEAREST_CHUNK_SIZE").env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_cli_help() {
    nearest()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--chunk-size"));
}

#[test]
fn test_processes_files_in_sorted_order() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("b.csv"),
        "callsign,latitude,longitude\nA,0,0\nB,0,1\nC,0,10\n",
    )
    .unwrap();
    fs::write(dir.path().join("a.csv"), "callsign,latitude,longitude\nX,10,10\nY,10,11\n").unwrap();

    let output = nearest()
        .arg(dir.path())
        .args(["--chunk-size", "2", "--threads", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 7);
    assert!(lines[0].starts_with("Processed CSV file '") && lines[0].ends_with("a.csv':"));
    assert!(lines[1].starts_with("X Y "));
    assert!(lines[2].starts_with("Y X "));
    assert!(lines[3].ends_with("b.csv':"));
    assert_eq!(lines[4], format!("A B {}", geo_nearest::haversine_km(0.0, 0.0, 0.0, 1.0)));
    assert!(lines[5].starts_with("B A "));
    assert!(lines[6].starts_with("C B 1000.75"));
}

#[test]
fn test_malformed_source_is_skipped() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("1_bad.csv"), "A,0,0\nB,north,1\n").unwrap();
    fs::write(dir.path().join("2_good.csv"), "A,0,0\nB,0,1\n").unwrap();

    nearest()
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1_bad.csv").not())
        .stdout(predicate::str::contains("2_good.csv"))
        .stdout(predicate::str::contains("A B "));
}

#[test]
fn test_accumulate_carries_results_across_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.csv"), "X,0,0\nY,0,1\n").unwrap();
    // Same neighbor, twice as far.
    fs::write(dir.path().join("b.csv"), "X,0,0\nY,0,2\n").unwrap();

    // One shared table: the second file names the same neighbor, so the first
    // distance is kept.
    nearest()
        .arg(dir.path())
        .arg("--accumulate")
        .assert()
        .success()
        .stdout(predicate::str::contains("X Y 111.19").count(2))
        .stdout(predicate::str::contains("222.38").not());

    // A fresh table per file reports the new distance.
    nearest()
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("X Y 111.19").count(1))
        .stdout(predicate::str::contains("X Y 222.38").count(1));
}

#[test]
fn test_missing_directory_fails() {
    let dir = tempdir().unwrap();
    nearest()
        .arg(dir.path().join("nope"))
        .assert()
        .failure();
}

#[test]
fn test_zero_chunk_size_rejected() {
    let dir = tempdir().unwrap();
    nearest()
        .arg(dir.path())
        .args(["--chunk-size", "0"])
        .assert()
        .failure();
}
