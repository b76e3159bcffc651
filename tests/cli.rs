// Copyright 2025 Martin Pool

//! End-to-end tests: run the `mutation-engine` binary against a small,
//! well-tested fixture crate copied into a tempdir.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Copy a fixture crate under `tests/fixtures/<name>` into a fresh tempdir.
fn copy_fixture(name: &str) -> TempDir {
    let tmp = TempDir::new().expect("create tempdir");
    let src = format!("tests/fixtures/{name}");
    cp_r::CopyOptions::new()
        .copy_tree(src, tmp.path())
        .expect("copy fixture tree");
    tmp
}

#[test]
fn well_tested_fixture_reports_all_mutants_killed() {
    let tmp = copy_fixture("small_well_tested");
    let assert = Command::cargo_bin("mutation-engine")
        .expect("find mutation-engine binary")
        .arg("--dir")
        .arg(tmp.path())
        .assert();
    assert.success().stdout(predicate::str::contains("killed"));
}

#[test]
fn check_only_skips_the_test_suite() {
    let tmp = copy_fixture("small_well_tested");
    Command::cargo_bin("mutation-engine")
        .expect("find mutation-engine binary")
        .arg("--dir")
        .arg(tmp.path())
        .arg("--check")
        .assert()
        .success();

    let baseline_log = fs::read_to_string(
        tmp.path()
            .join("mutants.out")
            .join("log")
            .join("baseline.log"),
    )
    .expect("read baseline log");
    assert!(
        !baseline_log.contains("running 1 test") && !baseline_log.contains("test result:"),
        "--check should run `cargo check`, not the test binary: {baseline_log}"
    );
}

#[test]
fn output_directory_is_created_with_logs() {
    let tmp = copy_fixture("small_well_tested");
    Command::cargo_bin("mutation-engine")
        .expect("find mutation-engine binary")
        .arg("--dir")
        .arg(tmp.path())
        .assert()
        .success();
    let log_dir = tmp.path().join("mutants.out").join("log");
    assert!(log_dir.is_dir(), "expected a log directory under mutants.out");
    let entries: Vec<_> = fs::read_dir(&log_dir)
        .expect("read log dir")
        .collect::<Result<_, _>>()
        .expect("read log dir entries");
    assert!(!entries.is_empty(), "expected at least one log file");
}
