/// The `erds` binary end to end on a small synthetic dataset.
mod common;

use std::path::Path;

use assert_cmd::Command;
use common::{tones, write_subject};
use predicates::prelude::*;

const SFREQ: f64 = 128.0;

fn erds() -> Command {
    Command::cargo_bin("erds").unwrap()
}

/// Subject 0 with 20 s per condition, analysed in 10 s windows.
fn dataset(dir: &Path) {
    let rest = tones(SFREQ, 20.0, &[("F3", 10.0, 20.0), ("F4", 10.0, 10.0)]);
    let task = tones(SFREQ, 20.0, &[("F3", 10.0, 10.0), ("F4", 10.0, 20.0)]);
    write_subject(dir, 0, &rest, &task);
}

fn analysis(cmd: &mut Command, dir: &Path) {
    cmd.arg("--data-dir")
        .arg(dir)
        .arg("--results-dir")
        .arg(dir.join("results"))
        .args(["--channels", "F3,F4", "--duration", "10", "--overlap", "5"]);
}

#[test]
fn help_describes_the_tool() {
    erds()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("event-related"))
        .stdout(predicate::str::contains("--data-dir"));
}

#[test]
fn subject_writes_figure_and_arrays() {
    let dir = tempfile::tempdir().unwrap();
    dataset(dir.path());
    let mut cmd = erds();
    cmd.args(["subject", "0", "--save-arrays"]);
    analysis(&mut cmd, dir.path());
    cmd.assert().success().stdout(predicate::str::contains("subject 00"));

    let figure = dir.path().join("results").join("subject00_erds.png");
    assert!(figure.metadata().unwrap().len() > 0);
    let map = erds::read_erds_map(&figure.with_extension("safetensors")).unwrap();
    assert_eq!(map.ch_names, vec!["F3", "F4"]);
}

#[test]
fn default_run_without_groups_warns() {
    let dir = tempfile::tempdir().unwrap();
    dataset(dir.path());
    let mut cmd = erds();
    analysis(&mut cmd, dir.path());
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("group analysis skipped"));
    assert!(dir.path().join("results").join("subject00_erds.png").is_file());
}

#[test]
fn missing_subject_fails_with_context() {
    let dir = tempfile::tempdir().unwrap();
    dataset(dir.path());
    let mut cmd = erds();
    cmd.args(["subject", "3"]);
    analysis(&mut cmd, dir.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("analysing subject 03"));
}

#[test]
fn groups_command_needs_a_csv() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = erds();
    cmd.arg("groups");
    analysis(&mut cmd, dir.path());
    cmd.assert().failure().stderr(predicate::str::contains("--groups"));
}

#[test]
fn info_lists_signals() {
    let dir = tempfile::tempdir().unwrap();
    dataset(dir.path());
    erds()
        .arg("info")
        .arg(dir.path().join("Subject00_1.edf"))
        .assert()
        .success()
        .stdout(predicate::str::contains("sfreq:      128 Hz"))
        .stdout(predicate::str::contains("F3"))
        .stdout(predicate::str::contains("2 (2 data)"));
}
