use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn popcorn_run_quickstart() {
    let mut cmd = Command::cargo_bin("popcorn").expect("binary exists");
    cmd.arg("run").arg("demos/quickstart.pc");
    cmd.assert()
        .success()
        .stdout("Hello from Popcorn!\n10\n10\n9\ntwo is bigger\n");
}

#[test]
fn popcorn_eval_snippet() {
    let mut cmd = Command::cargo_bin("popcorn").expect("binary exists");
    cmd.arg("eval").arg("1 2 + 3 * print");
    cmd.assert().success().stdout("9\n");
}

#[test]
fn failing_line_continues_and_sets_exit_status() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("broken.pc");
    fs::write(&script, "1 print\nmissing\n2 print\n").expect("write script");

    let mut cmd = Command::cargo_bin("popcorn").expect("binary exists");
    cmd.arg("run").arg(&script);
    cmd.assert()
        .failure()
        .stdout("1\n2\n")
        .stderr(predicate::str::contains("line 2: UnknownFunction"));
}

#[test]
fn halt_on_error_skips_remaining_lines() {
    let mut cmd = Command::cargo_bin("popcorn").expect("binary exists");
    cmd.arg("--halt-on-error")
        .arg("eval")
        .arg("1 print\nmissing\n2 print");
    cmd.assert().failure().stdout("1\n");
}

#[test]
fn parse_error_reports_and_runs_nothing() {
    let mut cmd = Command::cargo_bin("popcorn").expect("binary exists");
    cmd.arg("eval").arg("1 print\n{ 2 print");
    cmd.assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("missing closing bracket"));
}

#[test]
fn step_limit_flag_stops_runaway_recursion() {
    let mut cmd = Command::cargo_bin("popcorn").expect("binary exists");
    cmd.args(["--step-limit", "500", "eval"])
        .arg("\"loop\" 0 { loop } def\nloop\n\"done\" print");
    cmd.assert()
        .failure()
        .stdout("done\n")
        .stderr(predicate::str::contains("StepLimit"));
}
