//! End-to-end tests for the `simplex` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn simplex() -> Command {
    Command::cargo_bin("simplex").expect("binary builds")
}

fn write_model(dir: &tempfile::TempDir, source: &str) -> std::path::PathBuf {
    let path = dir.path().join("model.sx");
    std::fs::write(&path, source).expect("writes model");
    path
}

#[test]
fn renders_a_box_to_stl() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(&dir, "product \"box\" { cuboid(1.0, 1.0, 1.0) }");
    let prefix = dir.path().join("out");
    simplex()
        .arg(&model)
        .arg("-o")
        .arg(&prefix)
        .assert()
        .success()
        .stdout(predicate::str::contains("out-box.stl"));
    let stl = std::fs::read_to_string(dir.path().join("out-box.stl")).expect("stl written");
    assert!(stl.starts_with("solid box\n"));
    assert!(stl.ends_with("endsolid box\n"));
}

#[test]
fn check_mode_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(&dir, "product \"box\" { cuboid(1.0, 1.0, 1.0) }");
    let prefix = dir.path().join("out");
    simplex().arg(&model).arg("-o").arg(&prefix).arg("--check").assert().success();
    assert!(!dir.path().join("out-box.stl").exists());
}

#[test]
fn dry_run_evaluates_but_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(&dir, "let zero = 0\nproduct \"bad\" { 1 / zero }");
    let prefix = dir.path().join("out");
    simplex()
        .arg(&model)
        .arg("-o")
        .arg(&prefix)
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("division by zero"));
}

#[test]
fn analysis_errors_fail_with_diagnostics() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(&dir, "product \"p\" { 1 + true }");
    simplex()
        .arg(&model)
        .assert()
        .failure()
        .stderr(predicate::str::contains("TypeMismatch"));
}

#[test]
fn json_errors_are_machine_readable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(&dir, "product \"p\" { missing }");
    simplex()
        .arg(&model)
        .arg("--json-errors")
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\": \"Undefined\""));
}

#[test]
fn selects_requested_product_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = write_model(&dir, "product \"a\" { 1 }\nproduct \"b\" { 2 }");
    let prefix = dir.path().join("out");
    simplex()
        .arg(&model)
        .arg("-o")
        .arg(&prefix)
        .arg("-p")
        .arg("b")
        .assert()
        .success();
    assert!(!dir.path().join("out-a.txt").exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("out-b.txt")).expect("txt written"),
        "2\n"
    );
}

#[test]
fn missing_file_is_a_plain_failure() {
    simplex()
        .arg("no-such-model.sx")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}
