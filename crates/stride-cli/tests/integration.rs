#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn stride(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stride").unwrap();
    cmd.current_dir(dir.path()).env("STRIDE_ROOT", dir.path());
    cmd
}

// ---------------------------------------------------------------------------
// stride init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_directory_tree() {
    let dir = TempDir::new().unwrap();
    stride(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .stride/config.yaml"));

    assert!(dir.path().join(".stride/users").is_dir());
    assert!(dir.path().join(".stride/config.yaml").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    stride(&dir).arg("init").assert().success();
    stride(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .stride/config.yaml"));
}

// ---------------------------------------------------------------------------
// stride config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_default_is_clean() {
    let dir = TempDir::new().unwrap();
    stride(&dir).arg("init").assert().success();
    stride(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_fails_on_errors() {
    let dir = TempDir::new().unwrap();
    stride(&dir).arg("init").assert().success();
    std::fs::write(
        dir.path().join(".stride/config.yaml"),
        "oracle:\n  models: []\n",
    )
    .unwrap();
    stride(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn config_show_json() {
    let dir = TempDir::new().unwrap();
    stride(&dir).arg("init").assert().success();
    let out = stride(&dir)
        .args(["config", "show", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["server"]["port"], 3210);
}

#[test]
fn config_without_init_fails() {
    let dir = TempDir::new().unwrap();
    stride(&dir)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("stride init"));
}

// ---------------------------------------------------------------------------
// stride ask
// ---------------------------------------------------------------------------

#[test]
fn ask_rejects_bad_choice() {
    let dir = TempDir::new().unwrap();
    stride(&dir).arg("init").assert().success();
    stride(&dir)
        .args(["ask", "dokonči návyky", "--choice", "0=některé"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --choice scope"));
}
