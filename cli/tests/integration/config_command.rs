//! Integration tests for `campfire config`.
//!
//! Every test points `CAMPFIRE_CONFIG` at a temp path so nothing reads or
//! writes `~/.campfire/config.yaml`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;

use crate::sandbox::Sandbox;

// ---------------------------------------------------------------------------
// Subcommand registration
// ---------------------------------------------------------------------------

#[test]
fn test_config_help_lists_subcommands() {
    Sandbox::new()
        .cmd()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("set"));
}

// ---------------------------------------------------------------------------
// `campfire config init` / `show` / `path`
// ---------------------------------------------------------------------------

#[test]
fn test_config_show_without_file_points_at_init() {
    Sandbox::new()
        .cmd()
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("campfire config init"));
}

#[test]
fn test_config_init_writes_sample() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote sample configuration"));

    let content = std::fs::read_to_string(sandbox.config_path()).expect("config written");
    assert!(content.contains("c6i.xlarge"), "got:\n{content}");
    assert!(content.contains("7777"), "got:\n{content}");
}

#[test]
fn test_config_init_refuses_to_overwrite_without_force() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["config", "init"]).assert().success();
    sandbox
        .cmd()
        .args(["config", "set", "instance.type", "t3.large"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    let content = std::fs::read_to_string(sandbox.config_path()).unwrap();
    assert!(content.contains("t3.large"));

    sandbox
        .cmd()
        .args(["config", "init", "--force"])
        .assert()
        .success();
    let content = std::fs::read_to_string(sandbox.config_path()).unwrap();
    assert!(!content.contains("t3.large"));
}

#[test]
fn test_config_show_displays_yaml_under_path_header() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["config", "init"]).assert().success();
    sandbox
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration ("))
        .stdout(predicate::str::contains("instance:"))
        .stdout(predicate::str::contains("security_group:"));
}

#[test]
fn test_config_show_json_is_the_config() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["config", "init"]).assert().success();
    let value = sandbox.json(&["config", "show"]);
    assert_eq!(value["instance"]["type"], "c6i.xlarge");
    assert_eq!(value["activation"]["enabled"], true);
    assert_eq!(value["security_group"]["ports"]["game"]["port"], 7777);
}

#[test]
fn test_config_path_prints_override() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.yaml"));
    let value = sandbox.json(&["config", "path"]);
    assert_eq!(
        value["path"].as_str().unwrap(),
        sandbox.config_path().to_string_lossy()
    );
}

// ---------------------------------------------------------------------------
// `campfire config set`
// ---------------------------------------------------------------------------

#[test]
fn test_config_set_persists_value() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["config", "init"]).assert().success();
    sandbox
        .cmd()
        .args(["config", "set", "save_store.name", "my-saves"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set save_store.name = my-saves"));

    let value = sandbox.json(&["config", "show"]);
    assert_eq!(value["save_store"]["name"], "my-saves");
}

#[test]
fn test_config_set_unknown_key_lists_valid_keys() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["config", "init"]).assert().success();
    sandbox
        .cmd()
        .args(["config", "set", "instance.image", "ami-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting: instance.image"))
        .stderr(predicate::str::contains("activation.enabled"));
}

#[test]
fn test_config_set_invalid_value_is_rejected_and_not_written() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["config", "init"]).assert().success();
    let before = std::fs::read_to_string(sandbox.config_path()).unwrap();

    sandbox
        .cmd()
        .args(["config", "set", "activation.timeout_seconds", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value for activation.timeout_seconds"));

    assert_eq!(std::fs::read_to_string(sandbox.config_path()).unwrap(), before);
}

#[test]
fn test_config_set_json_error_has_code() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["config", "init"]).assert().success();
    let output = sandbox
        .cmd()
        .args(["config", "set", "game.use_experimental_build", "maybe", "--json"])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).expect("JSON error");
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "invalid_config");
}

// ---------------------------------------------------------------------------
// `campfire config validate`
// ---------------------------------------------------------------------------

#[test]
fn test_config_validate_accepts_sample() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["config", "init"]).assert().success();
    sandbox
        .cmd()
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
    assert_eq!(sandbox.json(&["config", "validate"])["valid"], true);
}

#[test]
fn test_config_validate_reports_every_problem() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.config_path(),
        "instance:\n  type: ''\n  image: ''\nactivation:\n  timeout_seconds: 0\n",
    )
    .unwrap();
    sandbox
        .cmd()
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("instance.type is required"))
        .stderr(predicate::str::contains("instance.image is required"))
        .stderr(predicate::str::contains("activation.timeout_seconds"));
}

#[test]
fn test_config_with_unparseable_yaml_fails() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.config_path(), "instance: [not, a, map\n").unwrap();
    sandbox
        .cmd()
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot parse"));
}
