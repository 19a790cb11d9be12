//! Integration tests for the deploy lifecycle: plan, deploy, outputs,
//! status, stop and start against a seeded inventory.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;

use crate::sandbox::Sandbox;

fn deployed() -> (Sandbox, serde_json::Value) {
    let sandbox = Sandbox::new();
    sandbox.init().seed_inventory();
    let outputs = sandbox.json(&["deploy", "--yes"]);
    (sandbox, outputs)
}

// ---------------------------------------------------------------------------
// Before any deploy
// ---------------------------------------------------------------------------

#[test]
fn test_outputs_before_deploy_fails() {
    Sandbox::new()
        .cmd()
        .arg("outputs")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No deployment found"));
}

#[test]
fn test_status_before_deploy_json_code() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .cmd()
        .args(["status", "--json"])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["code"], "not_deployed");
}

#[test]
fn test_deploy_without_config_fails() {
    Sandbox::new()
        .cmd()
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("campfire config init"));
}

// ---------------------------------------------------------------------------
// `campfire plan`
// ---------------------------------------------------------------------------

#[test]
fn test_plan_shows_placement_policy_and_store() {
    let sandbox = Sandbox::new();
    sandbox.init().seed_inventory();
    sandbox
        .cmd()
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("vpc-default"))
        .stdout(predicate::str::contains("subnet-a eu-west-1a (placement)"))
        .stdout(predicate::str::contains("7777/udp"))
        .stdout(predicate::str::contains("create:"))
        .stdout(predicate::str::contains("A new instance will be launched"));
}

#[test]
fn test_plan_changes_nothing() {
    let sandbox = Sandbox::new();
    sandbox.init().seed_inventory();
    let before = sandbox.inventory();
    sandbox.cmd().arg("plan").assert().success();
    assert_eq!(sandbox.inventory(), before);
    assert!(!sandbox.state_path().exists());
}

#[test]
fn test_plan_user_data_prints_boot_script() {
    let sandbox = Sandbox::new();
    sandbox.init().seed_inventory();
    sandbox
        .cmd()
        .args(["plan", "--user-data"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("#!/bin/bash\n"));
}

#[test]
fn test_plan_with_missing_network_fails_with_code() {
    let sandbox = Sandbox::new();
    sandbox.init().seed_inventory();
    sandbox
        .cmd()
        .args(["config", "set", "instance.vpc_id", "vpc-123"])
        .assert()
        .success();

    let output = sandbox
        .cmd()
        .args(["plan", "--json"])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["code"], "network_not_found");
    assert!(value["message"].as_str().unwrap().contains("vpc-123"));
}

#[test]
fn test_plan_with_missing_script_names_it() {
    let sandbox = Sandbox::new();
    sandbox.init().seed_inventory();
    std::fs::remove_file(sandbox.path().join("scripts/auto-shutdown.sh")).unwrap();
    sandbox
        .cmd()
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("auto-shutdown script"));
}

// ---------------------------------------------------------------------------
// `campfire deploy` and `campfire outputs`
// ---------------------------------------------------------------------------

#[test]
fn test_deploy_reports_outputs_and_records_state() {
    let (sandbox, outputs) = deployed();

    assert_eq!(outputs["public_ip"], "203.0.113.10");
    assert!(outputs["instance_id"].as_str().unwrap().starts_with("i-"));
    assert_eq!(outputs["save_store_lifecycle"], "owned");
    assert_eq!(outputs["activation_target"], outputs["instance_id"]);
    assert!(
        outputs["pin_store_hint"]
            .as_str()
            .unwrap()
            .starts_with("campfire config set save_store.name ")
    );
    assert!(sandbox.state_path().exists());

    let inventory = sandbox.inventory();
    assert_eq!(inventory["instances"].as_array().unwrap().len(), 1);
    assert_eq!(inventory["stores"][0]["versioned"], true);
    assert_eq!(inventory["artifacts"].as_array().unwrap().len(), 2);
}

#[test]
fn test_outputs_repeat_deploy_outputs() {
    let (sandbox, outputs) = deployed();
    assert_eq!(sandbox.json(&["outputs"]), outputs);
    sandbox
        .cmd()
        .arg("outputs")
        .assert()
        .success()
        .stdout(predicate::str::contains("203.0.113.10"));
}

#[test]
fn test_redeploy_without_changes_keeps_everything() {
    let (sandbox, first) = deployed();
    let second = sandbox.json(&["deploy"]);
    assert_eq!(second["instance_id"], first["instance_id"]);
    assert_eq!(second["save_store"], first["save_store"]);
    assert_eq!(sandbox.inventory()["stores"].as_array().unwrap().len(), 1);
}

#[test]
fn test_startup_change_replaces_instance_keeping_ip_and_store() {
    let (sandbox, first) = deployed();
    sandbox
        .cmd()
        .args(["config", "set", "game.use_experimental_build", "true"])
        .assert()
        .success();

    sandbox
        .cmd()
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("will be replaced"));

    let second = sandbox.json(&["deploy", "--yes"]);
    assert_ne!(second["instance_id"], first["instance_id"]);
    assert_eq!(second["public_ip"], first["public_ip"]);
    assert_eq!(second["save_store"], first["save_store"]);
}

#[test]
fn test_pinned_store_is_adopted_on_redeploy() {
    let (sandbox, first) = deployed();
    let store = first["save_store"].as_str().unwrap();
    sandbox
        .cmd()
        .args(["config", "set", "save_store.name", store])
        .assert()
        .success();

    let second = sandbox.json(&["deploy", "--yes"]);
    assert_eq!(second["save_store"], store);
    assert_eq!(second["save_store_lifecycle"], "adopted");
    assert!(second.get("pin_store_hint").is_none());
}

// ---------------------------------------------------------------------------
// Power commands
// ---------------------------------------------------------------------------

#[test]
fn test_status_reports_running_after_deploy() {
    let (sandbox, outputs) = deployed();
    let status = sandbox.json(&["status"]);
    assert_eq!(status["power"], "running");
    assert_eq!(status["instance_id"], outputs["instance_id"]);
    assert_eq!(status["instance_type"], "c6i.xlarge");
}

#[test]
fn test_stop_then_start_cycles_power() {
    let (sandbox, _) = deployed();

    assert_eq!(sandbox.json(&["stop"])["state"], "stopping");
    assert_eq!(sandbox.json(&["status"])["power"], "stopped");
    assert_eq!(sandbox.json(&["stop"])["state"], "stopped");

    let started = sandbox.json(&["start"]);
    assert_eq!(started["outcome"], "accepted");
    assert_eq!(started["previous"], "stopped");
    assert_eq!(started["current"], "starting");
    assert_eq!(sandbox.json(&["status"])["power"], "running");
}

#[test]
fn test_start_when_running_is_a_no_op() {
    let (sandbox, _) = deployed();
    sandbox
        .cmd()
        .arg("start")
        .assert()
        .success()
        .stdout(predicate::str::contains("Server already running"));
}

#[test]
fn test_start_with_activation_disabled_fails() {
    let sandbox = Sandbox::new();
    sandbox.init().seed_inventory();
    sandbox
        .cmd()
        .args(["config", "set", "activation.enabled", "false"])
        .assert()
        .success();
    sandbox.json(&["deploy", "--yes"]);

    sandbox
        .cmd()
        .arg("start")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Activation is disabled"));
}

#[test]
fn test_unknown_platform_is_rejected() {
    let (sandbox, _) = deployed();
    sandbox
        .cmd()
        .arg("stop")
        .env("CAMPFIRE_PLATFORM", "gcp")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown platform 'gcp'"));
}
