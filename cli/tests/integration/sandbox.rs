//! Temporary home for one CLI run: config, state and inventory all live in
//! a single temp dir so tests never touch `~/.campfire`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

pub fn campfire() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("campfire"));
    cmd.env("NO_COLOR", "1");
    cmd
}

pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.yaml")
    }

    pub fn state_path(&self) -> PathBuf {
        self.path().join("state.json")
    }

    pub fn inventory_path(&self) -> PathBuf {
        self.path().join("inventory.json")
    }

    /// A `campfire` command wired to this sandbox.
    pub fn cmd(&self) -> Command {
        let mut cmd = campfire();
        cmd.env("CAMPFIRE_CONFIG", self.config_path())
            .env("CAMPFIRE_STATE", self.state_path())
            .env("CAMPFIRE_INVENTORY", self.inventory_path())
            .env("CAMPFIRE_PLATFORM", "inventory")
            .env_remove("CAMPFIRE_YES");
        cmd
    }

    /// Runs `args` with `--json` and parses stdout.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("valid JSON on stdout")
    }

    /// Writes the sample config plus both startup scripts next to it.
    pub fn init(&self) -> &Self {
        self.cmd().args(["config", "init"]).assert().success();
        let scripts = self.path().join("scripts");
        std::fs::create_dir_all(&scripts).unwrap();
        std::fs::write(scripts.join("install.sh"), "#!/bin/bash\necho install\n").unwrap();
        std::fs::write(scripts.join("auto-shutdown.sh"), "#!/bin/bash\necho idle\n").unwrap();
        self
    }

    /// A default network with two public subnets and one free address.
    pub fn seed_inventory(&self) -> &Self {
        let inventory = serde_json::json!({
            "networks": [{ "id": "vpc-default", "is_default": true }],
            "subnets": [
                { "id": "subnet-a", "network_id": "vpc-default", "availability_zone": "eu-west-1a", "public": true },
                { "id": "subnet-b", "network_id": "vpc-default", "availability_zone": "eu-west-1b", "public": true }
            ],
            "address_pool": ["203.0.113.10"]
        });
        std::fs::write(
            self.inventory_path(),
            serde_json::to_string_pretty(&inventory).unwrap(),
        )
        .unwrap();
        self
    }

    pub fn inventory(&self) -> serde_json::Value {
        let text = std::fs::read_to_string(self.inventory_path()).expect("inventory exists");
        serde_json::from_str(&text).expect("inventory is JSON")
    }
}
