//! Domain types and validators for the deployment configuration.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use campfire_common::IdlePolicy;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::placement::{Hint, PlacementSpec};
use crate::domain::save_store::{DEFAULT_TRANSITION_DAYS, is_valid_store_name};
use crate::domain::security::{DEFAULT_POLICY_DESCRIPTION, PortRule, Protocol};

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "save_store.name",
    "game.use_experimental_build",
    "activation.enabled",
    "activation.timeout_seconds",
    "instance.type",
    "instance.vpc_id",
    "instance.subnet_id",
    "instance.availability_zone",
    "idle.threshold_minutes",
    "idle.grace_minutes",
];

pub const DEFAULT_INSTANCE_TYPE: &str = "c6i.xlarge";
pub const DEFAULT_IMAGE: &str =
    "resolve:ssm:/aws/service/canonical/ubuntu/server/20.04/stable/current/amd64/hvm/ebs-gp2/ami-id";
pub const MAX_ACTIVATION_TIMEOUT_SECS: u64 = 900;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.campfire/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Resource name prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,
    #[serde(default)]
    pub game: GameConfig,
    pub instance: InstanceConfig,
    #[serde(default)]
    pub security_group: SecurityGroupConfig,
    #[serde(default)]
    pub save_store: SaveStoreConfig,
    #[serde(default)]
    pub startup: StartupConfig,
    #[serde(default)]
    pub idle: IdleConfig,
    #[serde(default)]
    pub activation: ActivationConfig,
}

/// Target account and region. Empty means "whatever the platform CLI uses".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfrastructureConfig {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub use_experimental_build: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    #[serde(rename = "type")]
    pub instance_type: String,
    pub image: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub elastic_ip: ElasticIpConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub root_volume: RootVolumeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootVolumeConfig {
    #[serde(default = "default_root_size")]
    pub size_gb: u32,
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

impl Default for RootVolumeConfig {
    fn default() -> Self {
        Self {
            size_gb: default_root_size(),
            device_name: default_device_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticIpConfig {
    #[serde(default = "default_true")]
    pub allow_reassociation: bool,
}

impl Default for ElasticIpConfig {
    fn default() -> Self {
        Self {
            allow_reassociation: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupConfig {
    #[serde(default = "default_policy_description")]
    pub description: String,
    #[serde(default)]
    pub ports: BTreeMap<String, PortConfig>,
}

impl Default for SecurityGroupConfig {
    fn default() -> Self {
        Self {
            description: default_policy_description(),
            ports: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    pub port: u16,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveStoreConfig {
    /// Existing store to adopt; empty creates a new one.
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_transition_days")]
    pub transition_after_days: u32,
}

impl Default for SaveStoreConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            transition_after_days: default_transition_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupConfig {
    #[serde(default)]
    pub cli_tool: CliToolConfig,
    #[serde(default = "default_install_script")]
    pub install_script_path: PathBuf,
    #[serde(default = "default_auto_shutdown_script")]
    pub auto_shutdown_script_path: PathBuf,
    /// Bucket holding startup artifacts; empty derives one from the prefix.
    #[serde(default)]
    pub asset_bucket: String,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            cli_tool: CliToolConfig::default(),
            install_script_path: default_install_script(),
            auto_shutdown_script_path: default_auto_shutdown_script(),
            asset_bucket: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliToolConfig {
    /// Install the platform CLI at boot; otherwise only check it exists.
    #[serde(default = "default_true")]
    pub install: bool,
}

impl Default for CliToolConfig {
    fn default() -> Self {
        Self { install: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleConfig {
    #[serde(default = "default_threshold_minutes")]
    pub threshold_minutes: u64,
    #[serde(default = "default_grace_minutes")]
    pub grace_minutes: u64,
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            threshold_minutes: default_threshold_minutes(),
            grace_minutes: default_grace_minutes(),
            poll_seconds: default_poll_seconds(),
        }
    }
}

impl IdleConfig {
    #[must_use]
    pub fn policy(&self) -> IdlePolicy {
        IdlePolicy {
            threshold: Duration::from_secs(self.threshold_minutes * 60),
            grace: Duration::from_secs(self.grace_minutes * 60),
            poll_interval: Duration::from_secs(self.poll_seconds),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_activation_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_activation_description")]
    pub description: String,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_seconds: default_activation_timeout(),
            description: default_activation_description(),
        }
    }
}

fn default_prefix() -> String {
    "Satisfactory".to_string()
}

fn default_root_size() -> u32 {
    15
}

fn default_device_name() -> String {
    "/dev/sda1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_policy_description() -> String {
    DEFAULT_POLICY_DESCRIPTION.to_string()
}

fn default_transition_days() -> u32 {
    DEFAULT_TRANSITION_DAYS
}

fn default_install_script() -> PathBuf {
    PathBuf::from("scripts/install.sh")
}

fn default_auto_shutdown_script() -> PathBuf {
    PathBuf::from("scripts/auto-shutdown.sh")
}

fn default_threshold_minutes() -> u64 {
    20
}

fn default_grace_minutes() -> u64 {
    5
}

fn default_poll_seconds() -> u64 {
    60
}

fn default_activation_timeout() -> u64 {
    10
}

fn default_activation_description() -> String {
    "Trigger function to start server".to_string()
}

// ── Derived views ────────────────────────────────────────────────────────────

impl DeploymentConfig {
    /// The configuration written by `campfire config init`.
    #[must_use]
    pub fn sample() -> Self {
        let ports = [
            ("game", 7777, Protocol::Udp),
            ("api", 7777, Protocol::Tcp),
            ("beacon", 15000, Protocol::Udp),
            ("query", 15777, Protocol::Udp),
        ]
        .into_iter()
        .map(|(name, port, protocol)| (name.to_string(), PortConfig { port, protocol }))
        .collect();

        Self {
            prefix: default_prefix(),
            infrastructure: InfrastructureConfig::default(),
            game: GameConfig::default(),
            instance: InstanceConfig {
                instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
                image: DEFAULT_IMAGE.to_string(),
                vpc_id: String::new(),
                subnet_id: String::new(),
                availability_zone: String::new(),
                storage: StorageConfig::default(),
                elastic_ip: ElasticIpConfig::default(),
            },
            security_group: SecurityGroupConfig {
                description: default_policy_description(),
                ports,
            },
            save_store: SaveStoreConfig::default(),
            startup: StartupConfig::default(),
            idle: IdleConfig::default(),
            activation: ActivationConfig::default(),
        }
    }

    #[must_use]
    pub fn placement(&self) -> PlacementSpec {
        PlacementSpec::from_config(
            &self.instance.vpc_id,
            &self.instance.subnet_id,
            &self.instance.availability_zone,
        )
    }

    #[must_use]
    pub fn store_hint(&self) -> Hint<String> {
        Hint::from_config(&self.save_store.name)
    }

    /// Configured ports as a rule set, verbatim.
    #[must_use]
    pub fn port_rules(&self) -> BTreeSet<PortRule> {
        self.security_group
            .ports
            .iter()
            .map(|(name, p)| PortRule::new(name.clone(), p.port, p.protocol))
            .collect()
    }

    /// The game port the idle monitor watches: the `game` rule if present,
    /// otherwise the first UDP rule.
    #[must_use]
    pub fn game_port(&self) -> Option<u16> {
        self.security_group
            .ports
            .get("game")
            .or_else(|| {
                self.security_group
                    .ports
                    .values()
                    .find(|p| p.protocol == Protocol::Udp)
            })
            .map(|p| p.port)
    }

    /// Artifact bucket: configured, or `<prefix>-assets[-<account>-<region>]`.
    #[must_use]
    pub fn asset_bucket(&self) -> String {
        let configured = self.startup.asset_bucket.trim();
        if !configured.is_empty() {
            return configured.to_string();
        }
        let mut name = format!("{}-assets", self.prefix.to_ascii_lowercase());
        let infra = &self.infrastructure;
        if !infra.account.is_empty() && !infra.region.is_empty() {
            name.push_str(&format!("-{}-{}", infra.account, infra.region));
        }
        name
    }

    #[must_use]
    pub fn activation_timeout(&self) -> Duration {
        Duration::from_secs(self.activation.timeout_seconds)
    }

    /// Checks every rule at once and reports all violations together.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing each problem on its own line.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.prefix.trim().is_empty() {
            problems.push("prefix must not be empty".to_string());
        }
        if self.instance.instance_type.trim().is_empty() {
            problems.push("instance.type is required".to_string());
        }
        if self.instance.image.trim().is_empty() {
            problems.push("instance.image is required".to_string());
        }
        if self.instance.storage.root_volume.size_gb == 0 {
            problems.push("instance.storage.root_volume.size_gb must be at least 1".to_string());
        }
        for (name, port) in &self.security_group.ports {
            if port.port == 0 {
                problems.push(format!("security_group.ports.{name}.port must not be 0"));
            }
        }
        if let Hint::Explicit(name) = self.store_hint()
            && !is_valid_store_name(&name)
        {
            problems.push(format!("save_store.name '{name}' is not a valid store name"));
        }
        if self.save_store.transition_after_days == 0 {
            problems.push("save_store.transition_after_days must be at least 1".to_string());
        }
        if self.idle.threshold_minutes == 0
            || self.idle.grace_minutes == 0
            || self.idle.poll_seconds == 0
        {
            problems.push("idle durations must be greater than 0".to_string());
        }
        if !(1..=MAX_ACTIVATION_TIMEOUT_SECS).contains(&self.activation.timeout_seconds) {
            problems.push(format!(
                "activation.timeout_seconds must be between 1 and {MAX_ACTIVATION_TIMEOUT_SECS}"
            ));
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(
                problems
                    .iter()
                    .map(|p| format!("  - {p}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
            .into())
        }
    }

    /// Applies a whitelisted `key = value` setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not settable or the value does not parse.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_config_key(key)?;
        validate_config_value(key, value)?;
        match key {
            "save_store.name" => value.clone_into(&mut self.save_store.name),
            "game.use_experimental_build" => {
                self.game.use_experimental_build = parse_bool(key, value)?;
            }
            "activation.enabled" => self.activation.enabled = parse_bool(key, value)?,
            "activation.timeout_seconds" => {
                self.activation.timeout_seconds = parse_number(key, value)?;
            }
            "instance.type" => value.clone_into(&mut self.instance.instance_type),
            "instance.vpc_id" => value.clone_into(&mut self.instance.vpc_id),
            "instance.subnet_id" => value.clone_into(&mut self.instance.subnet_id),
            "instance.availability_zone" => {
                value.clone_into(&mut self.instance.availability_zone);
            }
            "idle.threshold_minutes" => self.idle.threshold_minutes = parse_number(key, value)?,
            "idle.grace_minutes" => self.idle.grace_minutes = parse_number(key, value)?,
            _ => unreachable!("key validated against VALID_CONFIG_KEYS"),
        }
        Ok(())
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    match key {
        "game.use_experimental_build" | "activation.enabled" => {
            parse_bool(key, value)?;
        }
        "activation.timeout_seconds" => {
            let secs: u64 = parse_number(key, value)?;
            if !(1..=MAX_ACTIVATION_TIMEOUT_SECS).contains(&secs) {
                return Err(invalid(key, value, &format!("1-{MAX_ACTIVATION_TIMEOUT_SECS}")));
            }
        }
        "idle.threshold_minutes" | "idle.grace_minutes" => {
            let minutes: u64 = parse_number(key, value)?;
            if minutes == 0 {
                return Err(invalid(key, value, "a whole number of minutes, at least 1"));
            }
        }
        "save_store.name" => {
            if !value.trim().is_empty() && !is_valid_store_name(value.trim()) {
                return Err(invalid(
                    key,
                    value,
                    "3-63 lowercase letters, digits, dots or hyphens (empty to create a new store)",
                ));
            }
        }
        "instance.type" => {
            if value.trim().is_empty() {
                return Err(invalid(key, value, "a non-empty instance type, e.g. c6i.xlarge"));
            }
        }
        _ => {}
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(key, value, "true, false")),
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| invalid(key, value, "a whole number"))
}

fn invalid(key: &str, value: &str, valid: &str) -> anyhow::Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        valid: valid.to_string(),
    }
    .into()
}

// ── Unit tests ───────────────────────────────────────────────────────────────
