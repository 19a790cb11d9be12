//! Selects which platform the power commands talk to.

use std::path::Path;

use anyhow::{Context, Result, bail};
use campfire_common::{InstanceId, PlatformState, PowerControl, ShutdownFlag};

use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::inventory::InventoryBackend;
use crate::infra::power::AwsCliPowerControl;

/// `inventory` (default) or `aws`.
pub const PLATFORM_ENV: &str = "CAMPFIRE_PLATFORM";

/// Where cloud-init records the id of the instance it booted.
pub const CLOUD_INIT_INSTANCE_ID: &str = "/var/lib/cloud/data/instance-id";

/// Read an instance id written by cloud-init.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not hold a valid id.
pub fn read_instance_id(path: &Path) -> Result<InstanceId> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read instance id from {}", path.display()))?;
    InstanceId::parse(raw.trim())
        .with_context(|| format!("invalid instance id in {}", path.display()))
}

/// Power backend for `start`, `stop` and `status`.
pub enum PowerBackend {
    Inventory(InventoryBackend),
    Aws(AwsCliPowerControl<TokioCommandRunner>),
}

impl PowerBackend {
    /// Backend named by `$CAMPFIRE_PLATFORM`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown platform name, or if the inventory
    /// path cannot be resolved.
    pub fn from_env(region: Option<String>) -> Result<Self> {
        let name = std::env::var(PLATFORM_ENV).unwrap_or_default();
        Self::named(&name, region)
    }

    /// # Errors
    ///
    /// Returns an error for an unknown platform name.
    pub fn named(name: &str, region: Option<String>) -> Result<Self> {
        match name.trim() {
            "" | "inventory" => Ok(Self::Inventory(InventoryBackend::new()?)),
            "aws" => Ok(Self::Aws(AwsCliPowerControl::new(
                TokioCommandRunner::default(),
                region,
            ))),
            other => bail!("unknown platform '{other}' (expected 'inventory' or 'aws')"),
        }
    }
}

impl ShutdownFlag for PowerBackend {
    async fn shutdown_pending(&self, instance: &InstanceId) -> Result<bool> {
        match self {
            Self::Inventory(b) => b.shutdown_pending(instance).await,
            Self::Aws(b) => b.shutdown_pending(instance).await,
        }
    }

    async fn set_shutdown_pending(&self, instance: &InstanceId, pending: bool) -> Result<()> {
        match self {
            Self::Inventory(b) => b.set_shutdown_pending(instance, pending).await,
            Self::Aws(b) => b.set_shutdown_pending(instance, pending).await,
        }
    }
}

impl PowerControl for PowerBackend {
    async fn start(&self, instance: &InstanceId) -> Result<()> {
        match self {
            Self::Inventory(b) => b.start(instance).await,
            Self::Aws(b) => b.start(instance).await,
        }
    }

    async fn stop(&self, instance: &InstanceId) -> Result<()> {
        match self {
            Self::Inventory(b) => b.stop(instance).await,
            Self::Aws(b) => b.stop(instance).await,
        }
    }

    async fn describe(&self, instance: &InstanceId) -> Result<PlatformState> {
        match self {
            Self::Inventory(b) => b.describe(instance).await,
            Self::Aws(b) => b.describe(instance).await,
        }
    }
}
