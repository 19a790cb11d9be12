//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `campfire_common` — never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::Result;
use campfire_common::InstanceId;

use crate::domain::DeploymentConfig;
use crate::domain::compute::{InstanceDeclaration, StaticAddress};
use crate::domain::deployment::{DeployProgress, DeploymentState};
use crate::domain::placement::{Network, Subnet};
use crate::domain::save_store::SaveStore;
use crate::domain::startup::Artifact;

pub use campfire_common::PowerControl;

// ── Provisioning backend ports ────────────────────────────────────────────────

/// Read-only view of the platform's networks.
#[allow(async_fn_in_trait)]
pub trait NetworkDirectory {
    /// Look up a network by id.
    async fn find_network(&self, id: &str) -> Result<Option<Network>>;
    /// The account's default network, if it has one.
    async fn default_network(&self) -> Result<Option<Network>>;
    /// Every subnet of the network.
    async fn subnets(&self, network_id: &str) -> Result<Vec<Subnet>>;
}

/// Object stores for save data and startup artifacts.
#[allow(async_fn_in_trait)]
pub trait StoreCatalog {
    /// Look up a store by name, returning its current policy as recorded.
    async fn find_store(&self, name: &str) -> Result<Option<SaveStore>>;
    /// Create a new store with the given policy.
    async fn create_store(&self, store: &SaveStore) -> Result<()>;
    /// Upload a startup artifact. Uploading the same key twice is a no-op.
    async fn publish_artifact(&self, artifact: &Artifact) -> Result<()>;
}

/// Instance and address operations.
#[allow(async_fn_in_trait)]
pub trait ComputeBackend {
    /// Launch an instance from the declaration with the given user data.
    async fn launch(&self, declaration: &InstanceDeclaration, user_data: &str)
    -> Result<InstanceId>;
    /// Terminate an instance. Its root volume survives.
    async fn terminate(&self, instance: &InstanceId) -> Result<()>;
    /// Reserve a new static public address.
    async fn allocate_address(&self, allow_reassociation: bool) -> Result<StaticAddress>;
    /// Look up a previously allocated address.
    async fn find_address(&self, allocation_id: &str) -> Result<Option<StaticAddress>>;
    /// Bind the address to the instance.
    async fn associate_address(&self, address: &StaticAddress, instance: &InstanceId)
    -> Result<()>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
}

// ── On-instance ports ─────────────────────────────────────────────────────────

/// Counts players currently connected to the game server.
#[allow(async_fn_in_trait)]
pub trait ActivitySource {
    async fn active_players(&self) -> Result<u32>;
}

/// Powers off the machine the process runs on.
#[allow(async_fn_in_trait)]
pub trait HostPower {
    async fn power_off(&self) -> Result<()>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── State, Config and Filesystem Ports ────────────────────────────────────────

/// Abstracts deployment state persistence (load/save), including the
/// checkpoint of an unfinished deploy.
#[allow(async_fn_in_trait)]
pub trait DeploymentStateStore {
    /// Load the current deployment state, returning `None` if nothing is deployed.
    async fn load_async(&self) -> Result<Option<DeploymentState>>;
    /// Persist the given deployment state.
    async fn save_async(&self, state: &DeploymentState) -> Result<()>;
    /// Load the checkpoint left by a deploy that did not finish.
    async fn load_progress_async(&self) -> Result<Option<DeployProgress>>;
    /// Checkpoint what an unfinished deploy has created so far.
    async fn save_progress_async(&self, progress: &DeployProgress) -> Result<()>;
    /// Drop the checkpoint once the deploy is recorded.
    async fn clear_progress_async(&self) -> Result<()>;
}

/// Abstracts loading and saving the deployment configuration.
pub trait ConfigStore {
    /// Load the configuration. Fails if none has been written yet.
    fn load(&self) -> Result<DeploymentConfig>;
    /// Persist the configuration.
    fn save(&self, config: &DeploymentConfig) -> Result<()>;
    /// Where the configuration lives.
    fn path(&self) -> Result<PathBuf>;
}

/// Abstracts file hashing operations.
pub trait FileHasher {
    /// Compute the SHA-256 hash of a file.
    fn sha256_file(&self, path: &Path) -> Result<String>;
}
