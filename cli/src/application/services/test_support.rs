//! Shared test helpers for application service tests.
//!
//! `FakePlatform` is an in-memory provisioning backend that records every
//! call, so tests can assert both results and side effects.

use std::cell::{Cell, RefCell};
use std::net::Ipv4Addr;
use std::path::Path;

use anyhow::{Result, bail};
use campfire_common::{InstanceId, PlatformState, PowerControl, ShutdownFlag};

use crate::application::ports::{
    ComputeBackend, DeploymentStateStore, FileHasher, NetworkDirectory, ProgressReporter,
    StoreCatalog,
};
use crate::domain::DeployError;
use crate::domain::compute::{InstanceDeclaration, StaticAddress};
use crate::domain::deployment::{DeployProgress, DeploymentState};
use crate::domain::placement::{Network, Subnet};
use crate::domain::save_store::SaveStore;
use crate::domain::startup::Artifact;

pub fn subnet(id: &str, network: &str, az: &str, public: bool) -> Subnet {
    Subnet {
        id: id.to_string(),
        network_id: network.to_string(),
        availability_zone: az.to_string(),
        public,
    }
}

#[derive(Default)]
pub struct FakePlatform {
    pub networks: Vec<Network>,
    pub subnets: Vec<Subnet>,
    pub stores: RefCell<Vec<SaveStore>>,
    pub created_stores: RefCell<Vec<String>>,
    pub published: RefCell<Vec<String>>,
    pub launched: RefCell<Vec<(InstanceId, String)>>,
    pub terminated: RefCell<Vec<InstanceId>>,
    pub addresses: RefCell<Vec<StaticAddress>>,
    pub associations: RefCell<Vec<(String, InstanceId)>>,
    pub power: Cell<Option<PlatformState>>,
    pub starts: Cell<u32>,
    pub stops: Cell<u32>,
    pub shutdown_flag: Cell<bool>,
    /// Makes `allocate_address` fail as if the pool were exhausted.
    pub no_addresses: Cell<bool>,
    pub flag_writes: RefCell<Vec<bool>>,
}

impl FakePlatform {
    /// A default network with two public subnets and one private one.
    pub fn with_default_network() -> Self {
        Self {
            networks: vec![Network {
                id: "vpc-default".to_string(),
                is_default: true,
            }],
            subnets: vec![
                subnet("subnet-b", "vpc-default", "eu-west-1b", true),
                subnet("subnet-a", "vpc-default", "eu-west-1a", true),
                subnet("subnet-p", "vpc-default", "eu-west-1a", false),
            ],
            ..Self::default()
        }
    }

    pub fn with_store(self, store: SaveStore) -> Self {
        self.stores.borrow_mut().push(store);
        self
    }

    pub fn with_power(self, state: PlatformState) -> Self {
        self.power.set(Some(state));
        self
    }
}

impl NetworkDirectory for FakePlatform {
    async fn find_network(&self, id: &str) -> Result<Option<Network>> {
        Ok(self.networks.iter().find(|n| n.id == id).cloned())
    }

    async fn default_network(&self) -> Result<Option<Network>> {
        Ok(self.networks.iter().find(|n| n.is_default).cloned())
    }

    async fn subnets(&self, network_id: &str) -> Result<Vec<Subnet>> {
        Ok(self
            .subnets
            .iter()
            .filter(|s| s.network_id == network_id)
            .cloned()
            .collect())
    }
}

impl StoreCatalog for FakePlatform {
    async fn find_store(&self, name: &str) -> Result<Option<SaveStore>> {
        Ok(self.stores.borrow().iter().find(|s| s.name == name).cloned())
    }

    async fn create_store(&self, store: &SaveStore) -> Result<()> {
        if self.stores.borrow().iter().any(|s| s.name == store.name) {
            bail!("store {} already exists", store.name);
        }
        self.stores.borrow_mut().push(store.clone());
        self.created_stores.borrow_mut().push(store.name.clone());
        Ok(())
    }

    async fn publish_artifact(&self, artifact: &Artifact) -> Result<()> {
        self.published.borrow_mut().push(artifact.uri());
        Ok(())
    }
}

impl ComputeBackend for FakePlatform {
    async fn launch(&self, _: &InstanceDeclaration, user_data: &str) -> Result<InstanceId> {
        let n = self.launched.borrow().len() + 1;
        let id = InstanceId::parse(&format!("i-{n:08x}"))?;
        self.launched
            .borrow_mut()
            .push((id.clone(), user_data.to_string()));
        self.power.set(Some(PlatformState::Pending));
        Ok(id)
    }

    async fn terminate(&self, instance: &InstanceId) -> Result<()> {
        self.terminated.borrow_mut().push(instance.clone());
        Ok(())
    }

    async fn allocate_address(&self, allow_reassociation: bool) -> Result<StaticAddress> {
        if self.no_addresses.get() {
            return Err(DeployError::NoAddressAvailable.into());
        }
        let n = self.addresses.borrow().len();
        let address = StaticAddress {
            allocation_id: format!("eipalloc-{n:04}"),
            public_ip: Ipv4Addr::new(203, 0, 113, u8::try_from(n + 10)?),
            allow_reassociation,
        };
        self.addresses.borrow_mut().push(address.clone());
        Ok(address)
    }

    async fn find_address(&self, allocation_id: &str) -> Result<Option<StaticAddress>> {
        Ok(self
            .addresses
            .borrow()
            .iter()
            .find(|a| a.allocation_id == allocation_id)
            .cloned())
    }

    async fn associate_address(&self, address: &StaticAddress, instance: &InstanceId) -> Result<()> {
        self.associations
            .borrow_mut()
            .push((address.allocation_id.clone(), instance.clone()));
        Ok(())
    }
}

impl ShutdownFlag for FakePlatform {
    async fn shutdown_pending(&self, _: &InstanceId) -> Result<bool> {
        Ok(self.shutdown_flag.get())
    }

    async fn set_shutdown_pending(&self, _: &InstanceId, pending: bool) -> Result<()> {
        self.shutdown_flag.set(pending);
        self.flag_writes.borrow_mut().push(pending);
        Ok(())
    }
}

impl PowerControl for &FakePlatform {
    async fn start(&self, _: &InstanceId) -> Result<()> {
        self.starts.set(self.starts.get() + 1);
        self.power.set(Some(PlatformState::Pending));
        Ok(())
    }

    async fn stop(&self, _: &InstanceId) -> Result<()> {
        self.stops.set(self.stops.get() + 1);
        self.power.set(Some(PlatformState::Stopping));
        Ok(())
    }

    async fn describe(&self, instance: &InstanceId) -> Result<PlatformState> {
        match self.power.get() {
            Some(state) => Ok(state),
            None => bail!("instance {instance} not found"),
        }
    }
}

/// Deployment state held in memory. Every checkpoint is also appended to
/// `checkpoints`.
#[derive(Default)]
pub struct MemoryState {
    pub saved: RefCell<Option<DeploymentState>>,
    pub progress: RefCell<Option<DeployProgress>>,
    pub checkpoints: RefCell<Vec<DeployProgress>>,
}

impl DeploymentStateStore for MemoryState {
    async fn load_async(&self) -> Result<Option<DeploymentState>> {
        Ok(self.saved.borrow().clone())
    }

    async fn save_async(&self, state: &DeploymentState) -> Result<()> {
        *self.saved.borrow_mut() = Some(state.clone());
        Ok(())
    }

    async fn load_progress_async(&self) -> Result<Option<DeployProgress>> {
        Ok(self.progress.borrow().clone())
    }

    async fn save_progress_async(&self, progress: &DeployProgress) -> Result<()> {
        *self.progress.borrow_mut() = Some(progress.clone());
        self.checkpoints.borrow_mut().push(progress.clone());
        Ok(())
    }

    async fn clear_progress_async(&self) -> Result<()> {
        self.progress.borrow_mut().take();
        Ok(())
    }
}

/// Hashes a path to a fixed digest derived from its file name.
pub struct NameHasher;

impl FileHasher for NameHasher {
    fn sha256_file(&self, path: &Path) -> Result<String> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("none");
        Ok(format!("{name:0>8}"))
    }
}

/// Collects reporter messages in order.
#[derive(Default)]
pub struct RecordingReporter {
    pub messages: RefCell<Vec<String>>,
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.messages.borrow_mut().push(format!("step: {message}"));
    }
    fn success(&self, message: &str) {
        self.messages.borrow_mut().push(format!("ok: {message}"));
    }
    fn warn(&self, message: &str) {
        self.messages.borrow_mut().push(format!("warn: {message}"));
    }
}
