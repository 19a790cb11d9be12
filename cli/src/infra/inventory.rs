//! File-backed platform inventory.
//!
//! `InventoryBackend` keeps networks, stores, instances and addresses in a
//! single JSON document. It stands in for the cloud account when
//! `CAMPFIRE_PLATFORM=inventory` (the default), which makes every command
//! runnable offline and gives the integration tests a real backend.
//!
//! Every mutation is a read-modify-write of the whole file on a blocking
//! thread, finished by an atomic rename.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use campfire_common::{InstanceId, PlatformState, PowerControl, ShutdownFlag};
use serde::{Deserialize, Serialize};

use crate::application::ports::{ComputeBackend, NetworkDirectory, StoreCatalog};
use crate::domain::DeployError;
use crate::domain::compute::{InstanceDeclaration, StaticAddress};
use crate::domain::ids::random_hex;
use crate::domain::placement::{Network, Subnet};
use crate::domain::save_store::SaveStore;
use crate::domain::startup::Artifact;
use crate::infra::fs::{path_from_env, sha256_str, write_atomic};

/// Overrides the inventory file location.
pub const INVENTORY_ENV: &str = "CAMPFIRE_INVENTORY";

/// The whole inventory document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub networks: Vec<Network>,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    #[serde(default)]
    pub stores: Vec<SaveStore>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub instances: Vec<InstanceRecord>,
    /// Public addresses that may still be allocated.
    #[serde(default)]
    pub address_pool: Vec<Ipv4Addr>,
    #[serde(default)]
    pub addresses: Vec<AddressRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: InstanceId,
    pub name: String,
    pub instance_type: String,
    pub image: String,
    pub subnet_id: String,
    pub user_data_sha256: String,
    pub state: PlatformState,
    /// Set while the idle monitor on the instance counts down to shutdown.
    #[serde(default)]
    pub shutdown_pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    #[serde(flatten)]
    pub address: StaticAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<InstanceId>,
}

impl Inventory {
    fn instance_mut(&mut self, id: &InstanceId) -> Result<&mut InstanceRecord> {
        self.instances
            .iter_mut()
            .find(|i| &i.id == id)
            .with_context(|| format!("instance {id} not found"))
    }
}

/// JSON inventory at `$CAMPFIRE_INVENTORY` or `~/.campfire/inventory.json`.
///
/// A missing file reads as an empty inventory.
#[derive(Debug, Clone)]
pub struct InventoryBackend {
    path: PathBuf,
}

impl InventoryBackend {
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(path_from_env(INVENTORY_ENV, "inventory.json")?))
    }

    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the whole inventory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn seed(&self, inventory: Inventory) -> Result<()> {
        self.update(move |inv| {
            *inv = inventory;
            Ok(())
        })
        .await
    }

    /// Snapshot of the current inventory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn snapshot(&self) -> Result<Inventory> {
        self.read(Inventory::clone).await
    }

    fn load_sync(path: &Path) -> Result<Inventory> {
        if !path.exists() {
            return Ok(Inventory::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading inventory {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing inventory {}", path.display()))
    }

    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inventory) -> T + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::load_sync(&path).map(|inv| f(&inv)))
            .await
            .context("inventory read task panicked")?
    }

    async fn update<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Inventory) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut inventory = Self::load_sync(&path)?;
            let value = f(&mut inventory)?;
            let content =
                serde_json::to_string_pretty(&inventory).context("serializing inventory")?;
            write_atomic(&path, &content)?;
            Ok(value)
        })
        .await
        .context("inventory write task panicked")?
    }

    async fn set_power(&self, instance: &InstanceId, target: PlatformState) -> Result<()> {
        let id = instance.clone();
        self.update(move |inv| {
            let record = inv.instance_mut(&id)?;
            if record.state == PlatformState::Terminated {
                bail!("instance {id} is terminated");
            }
            tracing::debug!(instance = %id, from = ?record.state, to = ?target, "inventory power change");
            record.state = target;
            if target != PlatformState::Running {
                record.shutdown_pending = false;
            }
            Ok(())
        })
        .await
    }
}

impl NetworkDirectory for InventoryBackend {
    async fn find_network(&self, id: &str) -> Result<Option<Network>> {
        let id = id.to_string();
        self.read(move |inv| inv.networks.iter().find(|n| n.id == id).cloned())
            .await
    }

    async fn default_network(&self) -> Result<Option<Network>> {
        self.read(|inv| inv.networks.iter().find(|n| n.is_default).cloned())
            .await
    }

    async fn subnets(&self, network_id: &str) -> Result<Vec<Subnet>> {
        let network_id = network_id.to_string();
        self.read(move |inv| {
            inv.subnets
                .iter()
                .filter(|s| s.network_id == network_id)
                .cloned()
                .collect()
        })
        .await
    }
}

impl StoreCatalog for InventoryBackend {
    async fn find_store(&self, name: &str) -> Result<Option<SaveStore>> {
        let name = name.to_string();
        self.read(move |inv| inv.stores.iter().find(|s| s.name == name).cloned())
            .await
    }

    async fn create_store(&self, store: &SaveStore) -> Result<()> {
        let store = store.clone();
        self.update(move |inv| {
            if inv.stores.iter().any(|s| s.name == store.name) {
                bail!("store {} already exists", store.name);
            }
            inv.stores.push(store);
            Ok(())
        })
        .await
    }

    async fn publish_artifact(&self, artifact: &Artifact) -> Result<()> {
        let artifact = artifact.clone();
        self.update(move |inv| {
            if !inv.artifacts.iter().any(|a| a.key == artifact.key && a.bucket == artifact.bucket) {
                inv.artifacts.push(artifact);
            }
            Ok(())
        })
        .await
    }
}

impl ComputeBackend for InventoryBackend {
    async fn launch(&self, declaration: &InstanceDeclaration, user_data: &str) -> Result<InstanceId> {
        let id = InstanceId::parse(&format!("i-{}", random_hex(17)))?;
        let record = InstanceRecord {
            id: id.clone(),
            name: declaration.name.clone(),
            instance_type: declaration.instance_type.clone(),
            image: declaration.image.clone(),
            subnet_id: declaration.subnet().id.clone(),
            user_data_sha256: sha256_str(user_data),
            // No boot delay in the inventory.
            state: PlatformState::Running,
            shutdown_pending: false,
        };
        self.update(move |inv| {
            inv.instances.push(record);
            Ok(())
        })
        .await?;
        Ok(id)
    }

    async fn terminate(&self, instance: &InstanceId) -> Result<()> {
        let id = instance.clone();
        self.update(move |inv| {
            inv.instance_mut(&id)?.state = PlatformState::Terminated;
            for address in &mut inv.addresses {
                if address.instance.as_ref() == Some(&id) {
                    address.instance = None;
                }
            }
            Ok(())
        })
        .await
    }

    async fn allocate_address(&self, allow_reassociation: bool) -> Result<StaticAddress> {
        self.update(move |inv| {
            if inv.address_pool.is_empty() {
                return Err(DeployError::NoAddressAvailable.into());
            }
            let address = StaticAddress {
                allocation_id: format!("eipalloc-{}", random_hex(17)),
                public_ip: inv.address_pool.remove(0),
                allow_reassociation,
            };
            inv.addresses.push(AddressRecord {
                address: address.clone(),
                instance: None,
            });
            Ok(address)
        })
        .await
    }

    async fn find_address(&self, allocation_id: &str) -> Result<Option<StaticAddress>> {
        let allocation_id = allocation_id.to_string();
        self.read(move |inv| {
            inv.addresses
                .iter()
                .find(|a| a.address.allocation_id == allocation_id)
                .map(|a| a.address.clone())
        })
        .await
    }

    async fn associate_address(&self, address: &StaticAddress, instance: &InstanceId) -> Result<()> {
        let allocation_id = address.allocation_id.clone();
        let id = instance.clone();
        self.update(move |inv| {
            if !inv.instances.iter().any(|i| i.id == id) {
                bail!("instance {id} not found");
            }
            let record = inv
                .addresses
                .iter_mut()
                .find(|a| a.address.allocation_id == allocation_id)
                .with_context(|| format!("address {allocation_id} not found"))?;
            match &record.instance {
                Some(current) if current != &id && !record.address.allow_reassociation => {
                    bail!("address {allocation_id} is bound to {current} and may not be reassociated")
                }
                _ => record.instance = Some(id),
            }
            Ok(())
        })
        .await
    }
}

impl ShutdownFlag for InventoryBackend {
    async fn shutdown_pending(&self, instance: &InstanceId) -> Result<bool> {
        let id = instance.clone();
        self.read(move |inv| {
            inv.instances
                .iter()
                .find(|i| i.id == id)
                .map(|i| i.shutdown_pending)
        })
        .await?
        .with_context(|| format!("instance {instance} not found"))
    }

    async fn set_shutdown_pending(&self, instance: &InstanceId, pending: bool) -> Result<()> {
        let id = instance.clone();
        self.update(move |inv| {
            inv.instance_mut(&id)?.shutdown_pending = pending;
            Ok(())
        })
        .await
    }
}

impl PowerControl for InventoryBackend {
    async fn start(&self, instance: &InstanceId) -> Result<()> {
        self.set_power(instance, PlatformState::Running).await
    }

    async fn stop(&self, instance: &InstanceId) -> Result<()> {
        self.set_power(instance, PlatformState::Stopped).await
    }

    async fn describe(&self, instance: &InstanceId) -> Result<PlatformState> {
        let id = instance.clone();
        self.read(move |inv| inv.instances.iter().find(|i| i.id == id).map(|i| i.state))
            .await?
            .with_context(|| format!("instance {instance} not found"))
    }
}
