//! End-to-end service scenarios against the file-backed inventory.
//!
//! These run the deploy and power use-cases with the real infra adapters on
//! a temporary directory, without spawning the binary.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;

use campfire_cli::application::ports::DeploymentStateStore;
use campfire_cli::application::services::{deploy, power};
use campfire_cli::domain::placement::{Network, Subnet};
use campfire_cli::domain::save_store::SaveStore;
use campfire_cli::domain::{DeployError, DeploymentConfig, DeploymentState, ResolutionError};
use campfire_cli::infra::fs::LocalFs;
use campfire_cli::infra::inventory::{Inventory, InventoryBackend};
use campfire_cli::infra::state::StateManager;
use campfire_cli::output::LogReporter;
use campfire_common::{
    ActivationGateway, ActivationOutcome, DenialReason, InstanceId, PlatformState, PowerControl,
    PowerState, PowerStateMachine, ShutdownFlag,
};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    backend: InventoryBackend,
    states: StateManager,
}

impl Fixture {
    async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let scripts = dir.path().join("scripts");
        std::fs::create_dir_all(&scripts).unwrap();
        std::fs::write(scripts.join("install.sh"), "#!/bin/bash\necho install\n").unwrap();
        std::fs::write(scripts.join("auto-shutdown.sh"), "#!/bin/bash\necho idle\n").unwrap();

        let backend = InventoryBackend::with_path(dir.path().join("inventory.json"));
        backend.seed(default_inventory()).await.unwrap();
        let states = StateManager::with_path(dir.path().join("state.json"));
        Self {
            dir,
            backend,
            states,
        }
    }

    fn base_dir(&self) -> &Path {
        self.dir.path()
    }

    async fn deploy(&self, config: &DeploymentConfig) -> anyhow::Result<DeploymentState> {
        let prior = deploy::load_prior(&self.states).await?;
        let plan = deploy::plan(&self.backend, &LocalFs, config, self.base_dir(), &prior).await?;
        deploy::apply(&self.backend, &self.states, &LogReporter, config, plan, prior).await
    }
}

fn default_inventory() -> Inventory {
    let subnet = |id: &str, az: &str| Subnet {
        id: id.to_string(),
        network_id: "vpc-default".to_string(),
        availability_zone: az.to_string(),
        public: true,
    };
    Inventory {
        networks: vec![Network {
            id: "vpc-default".to_string(),
            is_default: true,
        }],
        subnets: vec![subnet("subnet-a", "eu-west-1a"), subnet("subnet-b", "eu-west-1b")],
        address_pool: vec![Ipv4Addr::new(203, 0, 113, 10)],
        ..Inventory::default()
    }
}

#[tokio::test]
async fn fresh_deploy_creates_versioned_store_and_running_instance() {
    let fx = Fixture::new().await;
    let config = DeploymentConfig::sample();

    let state = fx.deploy(&config).await.unwrap();

    assert!(state.save_store.is_owned());
    assert!(state.save_store.versioned);
    assert_eq!(state.instance.address.public_ip, Ipv4Addr::new(203, 0, 113, 10));
    assert_eq!(state.instance.declaration.subnet().id, "subnet-a");
    assert!(state.activation.is_some());

    let inventory = fx.backend.snapshot().await.unwrap();
    assert_eq!(inventory.stores.len(), 1);
    assert_eq!(inventory.artifacts.len(), 2);
    assert_eq!(inventory.instances.len(), 1);
    assert_eq!(inventory.instances[0].state, PlatformState::Running);
    assert_eq!(
        inventory.addresses[0].instance.as_ref(),
        Some(&state.instance.id)
    );

    let persisted = fx.states.load_async().await.unwrap();
    assert_eq!(persisted.as_ref(), Some(&state));
}

#[tokio::test]
async fn redeploy_keeps_owned_store_and_instance() {
    let fx = Fixture::new().await;
    let config = DeploymentConfig::sample();

    let first = fx.deploy(&config).await.unwrap();
    let second = fx.deploy(&config).await.unwrap();

    assert_eq!(second.save_store.name, first.save_store.name);
    assert_eq!(second.instance.id, first.instance.id);
    let inventory = fx.backend.snapshot().await.unwrap();
    assert_eq!(inventory.stores.len(), 1);
    assert_eq!(inventory.instances.len(), 1);
}

#[tokio::test]
async fn startup_change_replaces_instance_but_keeps_address() {
    let fx = Fixture::new().await;
    let mut config = DeploymentConfig::sample();

    let first = fx.deploy(&config).await.unwrap();
    config.game.use_experimental_build = true;
    let second = fx.deploy(&config).await.unwrap();

    assert_ne!(second.instance.id, first.instance.id);
    assert_eq!(second.instance.address, first.instance.address);
    let inventory = fx.backend.snapshot().await.unwrap();
    let old = inventory
        .instances
        .iter()
        .find(|i| i.id == first.instance.id)
        .unwrap();
    assert_eq!(old.state, PlatformState::Terminated);
    assert_eq!(
        inventory.addresses[0].instance.as_ref(),
        Some(&second.instance.id)
    );
}

#[tokio::test]
async fn configured_store_is_adopted_untouched() {
    let fx = Fixture::new().await;
    let mut inventory = default_inventory();
    inventory.stores.push(SaveStore::owned("existing-saves", 7));
    fx.backend.seed(inventory).await.unwrap();
    let mut config = DeploymentConfig::sample();
    config.save_store.name = "existing-saves".to_string();

    let state = fx.deploy(&config).await.unwrap();

    assert_eq!(state.save_store.name, "existing-saves");
    assert!(!state.save_store.is_owned());
    assert!(state.outputs().pin_store_hint.is_none());
    assert_eq!(fx.backend.snapshot().await.unwrap().stores.len(), 1);
}

#[tokio::test]
async fn missing_network_fails_without_side_effects() {
    let fx = Fixture::new().await;
    let mut config = DeploymentConfig::sample();
    config.instance.vpc_id = "vpc-123".to_string();

    let err = fx.deploy(&config).await.unwrap_err();

    assert_eq!(
        err.downcast_ref::<ResolutionError>(),
        Some(&ResolutionError::NetworkNotFound("vpc-123".to_string()))
    );
    let inventory = fx.backend.snapshot().await.unwrap();
    assert!(inventory.instances.is_empty());
    assert!(inventory.stores.is_empty());
    assert!(fx.states.load_async().await.unwrap().is_none());
}

#[tokio::test]
async fn empty_address_pool_is_reported() {
    let fx = Fixture::new().await;
    let mut inventory = default_inventory();
    inventory.address_pool.clear();
    fx.backend.seed(inventory).await.unwrap();

    let err = fx.deploy(&DeploymentConfig::sample()).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeployError>(),
        Some(DeployError::NoAddressAvailable)
    ));
}

#[tokio::test]
async fn retry_after_failed_apply_reuses_store_and_instance() {
    let fx = Fixture::new().await;
    let mut inventory = default_inventory();
    inventory.address_pool.clear();
    fx.backend.seed(inventory).await.unwrap();
    let config = DeploymentConfig::sample();

    let err = fx.deploy(&config).await.unwrap_err();

    let partial = fx.backend.snapshot().await.unwrap();
    assert_eq!(partial.stores.len(), 1);
    assert_eq!(partial.instances.len(), 1);
    assert!(format!("{err:#}").contains(&partial.stores[0].name), "got: {err:#}");
    assert!(fx.states.load_async().await.unwrap().is_none());
    assert!(fx.states.progress_path().exists());

    // The operator frees an address and runs deploy again.
    let mut refilled = partial.clone();
    refilled.address_pool.push(Ipv4Addr::new(203, 0, 113, 10));
    fx.backend.seed(refilled).await.unwrap();
    let state = fx.deploy(&config).await.unwrap();

    let inventory = fx.backend.snapshot().await.unwrap();
    assert_eq!(inventory.stores.len(), 1);
    assert_eq!(inventory.instances.len(), 1);
    assert_eq!(state.save_store.name, partial.stores[0].name);
    assert_eq!(state.instance.id, partial.instances[0].id);
    assert_eq!(
        inventory.addresses[0].instance.as_ref(),
        Some(&state.instance.id)
    );
    assert!(!fx.states.progress_path().exists());
}

#[tokio::test]
async fn stop_then_start_cycles_the_instance() {
    let fx = Fixture::new().await;
    let state = fx.deploy(&DeploymentConfig::sample()).await.unwrap();
    let id = &state.instance.id;

    assert_eq!(
        power::stop(&fx.backend, id).await.unwrap(),
        PlatformState::Stopping
    );
    assert_eq!(fx.backend.describe(id).await.unwrap(), PlatformState::Stopped);
    // Stopping again is a no-op.
    assert_eq!(
        power::stop(&fx.backend, id).await.unwrap(),
        PlatformState::Stopped
    );

    let outcome = power::start(fx.backend.clone(), &state).await.unwrap();

    assert_eq!(
        outcome,
        ActivationOutcome::Accepted {
            previous: PowerState::Stopped,
            current: PowerState::Starting,
        }
    );
    assert_eq!(fx.backend.describe(id).await.unwrap(), PlatformState::Running);
}

#[tokio::test]
async fn start_is_refused_when_activation_disabled() {
    let fx = Fixture::new().await;
    let mut config = DeploymentConfig::sample();
    config.activation.enabled = false;
    let state = fx.deploy(&config).await.unwrap();

    let err = power::start(fx.backend.clone(), &state).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeployError>(),
        Some(DeployError::ActivationDisabled)
    ));
}

#[tokio::test]
async fn gateway_denies_foreign_instance_without_touching_it() {
    let fx = Fixture::new().await;
    let state = fx.deploy(&DeploymentConfig::sample()).await.unwrap();
    power::stop(&fx.backend, &state.instance.id).await.unwrap();

    let gateway = ActivationGateway::new(
        state.instance.id.clone(),
        fx.backend.clone(),
        Arc::new(PowerStateMachine::new(PowerState::Stopped)),
    )
    .observing_platform();
    let foreign = InstanceId::parse("i-0123456789abcdef0").unwrap();

    let outcome = gateway.activate(&foreign).await.unwrap();

    assert_eq!(
        outcome,
        ActivationOutcome::Denied {
            reason: DenialReason::OutOfScope {
                requested: "i-0123456789abcdef0".to_string(),
            },
        }
    );
    assert_eq!(gateway.machine().current(), PowerState::Stopped);
    assert_eq!(
        fx.backend.describe(&state.instance.id).await.unwrap(),
        PlatformState::Stopped
    );
}

#[tokio::test]
async fn terminated_target_is_denied() {
    let fx = Fixture::new().await;
    let mut config = DeploymentConfig::sample();
    let first = fx.deploy(&config).await.unwrap();
    config.game.use_experimental_build = true;
    fx.deploy(&config).await.unwrap();

    let outcome = power::start(fx.backend.clone(), &first).await.unwrap();

    assert_eq!(
        outcome,
        ActivationOutcome::Denied {
            reason: DenialReason::Terminated,
        }
    );
}

#[tokio::test]
async fn remote_activation_cancels_published_shutdown() {
    let fx = Fixture::new().await;
    let state = fx.deploy(&DeploymentConfig::sample()).await.unwrap();
    let id = &state.instance.id;
    fx.backend.set_shutdown_pending(id, true).await.unwrap();

    let gateway = ActivationGateway::new(
        id.clone(),
        fx.backend.clone(),
        Arc::new(PowerStateMachine::new(PowerState::Stopped)),
    )
    .observing_platform();
    let outcome = gateway.activate(id).await.unwrap();

    assert_eq!(
        outcome,
        ActivationOutcome::Accepted {
            previous: PowerState::IdlePendingShutdown,
            current: PowerState::Running,
        }
    );
    assert!(!fx.backend.shutdown_pending(id).await.unwrap());
    assert_eq!(fx.backend.describe(id).await.unwrap(), PlatformState::Running);
}
