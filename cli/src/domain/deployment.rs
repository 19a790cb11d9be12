//! Persisted deployment state and the outputs shown to the operator.

use std::net::Ipv4Addr;

use campfire_common::{InstanceId, PlatformState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::compute::{ComputeInstance, PriorInstance, StaticAddress};
use crate::domain::save_store::SaveStore;

pub const START_ACTION: &str = "ec2:StartInstances";

/// The single permission the activation endpoint holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub action: String,
    pub resource: String,
}

/// On-demand wake-up path for the deployed instance. Stateless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationEndpoint {
    pub target: InstanceId,
    pub permission: Permission,
    pub timeout_seconds: u64,
    pub description: String,
}

/// Written to `~/.campfire/state.json` after every successful deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentState {
    pub deployed_at: DateTime<Utc>,
    pub instance: ComputeInstance,
    pub save_store: SaveStore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<ActivationEndpoint>,
}

impl DeploymentState {
    #[must_use]
    pub fn prior_instance(&self) -> PriorInstance {
        PriorInstance {
            id: self.instance.id.clone(),
            instance_type: self.instance.declaration.instance_type.clone(),
            image: self.instance.declaration.image.clone(),
            user_data_digest: self.instance.user_data_digest.clone(),
        }
    }

    #[must_use]
    pub fn address(&self) -> &StaticAddress {
        &self.instance.address
    }

    #[must_use]
    pub fn outputs(&self) -> DeploymentOutputs {
        let pin_hint = self.save_store.is_owned().then(|| {
            format!(
                "campfire config set save_store.name {}",
                self.save_store.name
            )
        });
        DeploymentOutputs {
            public_ip: self.instance.address.public_ip,
            instance_id: self.instance.id.clone(),
            save_store: self.save_store.name.clone(),
            save_store_lifecycle: self.save_store.lifecycle.to_string(),
            activation_target: self.activation.as_ref().map(|a| a.target.clone()),
            pin_store_hint: pin_hint,
        }
    }
}

/// What is known to exist on the platform for this deployment.
///
/// Built from the last recorded deployment, then updated after every
/// creation during `apply` and checkpointed, so a deploy that fails part way
/// is resumed by the next run instead of creating everything twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployProgress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_store: Option<SaveStore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<PriorInstance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<StaticAddress>,
    /// Instance the address was last bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_to: Option<InstanceId>,
}

impl DeployProgress {
    #[must_use]
    pub fn from_state(state: Option<&DeploymentState>) -> Self {
        state.map_or_else(Self::default, |state| Self {
            save_store: Some(state.save_store.clone()),
            instance: Some(state.prior_instance()),
            address: Some(state.address().clone()),
            bound_to: Some(state.instance.id.clone()),
        })
    }

    /// The store this deployment created, if any.
    #[must_use]
    pub fn owned_store(&self) -> Option<&SaveStore> {
        self.save_store.as_ref().filter(|s| s.is_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOutputs {
    pub public_ip: Ipv4Addr,
    pub instance_id: InstanceId,
    pub save_store: String,
    pub save_store_lifecycle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_target: Option<InstanceId>,
    /// Command that pins a generated store name so redeploys adopt it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_store_hint: Option<String>,
}

/// What `campfire status` reports: the persisted deployment plus the live
/// platform state, when it could be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub deployed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outputs: DeploymentOutputs,
    pub instance_type: String,
    pub power: Option<PlatformState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_error: Option<String>,
}

impl StatusReport {
    #[must_use]
    pub fn new(state: &DeploymentState, power: Result<PlatformState, String>) -> Self {
        let (power, power_error) = match power {
            Ok(p) => (Some(p), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            deployed_at: state.deployed_at,
            outputs: state.outputs(),
            instance_type: state.instance.declaration.instance_type.clone(),
            power,
            power_error,
        }
    }
}
