//! Compute instance declaration and replacement rules.

use std::net::Ipv4Addr;

use campfire_common::InstanceId;
use serde::{Deserialize, Serialize};

use crate::domain::config::DeploymentConfig;
use crate::domain::placement::{NetworkContext, Subnet};
use crate::domain::security::SecurityPolicy;

pub const ROOT_VOLUME_TYPE: &str = "gp3";
pub const BASELINE_MANAGED_POLICY: &str = "AmazonSSMManagedInstanceCore";

/// Persistent root disk. Survives instance replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootVolume {
    pub device_name: String,
    pub size_gb: u32,
    pub volume_type: String,
    pub delete_on_termination: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Read,
    ReadWrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub resource: String,
    pub access: Access,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRole {
    pub name: String,
    pub managed_policies: Vec<String>,
    pub grants: Vec<Grant>,
}

impl InstanceRole {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            managed_policies: vec![BASELINE_MANAGED_POLICY.to_string()],
            grants: Vec::new(),
        }
    }

    /// Adds a grant. A resource appears once; asking again for wider access
    /// upgrades the existing entry, narrower requests are no-ops.
    pub fn grant(&mut self, resource: impl Into<String>, access: Access) {
        let resource = resource.into();
        match self.grants.iter_mut().find(|g| g.resource == resource) {
            Some(existing) => existing.access = existing.access.max(access),
            None => self.grants.push(Grant { resource, access }),
        }
    }

    #[must_use]
    pub fn access_to(&self, resource: &str) -> Option<Access> {
        self.grants
            .iter()
            .find(|g| g.resource == resource)
            .map(|g| g.access)
    }
}

/// Everything needed to launch the instance, before it exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDeclaration {
    pub name: String,
    pub instance_type: String,
    pub image: String,
    pub root_volume: RootVolume,
    pub network: NetworkContext,
    pub security_policy: SecurityPolicy,
    pub role: InstanceRole,
}

impl InstanceDeclaration {
    /// Declares the instance for `config` placed in `network`. Pure.
    #[must_use]
    pub fn new(
        config: &DeploymentConfig,
        network: NetworkContext,
        security_policy: SecurityPolicy,
    ) -> Self {
        let instance = &config.instance;
        Self {
            name: format!("{}Server", config.prefix),
            instance_type: instance.instance_type.trim().to_string(),
            image: instance.image.trim().to_string(),
            root_volume: RootVolume {
                device_name: instance.storage.root_volume.device_name.clone(),
                size_gb: instance.storage.root_volume.size_gb,
                volume_type: ROOT_VOLUME_TYPE.to_string(),
                delete_on_termination: false,
            },
            network,
            security_policy,
            role: InstanceRole::new(format!("{}ServerRole", config.prefix)),
        }
    }

    #[must_use]
    pub fn subnet(&self) -> &Subnet {
        self.network.placement_subnet()
    }
}

/// Stable public address, kept across instance replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticAddress {
    pub allocation_id: String,
    pub public_ip: Ipv4Addr,
    pub allow_reassociation: bool,
}

/// What a previous deployment recorded about its instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorInstance {
    pub id: InstanceId,
    pub instance_type: String,
    pub image: String,
    pub user_data_digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum InstanceChange {
    Create,
    Unchanged { id: InstanceId },
    Replace { previous: InstanceId, reasons: Vec<String> },
}

impl InstanceChange {
    #[must_use]
    pub fn is_replace(&self) -> bool {
        matches!(self, Self::Replace { .. })
    }
}

/// Decides whether the instance must be launched, kept, or replaced.
///
/// Any change to the startup configuration (its digest), instance type or
/// image replaces the instance wholesale.
#[must_use]
pub fn plan_change(
    prior: Option<&PriorInstance>,
    declaration: &InstanceDeclaration,
    user_data_digest: &str,
) -> InstanceChange {
    let Some(prior) = prior else {
        return InstanceChange::Create;
    };
    let mut reasons = Vec::new();
    if prior.user_data_digest != user_data_digest {
        reasons.push("startup configuration changed".to_string());
    }
    if prior.instance_type != declaration.instance_type {
        reasons.push(format!(
            "instance type {} -> {}",
            prior.instance_type, declaration.instance_type
        ));
    }
    if prior.image != declaration.image {
        reasons.push("image changed".to_string());
    }
    if reasons.is_empty() {
        InstanceChange::Unchanged {
            id: prior.id.clone(),
        }
    } else {
        InstanceChange::Replace {
            previous: prior.id.clone(),
            reasons,
        }
    }
}

/// The provisioned instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeInstance {
    pub id: InstanceId,
    pub declaration: InstanceDeclaration,
    pub address: StaticAddress,
    pub user_data_digest: String,
}

/// Resource name of an instance, used to scope the activation permission.
#[must_use]
pub fn instance_arn(region: &str, account: &str, id: &InstanceId) -> String {
    let region = if region.is_empty() { "*" } else { region };
    let account = if account.is_empty() { "*" } else { account };
    format!("arn:aws:ec2:{region}:{account}:instance/{id}")
}
