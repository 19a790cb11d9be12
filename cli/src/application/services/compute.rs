//! Compute instance provisioning.
//!
//! `declare` is pure. `provision` talks to the backend: it launches, keeps or
//! replaces the instance and makes sure the static address points at it.

use anyhow::{Context, Result};
use campfire_common::InstanceId;

use crate::application::ports::{ComputeBackend, DeploymentStateStore, ProgressReporter};
use crate::domain::DeploymentConfig;
use crate::domain::compute::{
    ComputeInstance, InstanceChange, InstanceDeclaration, PriorInstance, StaticAddress,
    plan_change,
};
use crate::domain::deployment::DeployProgress;
use crate::domain::placement::NetworkContext;
use crate::domain::security::SecurityPolicy;
use crate::domain::startup::StartupSequence;

/// Declares the instance; nothing is created.
#[must_use]
pub fn declare(
    config: &DeploymentConfig,
    network: NetworkContext,
    policy: SecurityPolicy,
) -> InstanceDeclaration {
    InstanceDeclaration::new(config, network, policy)
}

/// Brings the platform in line with `declaration`.
///
/// The static address already recorded in `progress` is reused; a new one is
/// only allocated on first deploy, or if the old allocation has disappeared.
/// Every creation is written to `progress` and checkpointed through
/// `journal` before the next step runs.
///
/// # Errors
///
/// Returns an error if any backend call or checkpoint write fails.
pub async fn provision(
    backend: &impl ComputeBackend,
    journal: &impl DeploymentStateStore,
    reporter: &impl ProgressReporter,
    declaration: &InstanceDeclaration,
    sequence: &StartupSequence,
    progress: &mut DeployProgress,
    allow_reassociation: bool,
) -> Result<ComputeInstance> {
    let user_data = sequence.render();
    let digest = sequence.digest();
    let change = plan_change(progress.instance.as_ref(), declaration, &digest);

    let id = match &change {
        InstanceChange::Create => {
            reporter.step("launching instance...");
            let id = backend
                .launch(declaration, &user_data)
                .await
                .context("launching instance")?;
            tracing::info!(instance = %id, instance_type = %declaration.instance_type, "instance launched");
            progress.instance = Some(launched(&id, declaration, &digest));
            checkpoint(journal, progress).await?;
            id
        }
        InstanceChange::Unchanged { id } => {
            tracing::info!(instance = %id, "instance unchanged");
            id.clone()
        }
        InstanceChange::Replace { previous, reasons } => {
            reporter.step(&format!("replacing instance {previous}..."));
            backend
                .terminate(previous)
                .await
                .with_context(|| format!("terminating instance {previous}"))?;
            progress.instance = None;
            checkpoint(journal, progress).await?;
            let id = backend
                .launch(declaration, &user_data)
                .await
                .context("launching replacement instance")?;
            tracing::info!(previous = %previous, instance = %id, ?reasons, "instance replaced");
            progress.instance = Some(launched(&id, declaration, &digest));
            checkpoint(journal, progress).await?;
            id
        }
    };

    let (address, new_address) =
        reuse_or_allocate(backend, progress.address.as_ref(), allow_reassociation).await?;
    if new_address {
        progress.address = Some(address.clone());
        progress.bound_to = None;
        checkpoint(journal, progress).await?;
    }
    if progress.bound_to.as_ref() != Some(&id) {
        backend
            .associate_address(&address, &id)
            .await
            .with_context(|| format!("binding {} to {id}", address.public_ip))?;
        tracing::info!(instance = %id, public_ip = %address.public_ip, "static address bound");
        progress.bound_to = Some(id.clone());
    }
    reporter.success(&format!("instance {id} at {}", address.public_ip));

    Ok(ComputeInstance {
        id,
        declaration: declaration.clone(),
        address,
        user_data_digest: digest,
    })
}

fn launched(id: &InstanceId, declaration: &InstanceDeclaration, digest: &str) -> PriorInstance {
    PriorInstance {
        id: id.clone(),
        instance_type: declaration.instance_type.clone(),
        image: declaration.image.clone(),
        user_data_digest: digest.to_string(),
    }
}

async fn checkpoint(journal: &impl DeploymentStateStore, progress: &DeployProgress) -> Result<()> {
    journal
        .save_progress_async(progress)
        .await
        .context("recording deploy progress")
}

async fn reuse_or_allocate(
    backend: &impl ComputeBackend,
    prior: Option<&StaticAddress>,
    allow_reassociation: bool,
) -> Result<(StaticAddress, bool)> {
    if let Some(prior) = prior {
        if let Some(existing) = backend
            .find_address(&prior.allocation_id)
            .await
            .with_context(|| format!("looking up address {}", prior.allocation_id))?
        {
            return Ok((existing, false));
        }
        tracing::warn!(allocation = %prior.allocation_id, "previous static address is gone; allocating a new one");
    }
    let address = backend
        .allocate_address(allow_reassociation)
        .await
        .context("allocating static address")?;
    Ok((address, true))
}
