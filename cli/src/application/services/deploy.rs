//! Application service — deploy use-case.
//!
//! `plan` resolves everything and decides what would change without touching
//! the platform. `apply` carries a plan out and persists the result,
//! checkpointing as it goes so an interrupted deploy picks up where it
//! stopped.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::application::ports::{
    ComputeBackend, DeploymentStateStore, FileHasher, NetworkDirectory, ProgressReporter,
    StoreCatalog,
};
use crate::application::services::save_store::StoreRequest;
use crate::application::services::{compute, network, save_store, startup};
use crate::domain::DeploymentConfig;
use crate::domain::compute::{InstanceChange, InstanceDeclaration, instance_arn, plan_change};
use crate::domain::deployment::{
    ActivationEndpoint, DeployProgress, DeploymentState, Permission, START_ACTION,
};
use crate::domain::save_store::StorePlan;
use crate::domain::security::SecurityPolicy;
use crate::domain::startup::{StartupArtifacts, StartupSequence};

/// Everything a deploy would do.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentPlan {
    pub store: StorePlan,
    pub declaration: InstanceDeclaration,
    pub artifacts: StartupArtifacts,
    pub sequence: StartupSequence,
    pub change: InstanceChange,
    pub activation_enabled: bool,
}

/// Resolves placement, policy, store and startup sequence. No side effects.
///
/// # Errors
///
/// Returns an error if the config is invalid, a resolution fails, or a
/// startup script cannot be read.
pub async fn plan<B>(
    backend: &B,
    hasher: &impl FileHasher,
    config: &DeploymentConfig,
    base_dir: &Path,
    prior: &DeployProgress,
) -> Result<DeploymentPlan>
where
    B: NetworkDirectory + StoreCatalog,
{
    config.validate()?;

    let network = network::resolve(backend, &config.placement()).await?;
    let store = save_store::plan_store(
        backend,
        StoreRequest {
            hint: &config.store_hint(),
            owned: prior.owned_store(),
            prefix: &config.prefix,
            transition_after_days: config.save_store.transition_after_days,
        },
    )
    .await?;
    let policy = SecurityPolicy::build(&config.security_group.description, &config.port_rules());

    let mut declaration = compute::declare(config, network, policy);
    let artifacts = startup::stage_artifacts(hasher, config, base_dir)?;
    let sequence = startup::orchestrate(&mut declaration, store.store(), config, &artifacts);
    let change = plan_change(prior.instance.as_ref(), &declaration, &sequence.digest());

    Ok(DeploymentPlan {
        store,
        declaration,
        artifacts,
        sequence,
        change,
        activation_enabled: config.activation.enabled,
    })
}

/// What the platform already holds for this deployment.
///
/// The checkpoint of an unfinished deploy wins over the recorded deployment,
/// since it was built on top of it.
///
/// # Errors
///
/// Returns an error if either file exists but cannot be read.
pub async fn load_prior(states: &impl DeploymentStateStore) -> Result<DeployProgress> {
    if let Some(progress) = states.load_progress_async().await? {
        tracing::info!(
            store = progress.save_store.as_ref().map(|s| s.name.as_str()),
            instance = progress.instance.as_ref().map(|i| i.id.as_str()),
            "resuming unfinished deploy"
        );
        return Ok(progress);
    }
    Ok(DeployProgress::from_state(states.load_async().await?.as_ref()))
}

/// Carries out `plan` and persists the resulting deployment state.
///
/// `prior` is what [`load_prior`] returned. Progress is checkpointed after
/// every creation and the checkpoint is dropped once the state is written,
/// so a failed apply is resumed by the next one.
///
/// # Errors
///
/// Returns an error if any platform call or state write fails. Nothing is
/// rolled back; a provisioning error names the save store that was kept.
pub async fn apply<B>(
    backend: &B,
    state_store: &impl DeploymentStateStore,
    reporter: &impl ProgressReporter,
    config: &DeploymentConfig,
    plan: DeploymentPlan,
    prior: DeployProgress,
) -> Result<DeploymentState>
where
    B: StoreCatalog + ComputeBackend,
{
    let mut progress = prior;
    reporter.step("publishing startup scripts...");
    startup::publish(backend, &plan.artifacts).await?;

    let creates_store = matches!(plan.store, StorePlan::Create(_));
    if creates_store {
        reporter.step(&format!("creating save store {}...", plan.store.store().name));
    }
    let save_store = save_store::realize(backend, plan.store).await?;
    progress.save_store = Some(save_store.clone());
    if creates_store {
        state_store
            .save_progress_async(&progress)
            .await
            .context("recording deploy progress")?;
    }

    let instance = compute::provision(
        backend,
        state_store,
        reporter,
        &plan.declaration,
        &plan.sequence,
        &mut progress,
        config.instance.elastic_ip.allow_reassociation,
    )
    .await
    .with_context(|| {
        format!(
            "deploy incomplete; save store {} is kept and the next deploy resumes with it",
            save_store.name
        )
    })?;

    let activation = plan.activation_enabled.then(|| ActivationEndpoint {
        target: instance.id.clone(),
        permission: Permission {
            action: START_ACTION.to_string(),
            resource: instance_arn(
                &config.infrastructure.region,
                &config.infrastructure.account,
                &instance.id,
            ),
        },
        timeout_seconds: config.activation.timeout_seconds,
        description: config.activation.description.clone(),
    });

    let state = DeploymentState {
        deployed_at: Utc::now(),
        instance,
        save_store,
        activation,
    };
    state_store.save_async(&state).await?;
    if let Err(e) = state_store.clear_progress_async().await {
        tracing::warn!(error = %e, "could not remove deploy checkpoint");
    }
    tracing::info!(
        instance = %state.instance.id,
        store = %state.save_store.name,
        activation = state.activation.is_some(),
        "deployment recorded"
    );
    Ok(state)
}
