//! Operator power actions on the deployed instance.

use std::sync::Arc;

use anyhow::{Context, Result};
use campfire_common::{
    ActivationGateway, ActivationOutcome, InstanceId, PlatformState, PowerControl, PowerState,
    PowerStateMachine,
};

use crate::domain::deployment::DeploymentState;
use crate::domain::error::DeployError;

/// Wakes the deployed instance through a local activation gateway scoped
/// to it.
///
/// # Errors
///
/// Returns [`DeployError::ActivationDisabled`] if the deployment has no
/// activation endpoint, or the gateway's timeout/platform error.
pub async fn start(control: impl PowerControl, state: &DeploymentState) -> Result<ActivationOutcome> {
    let endpoint = state
        .activation
        .as_ref()
        .ok_or(DeployError::ActivationDisabled)?;
    let gateway = ActivationGateway::new(
        endpoint.target.clone(),
        control,
        Arc::new(PowerStateMachine::new(PowerState::Stopped)),
    )
    .with_timeout(std::time::Duration::from_secs(endpoint.timeout_seconds))
    .observing_platform();
    Ok(gateway.activate(&endpoint.target).await?)
}

/// Asks the platform to stop the instance. Stopping a stopped instance is
/// not an error.
///
/// # Errors
///
/// Returns an error if the platform cannot be queried or the stop request
/// fails.
pub async fn stop(control: &impl PowerControl, instance: &InstanceId) -> Result<PlatformState> {
    let current = status(control, instance).await?;
    match current {
        PlatformState::Stopped | PlatformState::Stopping => Ok(current),
        PlatformState::ShuttingDown | PlatformState::Terminated => {
            anyhow::bail!("instance {instance} is {current:?} and cannot be stopped")
        }
        PlatformState::Pending | PlatformState::Running => {
            control
                .stop(instance)
                .await
                .with_context(|| format!("stopping {instance}"))?;
            tracing::info!(instance = %instance, "stop requested");
            Ok(PlatformState::Stopping)
        }
    }
}

/// Live platform state of the instance.
///
/// # Errors
///
/// Returns an error if the platform cannot be queried.
pub async fn status(control: &impl PowerControl, instance: &InstanceId) -> Result<PlatformState> {
    control
        .describe(instance)
        .await
        .with_context(|| format!("querying state of {instance}"))
}
