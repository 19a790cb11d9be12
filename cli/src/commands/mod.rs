//! Command implementations

pub mod config;
pub mod deploy;
pub mod idle_monitor;
pub mod outputs;
pub mod plan;
pub mod start;
pub mod status;
pub mod stop;
pub mod version;
pub mod wake;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::DeploymentStateStore;
use crate::domain::{DeployError, DeploymentState};
use crate::infra::platform::PowerBackend;

/// Persisted deployment, or [`DeployError::NotDeployed`].
async fn require_deployment(app: &AppContext) -> Result<DeploymentState> {
    app.state_mgr
        .load_async()
        .await?
        .ok_or_else(|| DeployError::NotDeployed.into())
}

/// Power backend for the deployed instance, using the configured region
/// when a config exists.
fn power_backend(app: &AppContext) -> Result<PowerBackend> {
    use crate::application::ports::ConfigStore;

    let region = app
        .config_store
        .load()
        .ok()
        .map(|c| c.infrastructure.region)
        .filter(|r| !r.trim().is_empty());
    PowerBackend::from_env(region)
}
