//! `campfire deploy` — apply the plan and persist the deployment.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::ProgressReporter;
use crate::application::services::deploy::{self, DeploymentPlan};
use crate::application::services::config_service;
use crate::domain::compute::InstanceChange;
use crate::domain::{DeployError, DeployProgress, DeploymentConfig, DeploymentState};
use crate::output::{LogReporter, TerminalReporter};

/// Run `campfire deploy`.
///
/// # Errors
///
/// Returns an error if planning or any platform step fails, or the
/// operator declines an instance replacement.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let base_dir = config_service::base_dir(&app.config_store)?;
    let prior = deploy::load_prior(&app.state_mgr).await?;

    let plan = deploy::plan(&app.inventory, &app.local_fs, &config, &base_dir, &prior).await?;

    if let InstanceChange::Replace { previous, reasons } = &plan.change {
        let prompt = format!(
            "Instance {previous} will be replaced ({}). Its root volume is kept. Continue?",
            reasons.join(", ")
        );
        if !app.non_interactive && !app.confirm(&prompt, false)? {
            return Err(DeployError::ReplacementDeclined.into());
        }
    }

    let state = if app.is_json() {
        apply(app, &LogReporter, &config, plan, prior).await?
    } else {
        let reporter = TerminalReporter::new(&app.output);
        apply(app, &reporter, &config, plan, prior).await?
    };

    if !app.is_json() {
        println!();
    }
    app.renderer().render_outputs(&state.outputs())?;
    Ok(ExitCode::SUCCESS)
}

async fn apply(
    app: &AppContext,
    reporter: &impl ProgressReporter,
    config: &DeploymentConfig,
    plan: DeploymentPlan,
    prior: DeployProgress,
) -> Result<DeploymentState> {
    deploy::apply(&app.inventory, &app.state_mgr, reporter, config, plan, prior).await
}
