//! `campfire plan` — resolve everything and show what a deploy would do.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::{config_service, deploy};

#[derive(Args)]
pub struct PlanArgs {
    /// Print the rendered first-boot script instead of the plan
    #[arg(long)]
    pub user_data: bool,
}

/// Run `campfire plan`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or any resolution fails.
pub async fn run(app: &AppContext, args: &PlanArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let base_dir = config_service::base_dir(&app.config_store)?;
    let prior = deploy::load_prior(&app.state_mgr).await?;

    let plan = deploy::plan(&app.inventory, &app.local_fs, &config, &base_dir, &prior).await?;

    if args.user_data {
        print!("{}", plan.sequence.render());
    } else {
        app.renderer().render_plan(&plan)?;
    }
    Ok(ExitCode::SUCCESS)
}
