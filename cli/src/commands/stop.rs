//! `campfire stop` — stop the deployed server. Its disk and address are kept.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::power;

/// # Errors
///
/// Returns an error if nothing is deployed or the platform request fails.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let state = super::require_deployment(app).await?;
    let control = super::power_backend(app)?;
    let result = power::stop(&control, &state.instance.id).await?;
    app.renderer().render_stop(result)?;
    Ok(ExitCode::SUCCESS)
}
