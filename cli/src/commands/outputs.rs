//! `campfire outputs` — print the outputs of the last deploy.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;

/// # Errors
///
/// Returns an error if nothing has been deployed.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let state = super::require_deployment(app).await?;
    app.renderer().render_outputs(&state.outputs())?;
    Ok(ExitCode::SUCCESS)
}
