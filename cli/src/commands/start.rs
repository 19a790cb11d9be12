//! `campfire start` — wake the deployed server through a local activation
//! gateway scoped to it.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::power;
use crate::output::progress;

/// # Errors
///
/// Returns an error if nothing is deployed, activation is disabled, or the
/// platform times out or fails.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let state = super::require_deployment(app).await?;
    let control = super::power_backend(app)?;

    let pb = progress::spinner_if(app.show_progress(), "Starting server...");
    let outcome = power::start(control, &state).await;
    progress::finish_clear(&pb);
    let outcome = outcome?;

    app.renderer().render_activation(&outcome)?;
    if outcome.is_accepted() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
