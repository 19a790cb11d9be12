//! `campfire status` — persisted deployment plus live power state.
//!
//! A failed platform query is shown, not fatal: the persisted outputs are
//! still useful when the platform is unreachable.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::power;
use crate::domain::StatusReport;

/// # Errors
///
/// Returns an error if nothing has been deployed.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let state = super::require_deployment(app).await?;
    let control = super::power_backend(app)?;
    let live = power::status(&control, &state.instance.id)
        .await
        .map_err(|e| format!("{e:#}"));
    if let Err(e) = &live {
        tracing::warn!(error = %e, "power state unavailable");
    }
    app.renderer().render_status(&StatusReport::new(&state, live))?;
    Ok(ExitCode::SUCCESS)
}
