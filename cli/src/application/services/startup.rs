//! Startup orchestration: stage artifacts, build the sequence, and give the
//! instance role the access the sequence needs.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{FileHasher, StoreCatalog};
use crate::domain::DeploymentConfig;
use crate::domain::compute::{Access, InstanceDeclaration};
use crate::domain::save_store::SaveStore;
use crate::domain::startup::{Artifact, CliTool, StartupArtifacts, StartupSequence};

/// Hashes the configured scripts into content-addressed artifacts.
///
/// Relative script paths are taken relative to `base_dir` (the directory of
/// the config file).
///
/// # Errors
///
/// Returns an error if a script cannot be read.
pub fn stage_artifacts(
    hasher: &impl FileHasher,
    config: &DeploymentConfig,
    base_dir: &Path,
) -> Result<StartupArtifacts> {
    let bucket = config.asset_bucket();
    let stage = |configured: &Path, what: &str| -> Result<Artifact> {
        let path = base_dir.join(configured);
        let digest = hasher
            .sha256_file(&path)
            .with_context(|| format!("cannot read {what} script {}", path.display()))?;
        Ok(Artifact::staged(&path, &bucket, &digest))
    };
    Ok(StartupArtifacts {
        install: stage(&config.startup.install_script_path, "install")?,
        auto_shutdown: stage(&config.startup.auto_shutdown_script_path, "auto-shutdown")?,
    })
}

/// Builds the startup sequence for `store` and grants the instance role
/// read access to every artifact and read-write access to the store.
pub fn orchestrate(
    declaration: &mut InstanceDeclaration,
    store: &SaveStore,
    config: &DeploymentConfig,
    artifacts: &StartupArtifacts,
) -> StartupSequence {
    let cli_tool = if config.startup.cli_tool.install {
        CliTool::Install
    } else {
        CliTool::Verify
    };
    let sequence = StartupSequence::build(
        store,
        config.game.use_experimental_build,
        artifacts,
        cli_tool,
    );
    for grant in sequence.required_grants() {
        declaration.role.grant(grant.resource, grant.access);
    }
    declaration.role.grant(store.arn(), Access::ReadWrite);
    tracing::debug!(
        steps = sequence.steps().len(),
        digest = %sequence.digest(),
        "startup sequence built"
    );
    sequence
}

/// Uploads the artifacts the sequence fetches at boot.
///
/// # Errors
///
/// Returns an error if an upload fails.
pub async fn publish(catalog: &impl StoreCatalog, artifacts: &StartupArtifacts) -> Result<()> {
    for artifact in [&artifacts.install, &artifacts.auto_shutdown] {
        catalog
            .publish_artifact(artifact)
            .await
            .with_context(|| format!("publishing {}", artifact.uri()))?;
        tracing::info!(uri = %artifact.uri(), "startup artifact published");
    }
    Ok(())
}
