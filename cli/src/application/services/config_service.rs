//! Application service — configuration use-cases.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::application::ports::ConfigStore;
use crate::domain::DeploymentConfig;

/// Load configuration.
///
/// # Errors
///
/// Returns an error if no configuration exists or it cannot be parsed.
pub fn load_config(store: &impl ConfigStore) -> Result<DeploymentConfig> {
    store.load()
}

/// Save configuration.
///
/// # Errors
///
/// Returns an error if the configuration cannot be written.
pub fn save_config(store: &impl ConfigStore, config: &DeploymentConfig) -> Result<()> {
    store.save(config)
}

/// Write the sample configuration. Refuses to overwrite an existing file
/// unless `force` is set.
///
/// # Errors
///
/// Returns an error if a configuration already exists and `force` is not
/// set, or the write fails.
pub fn init_config(store: &impl ConfigStore, force: bool) -> Result<PathBuf> {
    let path = store.path()?;
    if path.exists() && !force {
        bail!(
            "configuration already exists at {}; pass --force to overwrite",
            path.display()
        );
    }
    store.save(&DeploymentConfig::sample())?;
    Ok(path)
}

/// Apply one whitelisted setting and persist the result.
///
/// # Errors
///
/// Returns an error if the key or value is rejected, or the configuration
/// cannot be loaded or saved. Nothing is written on rejection.
pub fn set_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<DeploymentConfig> {
    let mut config = store.load()?;
    config.set(key, value)?;
    store.save(&config)?;
    tracing::info!(key, value, "configuration updated");
    Ok(config)
}

/// Directory that relative script paths in the config resolve against.
///
/// # Errors
///
/// Returns an error if the config path cannot be determined.
pub fn base_dir(store: &impl ConfigStore) -> Result<PathBuf> {
    let path = store.path()?;
    Ok(path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| Path::new(".").to_path_buf(), Path::to_path_buf))
}
