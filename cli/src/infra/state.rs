//! Infrastructure implementation of the `DeploymentStateStore` port.
//!
//! `StateManager` provides async load/save using `tokio::task::spawn_blocking`
//! with atomic write (temp file + rename) to prevent state corruption. The
//! checkpoint of an unfinished deploy lives next to the state file, with a
//! `.pending.json` extension.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::application::ports::DeploymentStateStore;
use crate::domain::{DeployProgress, DeploymentState};
use crate::infra::fs::{path_from_env, write_atomic};

/// Overrides the state file location.
pub const STATE_ENV: &str = "CAMPFIRE_STATE";

/// State file manager for the last successful deployment.
#[derive(Debug, Clone)]
pub struct StateManager {
    path: PathBuf,
}

impl StateManager {
    /// Create a state manager at `$CAMPFIRE_STATE` or `~/.campfire/state.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(path_from_env(STATE_ENV, "state.json")?))
    }

    /// Create a state manager with an explicit path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checkpoint file of an unfinished deploy.
    #[must_use]
    pub fn progress_path(&self) -> PathBuf {
        self.path.with_extension("pending.json")
    }

    fn load_sync<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading state file {}", path.display()))?;
        let value = serde_json::from_str(&content)
            .with_context(|| format!("parsing state file {}", path.display()))?;
        Ok(Some(value))
    }

    fn save_sync<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(value).context("serializing state")?;
        write_atomic(path, &content)
    }

    fn remove_sync(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("removing state file {}", path.display()))?;
        }
        Ok(())
    }

    async fn load_at<T>(path: PathBuf) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        tokio::task::spawn_blocking(move || Self::load_sync(&path))
            .await
            .context("state load task panicked")?
    }

    async fn save_at<T>(path: PathBuf, value: T) -> Result<()>
    where
        T: Serialize + Send + 'static,
    {
        tokio::task::spawn_blocking(move || Self::save_sync(&path, &value))
            .await
            .context("state save task panicked")?
    }

    /// Remove the state file and any unfinished-deploy checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be removed.
    pub fn clear(&self) -> Result<()> {
        Self::remove_sync(&self.path)?;
        Self::remove_sync(&self.progress_path())
    }
}

impl DeploymentStateStore for StateManager {
    async fn load_async(&self) -> Result<Option<DeploymentState>> {
        Self::load_at(self.path.clone()).await
    }

    async fn save_async(&self, state: &DeploymentState) -> Result<()> {
        Self::save_at(self.path.clone(), state.clone()).await
    }

    async fn load_progress_async(&self) -> Result<Option<DeployProgress>> {
        Self::load_at(self.progress_path()).await
    }

    async fn save_progress_async(&self, progress: &DeployProgress) -> Result<()> {
        Self::save_at(self.progress_path(), progress.clone()).await
    }

    async fn clear_progress_async(&self) -> Result<()> {
        let path = self.progress_path();
        tokio::task::spawn_blocking(move || Self::remove_sync(&path))
            .await
            .context("state clear task panicked")?
    }
}
