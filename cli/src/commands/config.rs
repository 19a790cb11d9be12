//! `campfire config` — show, create, validate and set configuration values.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::services::config_service;
use crate::output::json;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write a sample configuration
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Check the configuration for errors
    Validate,
    /// Set configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read, written or is
/// invalid.
pub fn run(app: &AppContext, cmd: ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => show(app),
        ConfigCommand::Path => path(app),
        ConfigCommand::Init { force } => init(app, force),
        ConfigCommand::Validate => validate(app),
        ConfigCommand::Set { key, value } => set(app, &key, &value),
    }
}

fn show(app: &AppContext) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let path = app.config_store.path()?;
    app.renderer().render_config(&config, &path)?;
    Ok(ExitCode::SUCCESS)
}

fn path(app: &AppContext) -> Result<ExitCode> {
    let path = app.config_store.path()?;
    if app.is_json() {
        json::print(&serde_json::json!({ "path": path }))?;
    } else {
        println!("{}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn init(app: &AppContext, force: bool) -> Result<ExitCode> {
    let path = config_service::init_config(&app.config_store, force)?;
    if app.is_json() {
        json::print(&serde_json::json!({ "path": path }))?;
    } else {
        app.output
            .success(&format!("Wrote sample configuration to {}", path.display()));
        app.output
            .info("Add scripts/install.sh and scripts/auto-shutdown.sh next to it, then run: campfire plan");
    }
    Ok(ExitCode::SUCCESS)
}

fn validate(app: &AppContext) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    config.validate()?;
    if app.is_json() {
        json::print(&serde_json::json!({ "valid": true }))?;
    } else {
        app.output.success("Configuration is valid");
    }
    Ok(ExitCode::SUCCESS)
}

fn set(app: &AppContext, key: &str, value: &str) -> Result<ExitCode> {
    config_service::set_value(&app.config_store, key, value)?;
    if app.is_json() {
        json::print(&serde_json::json!({ "key": key, "value": value }))?;
    } else {
        app.output.success(&format!("Set {key} = {value}"));
    }
    Ok(ExitCode::SUCCESS)
}
