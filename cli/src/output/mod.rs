//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use std::path::Path;

use anyhow::Result;
use campfire_common::{ActivationOutcome, PlatformState};
use console::Term;
use owo_colors::OwoColorize as _;
use serde::Serialize;
pub use human::HumanRenderer;
pub use reporter::{LogReporter, TerminalReporter};
pub use styles::Styles;

use crate::application::services::deploy::DeploymentPlan;
use crate::domain::{DeploymentConfig, DeploymentOutputs, StatusReport};

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<14} {value}", key.style(self.styles.dim));
        }
    }
}

/// Dispatches rendering to the human or JSON presentation.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json,
}

impl Renderer<'_> {
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json => json::print(&serde_json::json!({ "version": version })),
        }
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_config(&self, config: &DeploymentConfig, path: &Path) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_config(path, &serde_yaml::to_string(config)?);
                Ok(())
            }
            Self::Json => json::print(config),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_plan(&self, plan: &DeploymentPlan) -> Result<()> {
        self.either(plan, |r| r.render_plan(plan))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_outputs(&self, outputs: &DeploymentOutputs) -> Result<()> {
        self.either(outputs, |r| r.render_outputs(outputs))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_status(&self, report: &StatusReport) -> Result<()> {
        self.either(report, |r| r.render_status(report))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_activation(&self, outcome: &ActivationOutcome) -> Result<()> {
        self.either(outcome, |r| r.render_activation(outcome))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_stop(&self, state: PlatformState) -> Result<()> {
        self.either(&serde_json::json!({ "state": state }), |r| r.render_stop(state))
    }

    fn either<T: Serialize + ?Sized>(&self, value: &T, human: impl FnOnce(&HumanRenderer<'_>)) -> Result<()> {
        match self {
            Self::Human(r) => {
                human(r);
                Ok(())
            }
            Self::Json => json::print(value),
        }
    }
}
