//! Output styles using owo-colors stylesheet pattern

use campfire_common::PlatformState;
use owo_colors::Style;

/// Centralized stylesheet for CLI output colors. All plain until
/// [`Styles::colorize`] is called.
#[derive(Default, Clone)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    /// Deploy progress steps
    pub step: Style,
    /// Keys and secondary text
    pub dim: Style,
    pub header: Style,
    /// The server's public address, the one thing players need
    pub address: Style,
    /// Power states the server can be played in
    pub up: Style,
    /// Power states in transition
    pub transitioning: Style,
    /// Stopped or gone
    pub down: Style,
}

impl Styles {
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.step = Style::new().cyan();
        self.dim = Style::new().dimmed();
        self.header = Style::new().bold().cyan();
        self.address = Style::new().bold().green();
        self.up = Style::new().green();
        self.transitioning = Style::new().yellow();
        self.down = Style::new().dimmed();
    }

    #[must_use]
    pub fn power(&self, state: PlatformState) -> Style {
        match state {
            PlatformState::Running => self.up,
            PlatformState::Pending | PlatformState::Stopping | PlatformState::ShuttingDown => {
                self.transitioning
            }
            PlatformState::Stopped | PlatformState::Terminated => self.down,
        }
    }
}
