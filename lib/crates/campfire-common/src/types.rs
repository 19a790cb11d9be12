use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing platform identifiers and states.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InstanceIdError {
    #[error("Invalid instance ID '{0}': expected 'i-' followed by 8 or 17 lowercase hex characters")]
    Malformed(String),

    #[error("Unknown platform instance state '{0}'")]
    UnknownState(String),
}

/// Platform identity of a compute instance (e.g. `i-0123456789abcdef0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceId(String);

impl InstanceId {
    /// Parses and validates an instance identifier.
    ///
    /// A valid ID is `i-` followed by exactly 8 or 17 lowercase hex characters.
    pub fn parse(raw: &str) -> Result<Self, InstanceIdError> {
        let Some(hex) = raw.strip_prefix("i-") else {
            return Err(InstanceIdError::Malformed(raw.to_string()));
        };
        let lower_hex = hex
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !(hex.len() == 8 || hex.len() == 17) || !lower_hex {
            return Err(InstanceIdError::Malformed(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InstanceId {
    type Err = InstanceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InstanceId {
    type Error = InstanceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InstanceId> for String {
    fn from(id: InstanceId) -> Self {
        id.0
    }
}

/// Runtime power state of the game server instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    Stopped,
    Starting,
    Running,
    IdlePendingShutdown,
}

impl PowerState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::IdlePendingShutdown => "idle_pending_shutdown",
        }
    }

    /// Whether `self -> next` is an edge of the power state machine.
    #[must_use]
    pub fn can_transition_to(self, next: PowerState) -> bool {
        matches!(
            (self, next),
            (Self::Stopped, Self::Starting)
                | (Self::Starting, Self::Running)
                | (Self::Running, Self::IdlePendingShutdown)
                | (Self::IdlePendingShutdown, Self::Stopped | Self::Running)
        )
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instance state as reported by the cloud platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformState {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
}

impl PlatformState {
    /// Parses the platform's state name (`pending`, `running`, `shutting-down`, ...).
    pub fn parse(raw: &str) -> Result<Self, InstanceIdError> {
        match raw.trim() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "stopping" => Ok(Self::Stopping),
            "stopped" => Ok(Self::Stopped),
            "shutting-down" => Ok(Self::ShuttingDown),
            "terminated" => Ok(Self::Terminated),
            other => Err(InstanceIdError::UnknownState(other.to_string())),
        }
    }

    /// Maps the platform view onto the power state machine.
    ///
    /// Returns `None` for instances that are gone or going away; those have no
    /// place in the machine because there is no destroy transition.
    #[must_use]
    pub fn power_state(self) -> Option<PowerState> {
        match self {
            Self::Pending => Some(PowerState::Starting),
            Self::Running => Some(PowerState::Running),
            Self::Stopping | Self::Stopped => Some(PowerState::Stopped),
            Self::ShuttingDown | Self::Terminated => None,
        }
    }
}
