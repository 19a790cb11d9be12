//! On-demand "wake up" for the game server.
//!
//! The gateway is scoped to exactly one instance. A request for any other
//! instance is denied before anything else happens. Starting is
//! fire-and-forget: the gateway asks the platform for the `Starting`
//! transition and returns without waiting for `Running`.
//!
//! A gateway that observes the platform also reads the [`ShutdownFlag`], so
//! an activation during the idle grace period cancels the shutdown on the
//! instance rather than only in its own machine.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::idle::ShutdownFlag;
use crate::power::PowerStateMachine;
use crate::types::{InstanceId, PlatformState, PowerState};

pub const DEFAULT_ACTIVATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Platform power operations for a single instance.
#[allow(async_fn_in_trait)]
pub trait PowerControl: ShutdownFlag {
    /// Ask the platform to start the instance. Must not wait for boot.
    async fn start(&self, instance: &InstanceId) -> anyhow::Result<()>;
    /// Ask the platform to stop the instance.
    async fn stop(&self, instance: &InstanceId) -> anyhow::Result<()>;
    /// Current platform view of the instance.
    async fn describe(&self, instance: &InstanceId) -> anyhow::Result<PlatformState>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenialReason {
    /// The request named an instance this gateway is not authorised for.
    OutOfScope { requested: String },
    /// The authorised instance no longer exists on the platform.
    Terminated,
    /// The instance is still stopping and cannot be started yet. Retry once
    /// it has stopped.
    Stopping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActivationOutcome {
    Accepted {
        previous: PowerState,
        current: PowerState,
    },
    Denied {
        #[serde(flatten)]
        reason: DenialReason,
    },
}

impl ActivationOutcome {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error(
        "start request for {instance} did not finish within {}s; check the instance state before retrying",
        timeout.as_secs()
    )]
    Timeout {
        instance: InstanceId,
        timeout: Duration,
    },

    #[error("platform request for {instance} failed: {source:#}")]
    Platform {
        instance: InstanceId,
        #[source]
        source: anyhow::Error,
    },
}

pub struct ActivationGateway<C> {
    scope: InstanceId,
    control: C,
    machine: Arc<PowerStateMachine>,
    timeout: Duration,
    sync_with_platform: bool,
}

impl<C: PowerControl> ActivationGateway<C> {
    #[must_use]
    pub fn new(scope: InstanceId, control: C, machine: Arc<PowerStateMachine>) -> Self {
        Self {
            scope,
            control,
            machine,
            timeout: DEFAULT_ACTIVATION_TIMEOUT,
            sync_with_platform: false,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Refresh the machine from `describe` before every activation.
    ///
    /// Needed whenever the gateway is not co-located with the idle monitor
    /// and so cannot see platform-side changes on its own.
    #[must_use]
    pub fn observing_platform(mut self) -> Self {
        self.sync_with_platform = true;
        self
    }

    #[must_use]
    pub fn scope(&self) -> &InstanceId {
        &self.scope
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn machine(&self) -> &Arc<PowerStateMachine> {
        &self.machine
    }

    /// Request that `target` transitions towards `Running`.
    ///
    /// Out-of-scope targets are denied with no state change and no platform
    /// call. The in-scope path is bounded by the configured timeout.
    pub async fn activate(
        &self,
        target: &InstanceId,
    ) -> Result<ActivationOutcome, ActivationError> {
        if target != &self.scope {
            tracing::warn!(requested = %target, scope = %self.scope, "activation denied: out of scope");
            return Ok(ActivationOutcome::Denied {
                reason: DenialReason::OutOfScope {
                    requested: target.to_string(),
                },
            });
        }

        let outcome = tokio::time::timeout(self.timeout, self.activate_in_scope())
            .await
            .map_err(|_| {
                tracing::warn!(instance = %self.scope, timeout_secs = self.timeout.as_secs(), "activation timed out");
                ActivationError::Timeout {
                    instance: self.scope.clone(),
                    timeout: self.timeout,
                }
            })??;

        tracing::info!(instance = %self.scope, ?outcome, "activation handled");
        Ok(outcome)
    }

    async fn activate_in_scope(&self) -> Result<ActivationOutcome, ActivationError> {
        if self.sync_with_platform {
            let observed = self
                .control
                .describe(&self.scope)
                .await
                .map_err(|source| self.platform_error(source))?;
            if observed == PlatformState::Stopping {
                tracing::info!(instance = %self.scope, "activation deferred: instance still stopping");
                return Ok(ActivationOutcome::Denied {
                    reason: DenialReason::Stopping,
                });
            }
            match observed.power_state() {
                Some(PowerState::Running) => {
                    let pending = self
                        .control
                        .shutdown_pending(&self.scope)
                        .await
                        .map_err(|source| self.platform_error(source))?;
                    if pending {
                        self.machine.observe(PowerState::IdlePendingShutdown);
                    } else {
                        // The flag is authoritative once read; a cleared flag ends any stale grace.
                        self.machine.observe(PowerState::Running);
                        let _ = self
                            .machine
                            .transition(PowerState::IdlePendingShutdown, PowerState::Running);
                    }
                }
                Some(state) => {
                    self.machine.observe(state);
                }
                None => {
                    return Ok(ActivationOutcome::Denied {
                        reason: DenialReason::Terminated,
                    });
                }
            }
        }

        let previous = self.machine.current();
        match previous {
            PowerState::Stopped => {
                if self
                    .machine
                    .transition(PowerState::Stopped, PowerState::Starting)
                    .is_err()
                {
                    // Another actor moved the machine first; nothing left to do.
                    return Ok(ActivationOutcome::Accepted {
                        previous,
                        current: self.machine.current(),
                    });
                }
                if let Err(source) = self.control.start(&self.scope).await {
                    self.machine.observe(PowerState::Stopped);
                    return Err(self.platform_error(source));
                }
                Ok(ActivationOutcome::Accepted {
                    previous,
                    current: PowerState::Starting,
                })
            }
            PowerState::IdlePendingShutdown => {
                let _ = self
                    .machine
                    .transition(PowerState::IdlePendingShutdown, PowerState::Running);
                if self.sync_with_platform {
                    self.control
                        .set_shutdown_pending(&self.scope, false)
                        .await
                        .map_err(|source| self.platform_error(source))?;
                    tracing::info!(instance = %self.scope, "pending idle shutdown cancelled");
                }
                Ok(ActivationOutcome::Accepted {
                    previous,
                    current: self.machine.current(),
                })
            }
            PowerState::Starting | PowerState::Running => Ok(ActivationOutcome::Accepted {
                previous,
                current: previous,
            }),
        }
    }

    fn platform_error(&self, source: anyhow::Error) -> ActivationError {
        ActivationError::Platform {
            instance: self.scope.clone(),
            source,
        }
    }
}
