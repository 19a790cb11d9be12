//! Idle detection for the auto-shutdown service.
//!
//! [`IdleMonitor`] is clock-agnostic: the caller supplies `now` and the number
//! of active players on every tick, which keeps the timing rules testable
//! without sleeping. All state changes go through the shared
//! [`PowerStateMachine`], so an activation that cancels a pending shutdown is
//! seen by the monitor on its next tick.
//!
//! The monitor runs on the instance and the activation gateway does not, so
//! each owns a machine. [`ShutdownFlag`] carries `IdlePendingShutdown`
//! between them: the monitor raises the flag when shutdown becomes pending,
//! an activation clears it, and the monitor reads a cleared flag as a
//! cancellation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::power::PowerStateMachine;
use crate::types::{InstanceId, PowerState};

pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(20 * 60);
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Instance tag holding the published flag.
pub const SHUTDOWN_TAG: &str = "campfire:idle-shutdown";
/// Tag value while a shutdown is pending. The tag is absent otherwise.
pub const SHUTDOWN_PENDING: &str = "pending";

/// Platform-side record of a pending idle shutdown.
#[allow(async_fn_in_trait)]
pub trait ShutdownFlag {
    /// Whether a shutdown is pending for `instance`.
    async fn shutdown_pending(&self, instance: &InstanceId) -> anyhow::Result<bool>;
    /// Raise or clear the flag.
    async fn set_shutdown_pending(
        &self,
        instance: &InstanceId,
        pending: bool,
    ) -> anyhow::Result<()>;
}

impl<T: ShutdownFlag + ?Sized> ShutdownFlag for &T {
    async fn shutdown_pending(&self, instance: &InstanceId) -> anyhow::Result<bool> {
        (**self).shutdown_pending(instance).await
    }

    async fn set_shutdown_pending(
        &self,
        instance: &InstanceId,
        pending: bool,
    ) -> anyhow::Result<()> {
        (**self).set_shutdown_pending(instance, pending).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdlePolicy {
    /// Inactivity after which shutdown becomes pending.
    pub threshold: Duration,
    /// Time spent pending before the instance powers off.
    pub grace: Duration,
    /// How often the service samples player activity.
    pub poll_interval: Duration,
}

impl Default for IdlePolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_IDLE_THRESHOLD,
            grace: DEFAULT_GRACE_PERIOD,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What the monitor concluded on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorDecision {
    /// Players are connected or the idle threshold has not elapsed.
    KeepRunning,
    /// Threshold elapsed with no activity; shutdown is now pending.
    ShutdownPending,
    /// Still idle, grace period not over yet.
    AwaitingGrace,
    /// Activity came back while shutdown was pending.
    Resumed,
    /// Grace elapsed with no activity; the instance must power off now.
    PowerOff,
    /// The machine is stopped or still booting; nothing to watch.
    Inactive,
}

#[derive(Debug)]
pub struct IdleMonitor {
    policy: IdlePolicy,
    machine: Arc<PowerStateMachine>,
    last_activity: Instant,
    pending_since: Option<Instant>,
}

impl IdleMonitor {
    /// Start watching; `now` counts as the last moment of activity.
    #[must_use]
    pub fn new(policy: IdlePolicy, machine: Arc<PowerStateMachine>, now: Instant) -> Self {
        Self {
            policy,
            machine,
            last_activity: now,
            pending_since: None,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &IdlePolicy {
        &self.policy
    }

    #[must_use]
    pub fn machine(&self) -> &Arc<PowerStateMachine> {
        &self.machine
    }

    pub fn tick(&mut self, now: Instant, active_players: u32) -> MonitorDecision {
        match self.machine.current() {
            PowerState::Running => self.tick_running(now, active_players),
            PowerState::IdlePendingShutdown => self.tick_pending(now, active_players),
            PowerState::Starting | PowerState::Stopped => {
                self.last_activity = now;
                self.pending_since = None;
                MonitorDecision::Inactive
            }
        }
    }

    fn tick_running(&mut self, now: Instant, active_players: u32) -> MonitorDecision {
        // Pending shutdown was cancelled by someone else (activation).
        if self.pending_since.take().is_some() {
            self.last_activity = now;
        }
        if active_players > 0 {
            self.last_activity = now;
            return MonitorDecision::KeepRunning;
        }
        let idle_for = now.saturating_duration_since(self.last_activity);
        if idle_for < self.policy.threshold {
            return MonitorDecision::KeepRunning;
        }
        match self
            .machine
            .transition(PowerState::Running, PowerState::IdlePendingShutdown)
        {
            Ok(_) => {
                tracing::info!(idle_secs = idle_for.as_secs(), "no player activity, shutdown pending");
                self.pending_since = Some(now);
                MonitorDecision::ShutdownPending
            }
            Err(e) => {
                tracing::debug!(error = %e, "lost race entering idle state");
                MonitorDecision::KeepRunning
            }
        }
    }

    fn tick_pending(&mut self, now: Instant, active_players: u32) -> MonitorDecision {
        if active_players > 0 {
            self.last_activity = now;
            self.pending_since = None;
            if let Err(e) = self
                .machine
                .transition(PowerState::IdlePendingShutdown, PowerState::Running)
            {
                tracing::debug!(error = %e, "pending shutdown already resolved");
            }
            tracing::info!(active_players, "player activity resumed, shutdown cancelled");
            return MonitorDecision::Resumed;
        }
        let since = *self.pending_since.get_or_insert(now);
        if now.saturating_duration_since(since) < self.policy.grace {
            return MonitorDecision::AwaitingGrace;
        }
        match self
            .machine
            .transition(PowerState::IdlePendingShutdown, PowerState::Stopped)
        {
            Ok(_) => {
                tracing::info!("grace period elapsed with no activity, powering off");
                self.pending_since = None;
                MonitorDecision::PowerOff
            }
            Err(e) => {
                tracing::info!(error = %e, "shutdown cancelled before grace period ended");
                self.last_activity = now;
                self.pending_since = None;
                MonitorDecision::KeepRunning
            }
        }
    }
}
