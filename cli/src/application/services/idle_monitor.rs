//! Application service — on-instance idle shutdown loop.
//!
//! Samples player activity every poll interval and feeds it to the
//! [`IdleMonitor`]. Powers the host off once the monitor says so.
//!
//! The pending shutdown is published through a [`ShutdownFlag`] so that an
//! activation handled off the instance can cancel it. A flag that was
//! cleared while the monitor waited counts as a cancellation.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use campfire_common::{
    IdleMonitor, IdlePolicy, InstanceId, MonitorDecision, PowerState, PowerStateMachine,
    ShutdownFlag,
};
use tokio::time::{Instant, MissedTickBehavior};

use crate::application::ports::{ActivitySource, HostPower};

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// Idle for threshold + grace; the host was told to power off.
    PoweredOff,
    /// `shutdown` resolved first.
    Interrupted,
}

/// Runs until the host is powered off or `shutdown` resolves.
///
/// `machine` is shared with any co-located activation path and must be
/// `Starting` or `Running` on entry. A failed activity sample is logged and
/// skipped; it never counts as idle. So is a failed flag read while a
/// shutdown is pending.
///
/// # Errors
///
/// Returns an error if the machine cannot leave `Starting` or the power-off
/// request fails.
pub async fn run(
    activity: &impl ActivitySource,
    host: &impl HostPower,
    flag: &impl ShutdownFlag,
    instance: &InstanceId,
    machine: Arc<PowerStateMachine>,
    policy: IdlePolicy,
    shutdown: impl Future<Output = ()>,
) -> Result<MonitorExit> {
    // The service starts once boot has finished.
    machine.boot_complete()?;
    if let Err(e) = flag.set_shutdown_pending(instance, false).await {
        tracing::warn!(instance = %instance, error = %e, "could not clear stale shutdown flag");
    }
    let mut monitor = IdleMonitor::new(policy, Arc::clone(&machine), Instant::now().into_std());
    let mut published = false;

    let mut ticker = tokio::time::interval(policy.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    tracing::info!(
        instance = %instance,
        threshold_secs = policy.threshold.as_secs(),
        grace_secs = policy.grace.as_secs(),
        poll_secs = policy.poll_interval.as_secs(),
        "idle monitor started"
    );

    loop {
        tokio::select! {
            () = &mut shutdown => {
                tracing::info!("idle monitor interrupted");
                return Ok(MonitorExit::Interrupted);
            }
            _ = ticker.tick() => {}
        }

        let players = match activity.active_players().await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "could not sample player activity");
                continue;
            }
        };

        if machine.current() == PowerState::IdlePendingShutdown {
            match flag.shutdown_pending(instance).await {
                Ok(true) => {}
                Ok(false) => {
                    published = false;
                    if machine
                        .transition(PowerState::IdlePendingShutdown, PowerState::Running)
                        .is_ok()
                    {
                        tracing::info!(instance = %instance, "pending shutdown cancelled by activation");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not read shutdown flag");
                    continue;
                }
            }
        }

        let decision = monitor.tick(Instant::now().into_std(), players);
        tracing::debug!(players, ?decision, "idle tick");
        match decision {
            MonitorDecision::ShutdownPending => {
                match flag.set_shutdown_pending(instance, true).await {
                    Ok(()) => published = true,
                    Err(e) => {
                        // Unpublished, an activation could not cancel it.
                        tracing::warn!(error = %e, "could not publish pending shutdown");
                        let _ = machine
                            .transition(PowerState::IdlePendingShutdown, PowerState::Running);
                    }
                }
            }
            MonitorDecision::PowerOff => {
                host.power_off().await?;
                return Ok(MonitorExit::PoweredOff);
            }
            MonitorDecision::KeepRunning
            | MonitorDecision::AwaitingGrace
            | MonitorDecision::Resumed
            | MonitorDecision::Inactive => {}
        }

        if published && machine.current() != PowerState::IdlePendingShutdown {
            match flag.set_shutdown_pending(instance, false).await {
                Ok(()) => published = false,
                Err(e) => tracing::warn!(error = %e, "could not clear shutdown flag"),
            }
        }
    }
}
