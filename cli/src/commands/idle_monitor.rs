//! `campfire _idle-monitor` — the on-instance auto-shutdown loop.
//!
//! Installed as the `auto-shutdown` systemd service. Exits on SIGTERM or
//! Ctrl-C, or after powering the host off. The pending shutdown is published
//! on the instance so the activation endpoint can cancel it.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use campfire_common::{InstanceId, PowerState, PowerStateMachine};
use clap::Args;

use crate::application::services::idle_monitor::{self, MonitorExit};
use crate::domain::config::IdleConfig;
use crate::infra::activity::SocketActivity;
use crate::infra::platform::{CLOUD_INIT_INSTANCE_ID, PLATFORM_ENV, PowerBackend, read_instance_id};
use crate::infra::power::ShutdownHost;

#[derive(Args)]
pub struct IdleMonitorArgs {
    /// Port the game server listens on
    #[arg(long, default_value_t = 7777)]
    pub game_port: u16,

    /// Minutes without players before shutdown is scheduled
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..))]
    pub threshold_minutes: u64,

    /// Minutes between scheduling shutdown and powering off
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub grace_minutes: u64,

    /// Seconds between activity samples
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_seconds: u64,

    /// Instance this monitor runs on [default: read from cloud-init]
    #[arg(long, env = "CAMPFIRE_INSTANCE_ID", value_parser = InstanceId::parse)]
    pub instance_id: Option<InstanceId>,

    /// Platform holding the shutdown flag: `aws` or `inventory`
    #[arg(long, env = PLATFORM_ENV, default_value = "aws")]
    pub platform: String,

    /// Region passed to the platform CLI
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,
}

impl IdleMonitorArgs {
    #[must_use]
    pub fn idle_config(&self) -> IdleConfig {
        IdleConfig {
            threshold_minutes: self.threshold_minutes,
            grace_minutes: self.grace_minutes,
            poll_seconds: self.poll_seconds,
        }
    }
}

/// # Errors
///
/// Returns an error if the instance id or platform cannot be resolved, or
/// the host cannot be powered off.
pub async fn run(args: &IdleMonitorArgs) -> Result<ExitCode> {
    let instance = match &args.instance_id {
        Some(id) => id.clone(),
        None => read_instance_id(Path::new(CLOUD_INIT_INSTANCE_ID))?,
    };
    let platform = PowerBackend::named(&args.platform, args.region.clone())?;
    let activity = SocketActivity::local(args.game_port);
    let host = ShutdownHost::local();
    // The service starts once boot has finished.
    let machine = Arc::new(PowerStateMachine::new(PowerState::Starting));
    tracing::info!(port = args.game_port, instance = %instance, "watching game port");

    let exit = idle_monitor::run(
        &activity,
        &host,
        &platform,
        &instance,
        machine,
        args.idle_config().policy(),
        shutdown_signal(),
    )
    .await?;
    match exit {
        MonitorExit::PoweredOff | MonitorExit::Interrupted => Ok(ExitCode::SUCCESS),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
