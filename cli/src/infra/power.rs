//! Power control through external commands.
//!
//! `AwsCliPowerControl` drives the deployed instance from the operator's
//! machine with `aws ec2`, and publishes the pending idle shutdown as an
//! instance tag. `ShutdownHost` powers off the machine the idle monitor runs
//! on.

use anyhow::{Context, Result, bail};
use campfire_common::{
    InstanceId, PlatformState, PowerControl, SHUTDOWN_PENDING, SHUTDOWN_TAG, ShutdownFlag,
};

use crate::application::ports::{CommandRunner, HostPower};
use crate::infra::command_runner::TokioCommandRunner;

/// `PowerControl` over the `aws ec2` command line.
pub struct AwsCliPowerControl<R: CommandRunner> {
    runner: R,
    region: Option<String>,
}

impl<R: CommandRunner> AwsCliPowerControl<R> {
    /// `region` is passed as `--region` when set; otherwise the CLI's own
    /// configuration decides.
    pub fn new(runner: R, region: Option<String>) -> Self {
        Self { runner, region }
    }

    async fn ec2(&self, args: &[&str]) -> Result<String> {
        let mut full = vec!["ec2"];
        full.extend_from_slice(args);
        full.extend_from_slice(&["--output", "text"]);
        if let Some(region) = &self.region {
            full.extend_from_slice(&["--region", region.as_str()]);
        }
        let subcommand = args.first().copied().unwrap_or_default();
        let output = self
            .runner
            .run("aws", &full)
            .await
            .with_context(|| format!("aws ec2 {subcommand}"))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("aws ec2 {subcommand} failed: {}", stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl<R: CommandRunner> ShutdownFlag for AwsCliPowerControl<R> {
    async fn shutdown_pending(&self, instance: &InstanceId) -> Result<bool> {
        let resource = format!("Name=resource-id,Values={instance}");
        let key = format!("Name=key,Values={SHUTDOWN_TAG}");
        let raw = self
            .ec2(&[
                "describe-tags",
                "--filters",
                resource.as_str(),
                key.as_str(),
                "--query",
                "Tags[0].Value",
            ])
            .await?;
        Ok(raw == SHUTDOWN_PENDING)
    }

    async fn set_shutdown_pending(&self, instance: &InstanceId, pending: bool) -> Result<()> {
        let tag = if pending {
            format!("Key={SHUTDOWN_TAG},Value={SHUTDOWN_PENDING}")
        } else {
            format!("Key={SHUTDOWN_TAG}")
        };
        let subcommand = if pending { "create-tags" } else { "delete-tags" };
        self.ec2(&[subcommand, "--resources", instance.as_str(), "--tags", tag.as_str()])
            .await
            .map(drop)
    }
}

impl<R: CommandRunner> PowerControl for AwsCliPowerControl<R> {
    async fn start(&self, instance: &InstanceId) -> Result<()> {
        self.ec2(&["start-instances", "--instance-ids", instance.as_str()])
            .await
            .map(drop)
    }

    async fn stop(&self, instance: &InstanceId) -> Result<()> {
        self.ec2(&["stop-instances", "--instance-ids", instance.as_str()])
            .await
            .map(drop)
    }

    async fn describe(&self, instance: &InstanceId) -> Result<PlatformState> {
        let raw = self
            .ec2(&[
                "describe-instances",
                "--instance-ids",
                instance.as_str(),
                "--query",
                "Reservations[0].Instances[0].State.Name",
            ])
            .await?;
        PlatformState::parse(&raw).with_context(|| format!("unexpected state for {instance}"))
    }
}

/// Powers off the local host with `shutdown -h now`.
pub struct ShutdownHost<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> ShutdownHost<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl ShutdownHost<TokioCommandRunner> {
    #[must_use]
    pub fn local() -> Self {
        Self::new(TokioCommandRunner::default())
    }
}

impl<R: CommandRunner> HostPower for ShutdownHost<R> {
    async fn power_off(&self) -> Result<()> {
        tracing::warn!("powering off host");
        let output = self
            .runner
            .run("shutdown", &["-h", "now"])
            .await
            .context("shutdown -h now")?;
        if !output.status.success() {
            bail!(
                "shutdown failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
