//! `PowerControl` backed by the `aws ec2` command line.
//!
//! The pending idle shutdown is published as an instance tag, so the
//! monitor on the instance and this gateway share one view of it.

use anyhow::{bail, Context, Result};
use campfire_common::{
    InstanceId, PlatformState, PowerControl, ShutdownFlag, SHUTDOWN_PENDING, SHUTDOWN_TAG,
};
use tokio::process::Command;

const DEFAULT_PROGRAM: &str = "aws";

#[derive(Debug, Clone)]
pub struct Ec2PowerControl {
    program: String,
    region: Option<String>,
}

impl Ec2PowerControl {
    #[must_use]
    pub fn new(region: Option<String>) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            region,
        }
    }

    /// Use a different executable in place of `aws`.
    #[cfg(test)]
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn ec2(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("ec2").args(args).args(["--output", "text"]);
        if let Some(region) = &self.region {
            cmd.args(["--region", region]);
        }
        // A timed-out activation drops this future; take the child with it.
        cmd.kill_on_drop(true);

        let subcommand = args.first().copied().unwrap_or_default();
        tracing::debug!(program = %self.program, subcommand, "invoking platform CLI");
        let output = cmd
            .output()
            .await
            .with_context(|| format!("failed to run {} ec2 {subcommand}", self.program))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} ec2 {subcommand} failed: {}", self.program, stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl ShutdownFlag for Ec2PowerControl {
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
        if pending {
            let tag = format!("Key={SHUTDOWN_TAG},Value={SHUTDOWN_PENDING}");
            self.ec2(&["create-tags", "--resources", instance.as_str(), "--tags", tag.as_str()])
                .await
                .map(drop)
        } else {
            let tag = format!("Key={SHUTDOWN_TAG}");
            self.ec2(&["delete-tags", "--resources", instance.as_str(), "--tags", tag.as_str()])
                .await
                .map(drop)
        }
    }
}

impl PowerControl for Ec2PowerControl {
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
