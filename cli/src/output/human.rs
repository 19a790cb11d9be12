//! Human-readable terminal renderer.

use std::path::Path;

use campfire_common::{ActivationOutcome, DenialReason, PlatformState};
use owo_colors::OwoColorize as _;

use crate::application::services::deploy::DeploymentPlan;
use crate::domain::compute::{Access, InstanceChange};
use crate::domain::{DeploymentOutputs, StatusReport};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    pub fn render_version(&self, version: &str) {
        println!("campfire {version}");
    }

    /// Render the configuration file as YAML under a header naming its path.
    pub fn render_config(&self, path: &Path, yaml: &str) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        for line in yaml.lines() {
            println!("  {line}");
        }
        println!();
    }

    /// Render what a deploy would do.
    pub fn render_plan(&self, plan: &DeploymentPlan) {
        let decl = &plan.declaration;
        let ctx = self.ctx;

        ctx.header("Network:");
        ctx.kv("network:", &decl.network.network.id);
        for subnet in decl.network.subnets.subnets() {
            let marker = if subnet.id == decl.subnet().id {
                " (placement)"
            } else {
                ""
            };
            ctx.kv(
                "subnet:",
                &format!("{} {}{marker}", subnet.id, subnet.availability_zone),
            );
        }

        println!();
        ctx.header("Security policy:");
        for rule in &decl.security_policy.ingress {
            ctx.kv(
                &format!("{:>5}/{}", rule.port, rule.protocol.as_str()),
                &format!("{} from {}", rule.description, rule.source),
            );
        }

        println!();
        ctx.header("Save store:");
        ctx.kv(
            &format!("{}:", plan.store.action()),
            &plan.store.store().name,
        );

        println!();
        ctx.header("Instance:");
        ctx.kv("name:", &decl.name);
        ctx.kv("type:", &decl.instance_type);
        ctx.kv("image:", &decl.image);
        ctx.kv(
            "root volume:",
            &format!(
                "{} {} GiB {}",
                decl.root_volume.device_name, decl.root_volume.size_gb, decl.root_volume.volume_type
            ),
        );
        ctx.kv("role:", &decl.role.name);
        for grant in &decl.role.grants {
            let access = match grant.access {
                Access::Read => "read",
                Access::ReadWrite => "read-write",
            };
            ctx.kv(&format!("  {access}:"), &grant.resource);
        }

        println!();
        ctx.header("Startup:");
        for (i, step) in plan.sequence.steps().iter().enumerate() {
            ctx.kv(&format!("{}.", i + 1), &step.summary());
        }

        println!();
        match &plan.change {
            InstanceChange::Create => ctx.info("A new instance will be launched"),
            InstanceChange::Unchanged { id } => ctx.success(&format!("Instance {id} is up to date")),
            InstanceChange::Replace { previous, reasons } => ctx.warn(&format!(
                "Instance {previous} will be replaced: {}",
                reasons.join(", ")
            )),
        }
        if plan.activation_enabled {
            ctx.info("Activation endpoint enabled");
        }
    }

    /// Render deployment outputs.
    pub fn render_outputs(&self, outputs: &DeploymentOutputs) {
        let ctx = self.ctx;
        ctx.kv(
            "Public IP:",
            &outputs.public_ip.style(ctx.styles.address).to_string(),
        );
        ctx.kv("Instance:", outputs.instance_id.as_str());
        ctx.kv(
            "Save store:",
            &format!("{} ({})", outputs.save_store, outputs.save_store_lifecycle),
        );
        if let Some(target) = &outputs.activation_target {
            ctx.kv("Activation:", &format!("starts {target}"));
        }
        if let Some(hint) = &outputs.pin_store_hint {
            println!();
            ctx.info(&format!("Keep this save store on redeploy: {hint}"));
        }
    }

    /// Render persisted deployment plus live power state.
    pub fn render_status(&self, report: &StatusReport) {
        let ctx = self.ctx;
        match (report.power, &report.power_error) {
            (Some(state), _) => ctx.kv(
                "Power:",
                &platform_state_display(state)
                    .style(ctx.styles.power(state))
                    .to_string(),
            ),
            (None, Some(e)) => ctx.warn(&format!("Power state unavailable: {e}")),
            (None, None) => ctx.kv("Power:", "unknown"),
        }
        ctx.kv("Type:", &report.instance_type);
        ctx.kv(
            "Deployed:",
            &report.deployed_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        );
        self.render_outputs(&report.outputs);
    }

    /// Render an activation result.
    pub fn render_activation(&self, outcome: &ActivationOutcome) {
        match outcome {
            ActivationOutcome::Accepted { previous, current } if previous == current => {
                self.ctx.success(&format!("Server already {current}"));
            }
            ActivationOutcome::Accepted { previous, current } => {
                self.ctx.success(&format!("Server {previous} → {current}"));
            }
            ActivationOutcome::Denied { reason } => {
                self.ctx.error(&format!("Activation denied: {}", denial_display(reason)));
            }
        }
    }

    pub fn render_stop(&self, state: PlatformState) {
        self.ctx
            .success(&format!("Server {}", platform_state_display(state)));
    }
}

#[must_use]
pub fn platform_state_display(state: PlatformState) -> &'static str {
    match state {
        PlatformState::Pending => "starting",
        PlatformState::Running => "running",
        PlatformState::Stopping => "stopping",
        PlatformState::Stopped => "stopped",
        PlatformState::ShuttingDown => "terminating",
        PlatformState::Terminated => "terminated",
    }
}

#[must_use]
pub fn denial_display(reason: &DenialReason) -> String {
    match reason {
        DenialReason::OutOfScope { requested } => {
            format!("instance '{requested}' is not the deployed server")
        }
        DenialReason::Terminated => "the deployed server no longer exists".to_string(),
        DenialReason::Stopping => {
            "the server is still stopping; try again in a moment".to_string()
        }
    }
}
