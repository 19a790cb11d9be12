//! `campfire wake` — call a remote activation endpoint.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::Value;

use crate::app::AppContext;
use crate::output::{json, progress};

/// Client-side ceiling; the endpoint answers within its own activation
/// timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Args)]
pub struct WakeArgs {
    /// Activation endpoint base URL
    #[arg(long, env = "CAMPFIRE_ACTIVATION_URL")]
    pub url: String,

    /// Instance to start; defaults to the endpoint's own instance
    #[arg(long)]
    pub instance: Option<String>,
}

/// What the endpoint answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeReply {
    Accepted { previous: String, current: String },
    Denied { reason: String },
    /// The server is busy stopping; the same request succeeds later.
    RetryLater { reason: String },
    Failed { code: String, message: String },
}

/// Interprets an activation endpoint response.
#[must_use]
pub fn interpret(status: u16, body: &Value) -> WakeReply {
    let text = |key: &str| body.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    match status {
        202 => WakeReply::Accepted {
            previous: text("previous"),
            current: text("current"),
        },
        403 => {
            let reason = match text("reason").as_str() {
                "out_of_scope" => format!("instance '{}' is not served by this endpoint", text("requested")),
                "terminated" => "the server no longer exists".to_string(),
                other => other.to_string(),
            };
            WakeReply::Denied { reason }
        }
        409 => WakeReply::RetryLater {
            reason: match text("reason").as_str() {
                "stopping" => "the server is still stopping; try again in a moment".to_string(),
                "" => "the server is busy; try again in a moment".to_string(),
                other => other.to_string(),
            },
        },
        _ => WakeReply::Failed {
            code: Some(text("code")).filter(|c| !c.is_empty()).unwrap_or_else(|| status.to_string()),
            message: Some(text("message"))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("endpoint answered HTTP {status}")),
        },
    }
}

/// # Errors
///
/// Returns an error if the endpoint cannot be reached or reports a timeout
/// or platform failure.
pub async fn run(app: &AppContext, args: &WakeArgs) -> Result<ExitCode> {
    let base = args.url.trim_end_matches('/');
    let url = match &args.instance {
        Some(id) => format!("{base}/start/{id}"),
        None => format!("{base}/start"),
    };

    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("building HTTP client")?;

    let pb = progress::spinner_if(app.show_progress(), "Waking server...");
    let response = client.post(&url).send().await;
    progress::finish_clear(&pb);
    let response = response.with_context(|| format!("calling {url}"))?;

    let status = response.status().as_u16();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    tracing::info!(url = %url, status, "activation endpoint answered");

    let reply = interpret(status, &body);
    if app.is_json() && !matches!(reply, WakeReply::Failed { .. }) {
        json::print(&body)?;
    }
    match reply {
        WakeReply::Accepted { previous, current } => {
            if !app.is_json() {
                if previous == current {
                    app.output.success(&format!("Server already {current}"));
                } else {
                    app.output.success(&format!("Server {previous} → {current}"));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        WakeReply::Denied { reason } => {
            if !app.is_json() {
                app.output.error(&format!("Activation denied: {reason}"));
            }
            Ok(ExitCode::FAILURE)
        }
        WakeReply::RetryLater { reason } => {
            if !app.is_json() {
                app.output.warn(&format!("Not started: {reason}"));
            }
            Ok(ExitCode::FAILURE)
        }
        WakeReply::Failed { code, message } => bail!("activation failed ({code}): {message}"),
    }
}
