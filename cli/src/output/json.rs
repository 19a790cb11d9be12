//! JSON output helpers.
//!
//! Every `--json` code path prints exactly one pretty-printed document on
//! stdout: the command's result, or the error object below.

use anyhow::{Context, Result};
use serde::Serialize;

/// Format the JSON error object:
///
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Print `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
    println!("{text}");
    Ok(())
}

/// Stable machine-readable code for a top-level error.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    use crate::domain::{ConfigError, DeployError, ResolutionError};

    if let Some(e) = err.downcast_ref::<ResolutionError>() {
        return match e {
            ResolutionError::NetworkNotFound(_) => "network_not_found",
            ResolutionError::NoDefaultNetwork => "no_default_network",
            ResolutionError::SubnetNotFound { .. } => "subnet_not_found",
            ResolutionError::NoPublicSubnet(_) => "no_public_subnet",
            ResolutionError::StoreNotFound(_) => "store_not_found",
        };
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return "invalid_config";
    }
    if let Some(e) = err.downcast_ref::<DeployError>() {
        return match e {
            DeployError::NotDeployed => "not_deployed",
            DeployError::ReplacementDeclined => "replacement_declined",
            DeployError::NoAddressAvailable => "no_address_available",
            DeployError::ActivationDisabled => "activation_disabled",
        };
    }
    if let Some(e) = err.downcast_ref::<campfire_common::ActivationError>() {
        return match e {
            campfire_common::ActivationError::Timeout { .. } => "timeout",
            campfire_common::ActivationError::Platform { .. } => "platform_error",
        };
    }
    "error"
}
