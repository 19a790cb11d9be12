//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Resolution errors ─────────────────────────────────────────────────────────

/// An identifier could not be turned into a concrete resource.
///
/// Always fatal: provisioning never substitutes a default for an explicit
/// identifier that does not resolve.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Network '{0}' does not exist. Fix instance.vpc_id or clear it to use the default network.")]
    NetworkNotFound(String),

    #[error("No default network found in this account/region. Set instance.vpc_id explicitly.")]
    NoDefaultNetwork,

    #[error("Subnet '{id}' in availability zone '{availability_zone}' does not exist in network '{network}'.")]
    SubnetNotFound {
        id: String,
        availability_zone: String,
        network: String,
    },

    #[error("Network '{0}' has no publicly routable subnet. Set instance.subnet_id and instance.availability_zone.")]
    NoPublicSubnet(String),

    #[error("Save store '{0}' does not exist. Fix save_store.name or clear it to create a new store.")]
    StoreNotFound(String),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },

    #[error("Invalid configuration:\n{0}")]
    Invalid(String),
}

// ── Deploy errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("No deployment found. Run 'campfire deploy' first.")]
    NotDeployed,

    #[error("Deployment cancelled: instance replacement was not confirmed.")]
    ReplacementDeclined,

    #[error("No public address available to allocate.")]
    NoAddressAvailable,

    #[error("Activation is disabled. Set activation.enabled to true and redeploy.")]
    ActivationDisabled,
}
