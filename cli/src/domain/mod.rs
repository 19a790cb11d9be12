//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod compute;
pub mod config;
pub mod deployment;
pub mod error;
pub mod ids;
pub mod placement;
pub mod save_store;
pub mod security;
pub mod startup;

pub use config::{DeploymentConfig, validate_config_key, validate_config_value};
pub use deployment::{DeployProgress, DeploymentOutputs, DeploymentState, StatusReport};
pub use error::{ConfigError, DeployError, ResolutionError};
