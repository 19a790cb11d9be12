//! Application services — use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports` — never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod compute;
pub mod config_service;
pub mod deploy;
pub mod idle_monitor;
pub mod network;
pub mod power;
pub mod save_store;
pub mod startup;

#[cfg(test)]
pub(crate) mod test_support;
