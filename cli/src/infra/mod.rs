//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, config
//! and state files, the JSON inventory, and power/activity probes.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod activity;
pub mod command_runner;
pub mod config;
pub mod fs;
pub mod inventory;
pub mod platform;
pub mod power;
pub mod state;
