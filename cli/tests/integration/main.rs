//! Integration tests for the campfire CLI.
//!
//! These spawn the actual binary against a temporary config, state file and
//! inventory. They are slower and should be run separately from unit tests.

mod config_command;
mod deploy_flow;
mod sandbox;
