//! campfire CLI - deploy and operate an on-demand game server

#![cfg_attr(test, allow(clippy::expect_used))]

use std::process::ExitCode;

use campfire_cli::cli::{Cli, Command};
use campfire_cli::output::json;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Log filter for operator commands; stdout stays reserved for output.
const LOG_ENV: &str = "CAMPFIRE_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Command::IdleMonitor(_)));

    let json_mode = cli.json;
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            if json_mode {
                match json::format_error(&format!("{e:#}"), json::error_code(&e)) {
                    Ok(text) => println!("{text}"),
                    Err(_) => eprintln!("Error: {e:#}"),
                }
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

/// The idle monitor runs as a service and logs at `info` via `RUST_LOG`;
/// every other command logs warnings only, via `CAMPFIRE_LOG`.
fn init_tracing(service: bool) {
    let filter = if service {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
