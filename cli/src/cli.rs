//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Deploy and operate a single on-demand game server
#[derive(Parser)]
#[command(
    name = "campfire",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Answer yes to every prompt
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show what a deploy would do, without changing anything
    Plan(commands::plan::PlanArgs),

    /// Create or update the server
    Deploy,

    /// Show the outputs of the last deploy
    Outputs,

    /// Show the deployed server and its power state
    Status,

    /// Start the deployed server
    Start,

    /// Stop the deployed server
    Stop,

    /// Start the server through its remote activation endpoint
    Wake(commands::wake::WakeArgs),

    /// Show version
    Version,

    #[command(hide = true, name = "_idle-monitor")]
    IdleMonitor(commands::idle_monitor::IdleMonitorArgs),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            command,
        } = self;

        let flags = AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes },
        };
        let app = || AppContext::new(&flags);

        match command {
            Command::Config(cmd) => commands::config::run(&app()?, cmd),
            Command::Plan(args) => commands::plan::run(&app()?, &args).await,
            Command::Deploy => commands::deploy::run(&app()?).await,
            Command::Outputs => commands::outputs::run(&app()?).await,
            Command::Status => commands::status::run(&app()?).await,
            Command::Start => commands::start::run(&app()?).await,
            Command::Stop => commands::stop::run(&app()?).await,
            Command::Wake(args) => commands::wake::run(&app()?, &args).await,
            Command::Version => commands::version::run(&app()?),
            // The on-instance loop needs none of the operator's files.
            Command::IdleMonitor(args) => commands::idle_monitor::run(&args).await,
        }
    }
}
