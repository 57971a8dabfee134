// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! hpm — the agent runner and supervisor CLI.

mod commands;
mod exit_error;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{agent, registry, supervisor};
use exit_error::ExitError;

#[derive(Parser)]
#[command(name = "hpm", version, about = "Headless PM agent runner and supervisor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the continuous agent loop
    Agent(agent::AgentArgs),
    /// Auto-start and shut down the shared PM service
    Supervisor(supervisor::SupervisorArgs),
    /// Process registry introspection
    Registry(registry::RegistryArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        let code = err.downcast_ref::<ExitError>().map_or(1, |e| e.code);
        let message = err.to_string();
        if !message.is_empty() {
            eprintln!("Error: {message}");
        }
        std::process::exit(code);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Agent(args) => match args.command {
            agent::AgentCommand::Run(run_args) => agent::run(run_args),
        },
        Commands::Supervisor(args) => match args.command {
            supervisor::SupervisorCommand::Ensure(ensure_args) => supervisor::ensure(ensure_args),
            supervisor::SupervisorCommand::Shutdown(shutdown_args) => supervisor::shutdown(shutdown_args),
        },
        Commands::Registry(args) => match args.command {
            registry::RegistryCommand::Status { port } => registry::status(port),
        },
    }
}
