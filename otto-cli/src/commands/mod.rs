//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod binding;
mod logs;
mod pipeline;
mod run;

pub use binding::BindingCommands;
pub use logs::LogCommands;
pub use pipeline::PipelineCommands;
pub use run::RunCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pipeline definitions
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Pipeline runs
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// GitHub webhook bindings
    Binding {
        #[command(subcommand)]
        command: BindingCommands,
    },
    /// Run logs
    Logs {
        #[command(subcommand)]
        command: LogCommands,
    },
}

/// Route a command to its handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, &client).await,
        Commands::Run { command } => run::handle_run_command(command, &client).await,
        Commands::Binding { command } => binding::handle_binding_command(command, &client).await,
        Commands::Logs { command } => logs::handle_log_command(command, &client).await,
    }
}
