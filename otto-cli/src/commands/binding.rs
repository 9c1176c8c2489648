//! Webhook binding command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use otto_client::OrchestratorClient;
use otto_core::domain::binding::{DEFAULT_TRIGGER_BRANCH, WebhookBinding};
use otto_core::dto::binding::ConnectBinding;

use crate::id_resolver::resolve_pipeline_id;
use crate::types::IdOrPrefix;

/// Binding subcommands
#[derive(Subcommand)]
pub enum BindingCommands {
    /// Trigger a pipeline on pushes to a repository branch
    Connect {
        /// Pipeline ID or unambiguous prefix
        pipeline: String,

        /// Project the binding belongs to
        #[arg(short, long)]
        project: String,

        /// Numeric GitHub repository id
        #[arg(long)]
        repo_id: i64,

        /// Repository as owner/name
        #[arg(long)]
        repo: String,

        /// Branch whose pushes trigger the pipeline
        #[arg(short, long, default_value = DEFAULT_TRIGGER_BRANCH)]
        branch: String,
    },
    /// Stop pushes from triggering a pipeline
    Disable {
        /// Pipeline ID or unambiguous prefix
        pipeline: String,
    },
    /// List a project's bindings
    List {
        /// Project ID
        project: String,
    },
}

pub async fn handle_binding_command(
    command: BindingCommands,
    client: &OrchestratorClient,
) -> Result<()> {
    match command {
        BindingCommands::Connect {
            pipeline,
            project,
            repo_id,
            repo,
            branch,
        } => {
            let pipeline_id = resolve_pipeline_id(client, &IdOrPrefix::parse(&pipeline)).await?;
            let binding = client
                .connect_binding(ConnectBinding {
                    pipeline_id,
                    project_id: project,
                    github_repo_id: repo_id,
                    github_repo_name: repo,
                    trigger_branch: branch,
                })
                .await?;

            println!("{}", "✓ Binding connected successfully!".green().bold());
            print_binding(&binding);
            Ok(())
        }
        BindingCommands::Disable { pipeline } => {
            let pipeline_id = resolve_pipeline_id(client, &IdOrPrefix::parse(&pipeline)).await?;
            let response = client.disable_bindings(pipeline_id).await?;

            if response.disabled {
                println!(
                    "{}",
                    format!("✓ Pushes no longer trigger pipeline {}", pipeline_id)
                        .green()
                        .bold()
                );
            } else {
                println!(
                    "{}",
                    format!("Pipeline {} has no bindings.", pipeline_id).yellow()
                );
            }
            Ok(())
        }
        BindingCommands::List { project } => {
            let bindings = client.list_project_bindings(&project).await?;

            if bindings.is_empty() {
                println!(
                    "{}",
                    format!("No bindings found for project {}.", project).yellow()
                );
            } else {
                println!(
                    "{}",
                    format!("Found {} binding(s):", bindings.len()).bold()
                );
                println!();
                for binding in &bindings {
                    print_binding(binding);
                    println!();
                }
            }
            Ok(())
        }
    }
}

fn print_binding(binding: &WebhookBinding) {
    let state = if binding.is_active {
        "active".green()
    } else {
        "inactive".dimmed()
    };

    println!(
        "  {} {}@{} ({})",
        "▸".cyan(),
        binding.github_repo_name.bold(),
        binding.trigger_branch.cyan(),
        state
    );
    println!("    ID:       {}", binding.id.to_string().dimmed());
    println!("    Pipeline: {}", binding.pipeline_id.to_string().dimmed());
    println!("    Repo ID:  {}", binding.github_repo_id);
    match binding.last_triggered_at {
        Some(at) => println!("    Last run: {}", at.format("%Y-%m-%d %H:%M:%S")),
        None => println!("    Last run: {}", "never".dimmed()),
    }
}
