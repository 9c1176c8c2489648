//! Pipeline command handlers
//!
//! Create, list, show, edit and delete pipeline definitions.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use otto_client::OrchestratorClient;
use otto_core::domain::pipeline::PipelineDefinition;
use otto_core::dto::pipeline::{CreatePipeline, UpdatePipeline};
use serde_json::Value as JsonValue;

use crate::id_resolver::resolve_pipeline_id;
use crate::types::IdOrPrefix;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Store a pipeline definition from a JSON file
    Create {
        /// Project the pipeline belongs to
        #[arg(short, long)]
        project: String,

        /// Pipeline name
        #[arg(short, long)]
        name: String,

        /// Path to the JSON definition (an object with a `blocks` array)
        #[arg(short, long)]
        file: String,
    },
    /// List all pipelines
    List,
    /// Show pipeline details and definition
    Show {
        /// Pipeline ID or unambiguous prefix
        id: String,
    },
    /// Rename a pipeline or replace its definition
    Update {
        /// Pipeline ID or unambiguous prefix
        id: String,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// Path to a new JSON definition
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Delete a pipeline
    Delete {
        /// Pipeline ID or unambiguous prefix
        id: String,
    },
}

pub async fn handle_pipeline_command(
    command: PipelineCommands,
    client: &OrchestratorClient,
) -> Result<()> {
    match command {
        PipelineCommands::Create {
            project,
            name,
            file,
        } => create_pipeline(client, project, name, &file).await,
        PipelineCommands::List => list_pipelines(client).await,
        PipelineCommands::Show { id } => show_pipeline(client, &id).await,
        PipelineCommands::Update { id, name, file } => {
            update_pipeline(client, &id, name, file.as_deref()).await
        }
        PipelineCommands::Delete { id } => delete_pipeline(client, &id).await,
    }
}

/// Read a definition file and make sure it is JSON before sending it
fn read_definition(path: &str) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline file: {}", path))?;

    serde_json::from_str::<JsonValue>(&content)
        .with_context(|| format!("Pipeline file is not valid JSON: {}", path))?;

    Ok(content)
}

async fn create_pipeline(
    client: &OrchestratorClient,
    project_id: String,
    name: String,
    path: &str,
) -> Result<()> {
    let content = read_definition(path)?;

    let pipeline = client
        .create_pipeline(CreatePipeline {
            project_id,
            name,
            content,
        })
        .await?;

    println!("{}", "✓ Pipeline created successfully!".green().bold());
    println!("  ID:      {}", pipeline.id.to_string().cyan());
    println!("  Name:    {}", pipeline.name.bold());
    println!("  Project: {}", pipeline.project_id.dimmed());

    Ok(())
}

async fn list_pipelines(client: &OrchestratorClient) -> Result<()> {
    let pipelines = client.list_pipelines().await?;

    if pipelines.is_empty() {
        println!("{}", "No pipelines found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} pipeline(s):", pipelines.len()).bold()
        );
        println!();
        for pipeline in pipelines {
            print_pipeline_summary(&pipeline);
        }
    }

    Ok(())
}

async fn show_pipeline(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_pipeline_id(client, &IdOrPrefix::parse(id)).await?;

    let pipeline = client.get_pipeline(uuid).await?;

    print_pipeline_details(&pipeline);

    Ok(())
}

async fn update_pipeline(
    client: &OrchestratorClient,
    id: &str,
    name: Option<String>,
    path: Option<&str>,
) -> Result<()> {
    if name.is_none() && path.is_none() {
        bail!("Nothing to update: pass --name and/or --file");
    }

    let uuid = resolve_pipeline_id(client, &IdOrPrefix::parse(id)).await?;
    let content = path.map(read_definition).transpose()?;

    let pipeline = client
        .update_pipeline(uuid, UpdatePipeline { name, content })
        .await?;

    println!("{}", "✓ Pipeline updated successfully!".green().bold());
    println!("  ID:      {}", pipeline.id.to_string().cyan());
    println!("  Name:    {}", pipeline.name.bold());
    println!(
        "  Updated: {}",
        pipeline.updated_at.format("%Y-%m-%d %H:%M:%S")
    );

    Ok(())
}

async fn delete_pipeline(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_pipeline_id(client, &IdOrPrefix::parse(id)).await?;

    client.delete_pipeline(uuid).await?;

    println!(
        "{}",
        format!("✓ Pipeline {} deleted successfully!", uuid)
            .green()
            .bold()
    );

    Ok(())
}

fn print_pipeline_summary(pipeline: &PipelineDefinition) {
    println!("  {} {}", "▸".cyan(), pipeline.name.bold());
    println!("    ID:      {}", pipeline.id.to_string().dimmed());
    println!("    Project: {}", pipeline.project_id.dimmed());
    println!(
        "    Updated: {}",
        pipeline
            .updated_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

fn print_pipeline_details(pipeline: &PipelineDefinition) {
    println!("{}", "Pipeline Details:".bold());
    println!("  ID:       {}", pipeline.id.to_string().cyan());
    println!("  Name:     {}", pipeline.name.bold());
    println!("  Project:  {}", pipeline.project_id);
    println!(
        "  Created:  {}",
        pipeline.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  Updated:  {}",
        pipeline.updated_at.format("%Y-%m-%d %H:%M:%S")
    );

    println!("\n{}", "Definition:".bold());
    println!("{}", "─".repeat(80).dimmed());
    println!("{}", pretty_json(&pipeline.content));
    println!("{}", "─".repeat(80).dimmed());
}

/// Pretty-print stored JSON, or return it untouched if it does not parse
pub(crate) fn pretty_json(content: &str) -> String {
    serde_json::from_str::<JsonValue>(content)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| content.to_string())
}
