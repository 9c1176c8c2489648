//! Run command handlers
//!
//! Trigger runs, browse a pipeline's run history, and report executor
//! lifecycle events from scripts.

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use colored::*;
use otto_client::OrchestratorClient;
use otto_core::domain::run::{PipelineRun, RunStatus, RunUpdate};
use otto_core::dto::run::TriggerRun;
use otto_core::github::short_sha;
use uuid::Uuid;

use crate::commands::pipeline::pretty_json;
use crate::id_resolver::resolve_pipeline_id;
use crate::types::IdOrPrefix;

/// Run subcommands
#[derive(Subcommand)]
pub enum RunCommands {
    /// Queue a run of a pipeline's current definition
    Trigger {
        /// Pipeline ID or unambiguous prefix
        pipeline: String,

        /// Who is triggering the run
        #[arg(long, env = "USER", default_value = "cli")]
        by: String,
    },
    /// List a pipeline's runs, newest first
    List {
        /// Pipeline ID or unambiguous prefix
        pipeline: String,

        /// Page number, starting at 1
        #[arg(short, long)]
        page: Option<u32>,

        /// Runs per page
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show the pipeline's most recent run
    Latest {
        /// Pipeline ID or unambiguous prefix
        pipeline: String,
    },
    /// Show run details
    Show {
        /// Run ID
        id: Uuid,

        /// Also print the pipeline snapshot the run executes
        #[arg(long)]
        snapshot: bool,
    },
    /// Report that execution of a queued run began
    Start {
        /// Run ID
        id: Uuid,
    },
    /// Report how a run ended
    Complete {
        /// Run ID
        id: Uuid,

        /// Terminal status
        #[arg(short, long, value_enum)]
        status: FinalStatus,

        /// Short summary of the outcome
        #[arg(short, long)]
        message: Option<String>,

        /// Where the full logs can be read
        #[arg(long)]
        logs_url: Option<String>,
    },
}

/// Statuses a run can end in
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FinalStatus {
    Success,
    Failed,
    Cancelled,
}

impl From<FinalStatus> for RunStatus {
    fn from(status: FinalStatus) -> Self {
        match status {
            FinalStatus::Success => RunStatus::Success,
            FinalStatus::Failed => RunStatus::Failed,
            FinalStatus::Cancelled => RunStatus::Cancelled,
        }
    }
}

pub async fn handle_run_command(command: RunCommands, client: &OrchestratorClient) -> Result<()> {
    match command {
        RunCommands::Trigger { pipeline, by } => trigger_run(client, &pipeline, by).await,
        RunCommands::List {
            pipeline,
            page,
            limit,
        } => list_runs(client, &pipeline, page, limit).await,
        RunCommands::Latest { pipeline } => latest_run(client, &pipeline).await,
        RunCommands::Show { id, snapshot } => {
            let run = client.get_run(id).await?;
            print_run_details(&run, snapshot);
            Ok(())
        }
        RunCommands::Start { id } => {
            let run = client.start_run(id).await?;
            println!(
                "{} Run #{} is {}",
                "✓".green().bold(),
                run.run_number,
                colorize_status(run.status)
            );
            Ok(())
        }
        RunCommands::Complete {
            id,
            status,
            message,
            logs_url,
        } => {
            let update = RunUpdate {
                logs_url,
                result_message: message,
            };
            let run = client.complete_run(id, status.into(), update).await?;
            println!(
                "{} Run #{} finished as {}",
                "✓".green().bold(),
                run.run_number,
                colorize_status(run.status)
            );
            if let Some(duration) = run.duration {
                println!("  Duration: {}", format_duration(duration));
            }
            Ok(())
        }
    }
}

async fn trigger_run(client: &OrchestratorClient, pipeline: &str, by: String) -> Result<()> {
    let pipeline_id = resolve_pipeline_id(client, &IdOrPrefix::parse(pipeline)).await?;

    let run = client
        .trigger_run(pipeline_id, TriggerRun { trigger_by: by })
        .await?;

    println!("{}", "✓ Run queued successfully!".green().bold());
    println!("  Run ID:   {}", run.id.to_string().cyan());
    println!("  Number:   #{}", run.run_number);
    println!("  Status:   {}", colorize_status(run.status));

    Ok(())
}

async fn list_runs(
    client: &OrchestratorClient,
    pipeline: &str,
    page: Option<u32>,
    limit: Option<u32>,
) -> Result<()> {
    let pipeline_id = resolve_pipeline_id(client, &IdOrPrefix::parse(pipeline)).await?;

    let page = client.list_runs(pipeline_id, page, limit).await?;

    if page.runs.is_empty() {
        println!(
            "{}",
            format!("No runs found for pipeline {}.", pipeline_id).yellow()
        );
        return Ok(());
    }

    let pages = page.total.div_ceil(u64::from(page.limit.max(1)));
    println!(
        "{}",
        format!(
            "Runs for pipeline {} (page {} of {}, {} total):",
            pipeline_id, page.page, pages, page.total
        )
        .bold()
    );
    println!();
    for run in &page.runs {
        print_run_summary(run);
    }

    Ok(())
}

async fn latest_run(client: &OrchestratorClient, pipeline: &str) -> Result<()> {
    let pipeline_id = resolve_pipeline_id(client, &IdOrPrefix::parse(pipeline)).await?;

    match client.latest_run(pipeline_id).await {
        Ok(run) => print_run_details(&run, false),
        Err(e) if e.is_not_found() => {
            println!(
                "{}",
                format!("Pipeline {} has no runs yet.", pipeline_id).yellow()
            );
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn print_run_summary(run: &PipelineRun) {
    println!(
        "  {} #{} {}",
        "▸".cyan(),
        run.run_number,
        colorize_status(run.status)
    );
    println!("    ID:      {}", run.id.to_string().dimmed());
    println!("    Trigger: {}", trigger_label(run).dimmed());
    println!(
        "    Started: {}",
        run.started_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(duration) = run.duration {
        println!("    Took:    {}", format_duration(duration).dimmed());
    }
    println!();
}

fn print_run_details(run: &PipelineRun, with_snapshot: bool) {
    println!("{}", format!("Run #{}", run.run_number).bold());
    println!("  ID:          {}", run.id.to_string().cyan());
    println!("  Pipeline ID: {}", run.pipeline_id.to_string().dimmed());
    println!("  Status:      {}", colorize_status(run.status));
    println!("  Trigger:     {}", trigger_label(run));
    println!(
        "  Started:     {}",
        run.started_at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(completed) = run.completed_at {
        println!("  Completed:   {}", completed.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(duration) = run.duration {
        println!("  Duration:    {}", format_duration(duration));
    }
    if let Some(url) = &run.logs_url {
        println!("  Logs:        {}", url);
    }

    if let Some(push) = &run.webhook_data {
        println!("\n{}", "Push:".bold());
        println!("  Repository: {}", push.repository);
        println!("  Branch:     {}", push.branch.cyan());
        println!("  Commit:     {}", short_sha(&push.commit).yellow());
        println!("  Author:     {}", push.author);
        println!("  Message:    {}", push.commit_message.lines().next().unwrap_or(""));
    }

    if let Some(message) = &run.result_message {
        println!("\n{}", "Result:".bold());
        match run.status {
            RunStatus::Failed => println!("{}", message.red()),
            _ => println!("{}", message),
        }
    }

    if with_snapshot {
        println!("\n{}", "Pipeline Snapshot:".bold());
        println!("{}", "─".repeat(80).dimmed());
        println!("{}", pretty_json(&run.pipeline_snapshot));
        println!("{}", "─".repeat(80).dimmed());
    }
}

fn trigger_label(run: &PipelineRun) -> String {
    format!("{} by {}", run.trigger, run.trigger_by)
}

/// Render whole seconds as `1h 2m 3s`, dropping leading zero units
fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{}s", s),
        (0, _) => format!("{}m {}s", m, s),
        _ => format!("{}h {}m {}s", h, m, s),
    }
}

/// Colorize run status for display
pub(crate) fn colorize_status(status: RunStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        RunStatus::Queued => label.yellow(),
        RunStatus::Running => label.cyan(),
        RunStatus::Success => label.green(),
        RunStatus::Failed => label.red(),
        RunStatus::Cancelled => label.dimmed(),
    }
}
