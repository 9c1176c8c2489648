//! Run log command handlers
//!
//! Reads a run's log through the orchestrator's filtered view and prints it
//! with search hits highlighted.

use std::ops::Range;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use otto_client::OrchestratorClient;
use otto_core::domain::log::{LogLevel, LogLine};
use otto_core::logview::SearchPattern;
use uuid::Uuid;

/// Log subcommands
#[derive(Subcommand)]
pub enum LogCommands {
    /// Print a run's log
    Show {
        /// Run ID
        run: Uuid,

        /// Only show these levels (comma-separated, e.g. warn,error)
        #[arg(short, long, value_delimiter = ',', value_parser = parse_level)]
        level: Vec<LogLevel>,

        /// Highlight lines containing this text (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,

        /// Print only the matching lines
        #[arg(long, requires = "search")]
        matches_only: bool,
    },
    /// Append a line to a run's log
    Append {
        /// Run ID
        run: Uuid,

        /// The message
        message: String,

        #[arg(short, long, value_parser = parse_level, default_value = "info")]
        level: LogLevel,

        /// Step or block that produced the line
        #[arg(long)]
        source: Option<String>,
    },
}

fn parse_level(raw: &str) -> Result<LogLevel, String> {
    raw.parse()
}

pub async fn handle_log_command(command: LogCommands, client: &OrchestratorClient) -> Result<()> {
    match command {
        LogCommands::Show {
            run,
            level,
            search,
            matches_only,
        } => show_logs(client, run, level, search, matches_only).await,
        LogCommands::Append {
            run,
            message,
            level,
            source,
        } => {
            let line = LogLine {
                timestamp: chrono::Utc::now(),
                level,
                message,
                source,
            };
            client.add_logs(run, std::slice::from_ref(&line)).await?;
            println!("{}", "✓ Log line appended.".green());
            Ok(())
        }
    }
}

async fn show_logs(
    client: &OrchestratorClient,
    run_id: Uuid,
    levels: Vec<LogLevel>,
    search: Option<String>,
    matches_only: bool,
) -> Result<()> {
    let levels = (!levels.is_empty()).then_some(levels);
    let view = client
        .get_logs(run_id, levels.as_deref(), search.as_deref())
        .await?;

    if view.lines.is_empty() {
        if view.total == 0 {
            println!("{}", "No logs found for this run.".yellow());
        } else {
            println!(
                "{}",
                format!("No lines at the selected levels ({} hidden).", view.total).yellow()
            );
        }
        return Ok(());
    }

    let pattern = search.as_deref().and_then(SearchPattern::literal);

    println!("{}", format!("Logs for run {}:", run_id).bold());
    println!("{}", "─".repeat(80).dimmed());
    for (position, line) in view.lines.iter().enumerate() {
        let is_match = view.matches.binary_search(&position).is_ok();
        if matches_only && !is_match {
            continue;
        }
        print_log_line(line, pattern.as_ref().filter(|_| is_match));
    }
    println!("{}", "─".repeat(80).dimmed());

    if let Some(query) = &search {
        println!(
            "{}",
            format!(
                "{} of {} shown line(s) match '{}'",
                view.matches.len(),
                view.lines.len(),
                query
            )
            .dimmed()
        );
    }

    Ok(())
}

fn print_log_line(line: &LogLine, pattern: Option<&SearchPattern>) {
    let level_str = format!("{:<5}", line.level.as_str());
    let level_colored = match line.level {
        LogLevel::Debug => level_str.dimmed(),
        LogLevel::Info => level_str.cyan(),
        LogLevel::Warn => level_str.yellow(),
        LogLevel::Error => level_str.red(),
    };

    let message = match pattern {
        Some(pattern) => highlight(&line.message, &pattern.find_ranges(&line.message)),
        None => line.message.clone(),
    };

    let source = line
        .source
        .as_ref()
        .map(|s| format!("{} ", format!("[{}]", s).dimmed()))
        .unwrap_or_default();

    println!(
        "{} {} {}{}",
        line.timestamp.format("%H:%M:%S").to_string().dimmed(),
        level_colored,
        source,
        message
    );
}

/// Wrap each byte range of `text` in highlight styling
fn highlight(text: &str, ranges: &[Range<usize>]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for range in ranges {
        out.push_str(&text[cursor..range.start]);
        out.push_str(&text[range.clone()].black().on_yellow().to_string());
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_keeps_text_between_hits() {
        colored::control::set_override(false);

        let pattern = SearchPattern::literal("err").unwrap();
        let text = "ERR: npm err!";
        assert_eq!(highlight(text, &pattern.find_ranges(text)), text);
        assert_eq!(pattern.find_ranges(text), vec![0..3, 9..12]);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("warn").unwrap(), LogLevel::Warn);
        assert!(parse_level("loud").is_err());
    }
}
