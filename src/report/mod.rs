pub mod types;

pub use types::RunSummary;

use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write summary file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Print the run summary to the terminal, or write it as markdown when a path is given.
#[instrument(skip(summary), fields(repo = %summary.repository, total = summary.total()))]
pub fn output(summary: &RunSummary, failure_log: &Path, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing summary to terminal");
            print_terminal_summary(summary, failure_log);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing summary to file");
            write_markdown_summary(summary, failure_log, path)
        }
    }
}

/// Repository: bitcoin/bitcoin
/// Archived: 12 | Already complete: 340 | Failed: 1
/// Failed PRs (see failed-prs.txt): 117
fn print_terminal_summary(summary: &RunSummary, failure_log: &Path) {
    println!();
    println!("Repository: {}", summary.repository.bold());
    println!(
        "Archived: {} | Already complete: {} | Failed: {}",
        summary.archived.to_string().green().bold(),
        summary.already_archived.to_string().dimmed(),
        colorize_failed(summary.failed.len()),
    );
    if !summary.is_clean() {
        println!(
            "Failed PRs (see {}): {}",
            failure_log.display(),
            join_numbers(&summary.failed).red()
        );
    }
    println!();
}

fn write_markdown_summary(
    summary: &RunSummary,
    failure_log: &Path,
    path: &Path,
) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!("# Archive run: {}\n\n", summary.repository));
    md.push_str(&format!(
        "**Archived:** {} | **Already complete:** {} | **Failed:** {}\n",
        summary.archived,
        summary.already_archived,
        summary.failed.len()
    ));
    if !summary.is_clean() {
        md.push_str(&format!(
            "\n## Failed PRs\n\nAppended to `{}`:\n\n",
            failure_log.display()
        ));
        for number in &summary.failed {
            md.push_str(&format!("- #{number}\n"));
        }
    }

    std::fs::write(path, md)?;
    Ok(())
}

fn colorize_failed(count: usize) -> colored::ColoredString {
    if count == 0 {
        "0".green()
    } else {
        count.to_string().red().bold()
    }
}

fn join_numbers(numbers: &[u64]) -> String {
    numbers
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
