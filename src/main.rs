mod archive;
mod clock;
mod config;
mod driver;
mod failure_log;
mod github;
mod rate_limit;
mod report;
mod retry;

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use crate::archive::OutputLayout;
use crate::clock::{SystemClock, TokioSleeper};
use crate::failure_log::FailureLog;
use crate::github::RestClient;
use crate::rate_limit::RateLimitGuard;
use crate::retry::Archiver;

/// PR Archiver — saves pull request bodies, comments, commits and merge info
/// from GitHub as raw JSON plus abbreviated CSV, resumable across runs.
///
/// Reads GITHUB_TOKEN (required) and GITHUB_REPO (default bitcoin/bitcoin).
#[derive(Parser, Debug)]
#[command(name = "pr-archiver", version, about)]
struct Cli {
    /// Only archive this pull request number. Anything that is not a
    /// number archives every pull request.
    pr: Option<String>,

    /// Config file (defaults to .pr-archiver.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory that receives one sub-directory per pull request
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// File that failed pull request numbers are appended to
    #[arg(long)]
    failure_log: Option<PathBuf>,

    /// Also write the run summary as markdown to this path
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load(
        cli.config.as_deref(),
        config::Overrides {
            pr_arg: cli.pr,
            output_dir: cli.output_dir,
            failure_log: cli.failure_log,
        },
    )?;
    debug!(repo = %config.repository, api = %config.api_base_url, pr = ?config.pr_filter, "resolved configuration");

    let _main_span = info_span!("archive", repo = %config.repository).entered();

    let client = RestClient::from_config(&config)?;
    let archiver = Archiver::new(
        &client,
        OutputLayout::new(&config.output_dir),
        RateLimitGuard::new(SystemClock, TokioSleeper),
        FailureLog::new(&config.failure_log),
    );
    info!(output_dir = %archiver.layout().root().display(), "archiving pull requests");

    let summary = driver::run(&archiver, &config.repository, config.pr_filter).await?;
    info!(
        archived = summary.archived,
        already_archived = summary.already_archived,
        failed = summary.failed.len(),
        "done"
    );

    report::output(&summary, &config.failure_log, cli.summary.as_deref())?;

    Ok(())
}
