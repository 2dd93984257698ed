pub mod abbrev;
pub mod types;

pub use types::{ArchiveOutcome, FailureClass, OutputLayout};

use chrono::SecondsFormat;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::clock::Clock;
use crate::github::{ApiClient, CommentView, CommitView, GitHubError, PullView};
use types::{COMMENTS_CSV, COMMENTS_JSON, COMMITS_CSV, COMMITS_JSON, PR_CSV, PR_JSON};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Api(#[from] GitHubError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode JSON: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Malformed {resource} in PR #{number}: {source}")]
    Malformed {
        resource: &'static str,
        number: u64,
        source: serde_json::Error,
    },

    #[error("Failed to write CSV {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

impl ArchiveError {
    pub fn class(&self) -> FailureClass {
        match self {
            ArchiveError::Api(err) if err.is_rate_limited() => FailureClass::RateLimited,
            ArchiveError::Api(_) => FailureClass::Transient,
            _ => FailureClass::Permanent,
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Fetch everything about one pull request and persist it under `layout`.
///
/// A record with a sentinel is left alone. A record without one is deleted
/// and rebuilt from scratch. The sentinel is written last, so any error on
/// the way leaves the record incomplete.
#[instrument(skip(client, layout, clock), fields(pr = number))]
pub async fn archive_pull<C, K>(
    client: &C,
    layout: &OutputLayout,
    clock: &K,
    number: u64,
) -> Result<ArchiveOutcome, ArchiveError>
where
    C: ApiClient + ?Sized,
    K: Clock + ?Sized,
{
    let dir = layout.record_dir(number);
    if layout.is_complete(number) {
        debug!("already done");
        return Ok(ArchiveOutcome::AlreadyArchived);
    }
    if dir.exists() {
        debug!(path = %dir.display(), "removing partial dir");
        fs::remove_dir_all(&dir).map_err(io_error(&dir))?;
    }
    fs::create_dir_all(&dir).map_err(io_error(&dir))?;

    let pull = client.pull(number).await?;
    write_json(&layout.file(number, PR_JSON), &pull)?;

    let mut comments = client.issue_comments(number).await?;
    comments.extend(client.review_comments(number).await?);
    write_json(&layout.file(number, COMMENTS_JSON), &comments)?;
    debug!(count = comments.len(), "wrote comments");

    let commits = client.commits(number).await?;
    write_json(&layout.file(number, COMMITS_JSON), &commits)?;
    debug!(count = commits.len(), "wrote commits");

    let comment_rows = comments
        .iter()
        .map(|c| decode::<CommentView>(c, "comment", number).map(|v| abbrev::comment_row(&v)))
        .collect::<Result<Vec<_>, _>>()?;
    write_csv(&layout.file(number, COMMENTS_CSV), &comment_rows)?;

    let commit_rows = commits
        .iter()
        .map(|c| decode::<CommitView>(c, "commit", number).map(|v| abbrev::commit_row(&v)))
        .collect::<Result<Vec<_>, _>>()?;
    write_csv(&layout.file(number, COMMITS_CSV), &commit_rows)?;

    let pull_row = abbrev::pull_row(&decode::<PullView>(&pull, "pull request", number)?);
    write_csv(&layout.file(number, PR_CSV), std::slice::from_ref(&pull_row))?;
    debug!(row = ?pull_row, "finished PR");

    let sentinel = layout.sentinel(number);
    let finished_at = clock.now().to_rfc3339_opts(SecondsFormat::Micros, true);
    fs::write(&sentinel, finished_at).map_err(io_error(&sentinel))?;

    Ok(ArchiveOutcome::Archived {
        comments: comments.len(),
        commits: commits.len(),
    })
}

fn decode<T: DeserializeOwned>(
    value: &Value,
    resource: &'static str,
    number: u64,
) -> Result<T, ArchiveError> {
    T::deserialize(value).map_err(|source| {
        warn!(resource, payload = %value, error = %source, "failed on malformed resource");
        ArchiveError::Malformed {
            resource,
            number,
            source,
        }
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ArchiveError> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).map_err(io_error(path))
}

fn write_csv<const N: usize>(path: &Path, rows: &[[String; N]]) -> Result<(), ArchiveError> {
    let csv_error = |source| ArchiveError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_path(path)
        .map_err(csv_error)?;
    for row in rows {
        writer.write_record(row).map_err(csv_error)?;
    }
    writer.flush().map_err(io_error(path))
}
