use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, info_span, Instrument};

use crate::clock::{Clock, Sleeper};
use crate::github::{ApiClient, GitHubError};
use crate::report::RunSummary;
use crate::retry::{Archiver, ItemOutcome};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to check the rate limit: {0}")]
    RateLimit(#[source] GitHubError),

    #[error("Failed to list pull requests: {0}")]
    Enumerate(#[source] GitHubError),

    #[error("Failed to append to failure log {path}: {source}")]
    FailureLog {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Process one pull request (when `pr_filter` is set) or all of them, one at a time.
pub async fn run<C, K, S>(
    archiver: &Archiver<'_, C, K, S>,
    repository: &str,
    pr_filter: Option<u64>,
) -> Result<RunSummary, DriverError>
where
    C: ApiClient + ?Sized,
    K: Clock,
    S: Sleeper,
{
    archiver
        .guard()
        .wait_if_exhausted(archiver.client())
        .await
        .map_err(DriverError::RateLimit)?;

    let numbers = match pr_filter {
        Some(number) => vec![number],
        None => {
            let numbers = archiver
                .client()
                .list_pull_numbers()
                .await
                .map_err(DriverError::Enumerate)?;
            info!(count = numbers.len(), repo = %repository, "saw pulls");
            numbers
        }
    };

    let mut summary = RunSummary {
        repository: repository.to_string(),
        ..RunSummary::default()
    };

    for number in numbers {
        info!(pr = number, "processing PR");
        let outcome = archiver
            .archive_with_retry(number)
            .instrument(info_span!("pr", number))
            .await
            .map_err(|source| DriverError::FailureLog {
                path: archiver.failure_log().path().to_path_buf(),
                source,
            })?;

        match outcome {
            ItemOutcome::Archived => summary.archived += 1,
            ItemOutcome::AlreadyArchived => summary.already_archived += 1,
            ItemOutcome::Failed => summary.failed.push(number),
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::OutputLayout;
    use crate::clock::fake::{FixedClock, RecordingSleeper};
    use crate::failure_log::FailureLog;
    use crate::github::fake::{FakeClient, FakePull};
    use crate::github::RateLimit;
    use crate::rate_limit::RateLimitGuard;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;
    use std::time::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn pull(number: u64) -> FakePull {
        FakePull {
            pull: json!({
                "number": number,
                "created_at": "2020-01-01T00:00:00Z",
                "user": { "login": "a" },
                "title": format!("PR {number}"),
                "closed_at": null,
                "merged_at": null,
                "merged": false
            }),
            ..FakePull::default()
        }
    }

    fn server_error() -> GitHubError {
        GitHubError::Api {
            status: 500,
            message: "Server Error".to_string(),
        }
    }

    fn build<'a>(
        client: &'a FakeClient,
        dir: &tempfile::TempDir,
    ) -> Archiver<'a, FakeClient, FixedClock, RecordingSleeper> {
        Archiver::new(
            client,
            OutputLayout::new(dir.path().join("output")),
            RateLimitGuard::new(FixedClock(now()), RecordingSleeper::default()),
            FailureLog::new(dir.path().join("failed-prs.txt")),
        )
    }

    #[tokio::test]
    async fn test_processes_all_pulls_and_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let client = FakeClient::default()
            .with_pull(3, pull(3))
            .with_pull(2, pull(2))
            .with_pull(1, pull(1));
        client.fail_next(2, server_error());
        client.fail_next(2, server_error());
        let archiver = build(&client, &dir);

        let summary = run(&archiver, "owner/repo", None).await.unwrap();

        assert_eq!(summary.archived, 2);
        assert_eq!(summary.failed, vec![2]);
        assert_eq!(summary.total(), 3);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("failed-prs.txt")).unwrap(),
            "2\n"
        );
        assert!(archiver.layout().is_complete(1));
        assert!(!archiver.layout().is_complete(2));
        assert!(archiver.layout().is_complete(3));
    }

    #[tokio::test]
    async fn test_single_pull_filter_skips_enumeration() {
        let dir = tempfile::tempdir().unwrap();
        let client = FakeClient::default()
            .with_pull(5, pull(5))
            .with_pull(6, pull(6));
        let archiver = build(&client, &dir);

        let summary = run(&archiver, "owner/repo", Some(6)).await.unwrap();

        assert_eq!(summary.archived, 1);
        assert_eq!(client.call_count("list"), 0);
        assert_eq!(client.call_count("pull:5"), 0);
        assert!(archiver.layout().is_complete(6));
    }

    #[tokio::test]
    async fn test_rerun_resumes_without_refetching() {
        let dir = tempfile::tempdir().unwrap();
        let client = FakeClient::default().with_pull(8, pull(8)).with_pull(9, pull(9));
        let archiver = build(&client, &dir);

        run(&archiver, "owner/repo", None).await.unwrap();
        let summary = run(&archiver, "owner/repo", None).await.unwrap();

        assert_eq!(summary.archived, 0);
        assert_eq!(summary.already_archived, 2);
        assert_eq!(client.call_count("pull:8"), 1);
    }

    #[tokio::test]
    async fn test_startup_waits_for_exhausted_quota() {
        let dir = tempfile::tempdir().unwrap();
        let client = FakeClient::default().with_pull(1, pull(1));
        client.push_rate_limit(RateLimit {
            limit: 5000,
            remaining: 0,
            reset_at: now() + chrono::Duration::seconds(10),
        });
        let archiver = build(&client, &dir);

        run(&archiver, "owner/repo", None).await.unwrap();

        assert_eq!(
            archiver.guard().sleeper().recorded(),
            vec![Duration::from_secs(13)]
        );
    }
}
