use std::time::Duration;
use tracing::{error, info_span, warn, Instrument};

use crate::archive::{self, ArchiveError, ArchiveOutcome, FailureClass, OutputLayout};
use crate::clock::{Clock, Sleeper};
use crate::failure_log::FailureLog;
use crate::github::ApiClient;
use crate::rate_limit::RateLimitGuard;

/// Pause after a rate-limit failure before the quota is re-checked.
pub const RATE_LIMIT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Final result for one pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Archived,
    AlreadyArchived,
    Failed,
}

#[derive(Debug)]
enum RetryState {
    Pending,
    Retrying(FailureClass),
    Done(ArchiveOutcome),
    Failed,
}

/// Everything needed to archive pull requests with the single-retry policy.
pub struct Archiver<'a, C: ?Sized, K, S> {
    client: &'a C,
    layout: OutputLayout,
    guard: RateLimitGuard<K, S>,
    failures: FailureLog,
}

impl<'a, C, K, S> Archiver<'a, C, K, S>
where
    C: ApiClient + ?Sized,
    K: Clock,
    S: Sleeper,
{
    pub fn new(
        client: &'a C,
        layout: OutputLayout,
        guard: RateLimitGuard<K, S>,
        failures: FailureLog,
    ) -> Self {
        Self {
            client,
            layout,
            guard,
            failures,
        }
    }

    pub fn client(&self) -> &C {
        self.client
    }

    pub fn guard(&self) -> &RateLimitGuard<K, S> {
        &self.guard
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn failure_log(&self) -> &FailureLog {
        &self.failures
    }

    /// Archive one pull request, retrying at most once.
    ///
    /// Exhausted items go to the failure log. Only a failure to write that
    /// log is returned as an error.
    pub async fn archive_with_retry(&self, number: u64) -> std::io::Result<ItemOutcome> {
        let mut state = RetryState::Pending;
        loop {
            state = match state {
                RetryState::Pending => match self.attempt(number, 1).await {
                    Ok(outcome) => RetryState::Done(outcome),
                    Err(err) => self.after_first_failure(number, err).await,
                },
                RetryState::Retrying(cause) => match self.attempt(number, 2).await {
                    Ok(outcome) => RetryState::Done(outcome),
                    Err(err) => {
                        error!(pr = number, ?cause, error = %err, "finally failed - skipping");
                        RetryState::Failed
                    }
                },
                RetryState::Done(ArchiveOutcome::AlreadyArchived) => {
                    return Ok(ItemOutcome::AlreadyArchived)
                }
                RetryState::Done(ArchiveOutcome::Archived { .. }) => {
                    return Ok(ItemOutcome::Archived)
                }
                RetryState::Failed => {
                    self.failures.record(number)?;
                    return Ok(ItemOutcome::Failed);
                }
            };
        }
    }

    async fn attempt(&self, number: u64, attempt: u32) -> Result<ArchiveOutcome, ArchiveError> {
        archive::archive_pull(self.client, &self.layout, self.guard.clock(), number)
            .instrument(info_span!("attempt", attempt))
            .await
    }

    async fn after_first_failure(&self, number: u64, err: ArchiveError) -> RetryState {
        match err.class() {
            FailureClass::RateLimited => {
                warn!(pr = number, error = %err, "hit rate limit");
                self.guard.sleeper().sleep(RATE_LIMIT_RETRY_DELAY).await;
                if let Err(guard_err) = self.guard.wait_if_exhausted(self.client).await {
                    warn!(error = %guard_err, "could not check rate limit before retry");
                }
                RetryState::Retrying(FailureClass::RateLimited)
            }
            FailureClass::Transient => {
                error!(pr = number, error = %err, "retrying PR");
                RetryState::Retrying(FailureClass::Transient)
            }
            FailureClass::Permanent => {
                error!(pr = number, error = %err, "not retryable - skipping");
                RetryState::Failed
            }
        }
    }
}
