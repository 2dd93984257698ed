use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::{Clock, Sleeper};
use crate::github::{ApiClient, GitHubError};

/// Slack added after the advertised reset time before work resumes.
pub const RESET_SLACK: Duration = Duration::from_secs(3);

/// Blocks until the core quota resets whenever it is spent.
pub struct RateLimitGuard<K, S> {
    clock: K,
    sleeper: S,
}

impl<K: Clock, S: Sleeper> RateLimitGuard<K, S> {
    pub fn new(clock: K, sleeper: S) -> Self {
        Self { clock, sleeper }
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Query the quota and sleep until `reset + 3s` if none is left.
    ///
    /// Returns how long it slept, or `None` when quota was available.
    pub async fn wait_if_exhausted<C: ApiClient + ?Sized>(
        &self,
        client: &C,
    ) -> Result<Option<Duration>, GitHubError> {
        let limit = client.rate_limit().await?;
        if !limit.is_exhausted() {
            debug!(remaining = limit.remaining, limit = limit.limit, "rate limit ok");
            return Ok(None);
        }

        let wait = wait_until_reset(limit.reset_at, self.clock.now());
        warn!(
            reset_at = %limit.reset_at,
            minutes = wait.as_secs_f64() / 60.0,
            "rate limit hit, sleeping"
        );
        self.sleeper.sleep(wait).await;
        Ok(Some(wait))
    }
}

/// `reset - now + 3s`, never negative.
pub fn wait_until_reset(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let until_reset = (reset_at - now).to_std().unwrap_or(Duration::ZERO);
    until_reset + RESET_SLACK
}
