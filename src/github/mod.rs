pub mod client;
pub mod types;

pub use client::RestClient;
pub use types::{CommentView, CommitView, PullView, RateLimit};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        reset_at: Option<DateTime<Utc>>,
    },

    #[error("GitHub API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("GitHub API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: String,
        source: serde_json::Error,
    },

    #[error("Unexpected payload shape for {0}")]
    UnexpectedShape(String),
}

impl GitHubError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GitHubError::RateLimited { .. })
    }
}

/// Access to the pull-request resources of one repository.
///
/// Raw resources come back as JSON values so they can be archived verbatim.
/// Pagination is handled behind this trait.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Current core quota.
    async fn rate_limit(&self) -> Result<RateLimit, GitHubError>;

    /// Every pull request number in the repository, all states, newest first.
    async fn list_pull_numbers(&self) -> Result<Vec<u64>, GitHubError>;

    async fn pull(&self, number: u64) -> Result<Value, GitHubError>;

    async fn issue_comments(&self, number: u64) -> Result<Vec<Value>, GitHubError>;

    async fn review_comments(&self, number: u64) -> Result<Vec<Value>, GitHubError>;

    /// Full commit objects, including the touched files.
    async fn commits(&self, number: u64) -> Result<Vec<Value>, GitHubError>;
}
