use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Core API quota as reported by `GET /rate_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    /// When the quota window resets
    pub reset_at: DateTime<Utc>,
}

impl RateLimit {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RateLimitResponse {
    pub(super) resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
pub(super) struct RateLimitResources {
    pub(super) core: RateLimitWindow,
}

#[derive(Debug, Deserialize)]
pub(super) struct RateLimitWindow {
    pub(super) limit: u64,
    pub(super) remaining: u64,
    /// Unix timestamp, seconds
    pub(super) reset: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct PullListItem {
    pub(super) number: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelRef {
    pub name: String,
}

/// The fields of a pull request used by the CSV summary.
///
/// Timestamps are kept as the ISO-8601 strings the API returns.
#[derive(Debug, Clone, Deserialize)]
pub struct PullView {
    pub number: u64,
    pub created_at: String,
    pub user: Option<UserRef>,
    pub title: String,
    #[serde(default)]
    pub labels: Vec<LabelRef>,
    pub closed_at: Option<String>,
    pub merged_at: Option<String>,
    #[serde(default)]
    pub merged: bool,
    /// Left untyped: a deleted merging account may come back null or partial.
    #[serde(default)]
    pub merged_by: Option<Value>,
}

/// An issue comment or a review comment. Only review comments carry `path`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentView {
    pub id: u64,
    pub user: Option<UserRef>,
    pub created_at: String,
    pub body: String,
    pub html_url: String,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitView {
    pub sha: String,
    pub commit: CommitDetail,
    /// Platform account linked to the commit author, when GitHub could match one.
    pub author: Option<Value>,
    pub files: Vec<CommitFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub author: GitSignature,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitSignature {
    pub name: String,
    pub date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitFile {
    pub filename: String,
}
