use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::types::{PullListItem, RateLimit, RateLimitResponse};
use super::{ApiClient, GitHubError};
use crate::config::Config;

const PER_PAGE: usize = 100;
const MAX_PAGES: usize = 5000;
const USER_AGENT: &str = "pr-archiver";

/// `ApiClient` over the GitHub REST API.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    repository: String,
    token: String,
}

impl RestClient {
    pub fn new(
        base_url: impl Into<String>,
        repository: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            repository: repository.into(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GitHubError> {
        Self::new(&config.api_base_url, &config.repository, &config.token)
    }

    fn repo_path(&self, rest: &str) -> String {
        format!("/repos/{}{}", self.repository, rest)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, GitHubError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, ?query, "GitHub API request");

        let response = self
            .http
            .get(&url)
            .query(query)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &headers, &body));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| GitHubError::Decode {
            context: url,
            source,
        })
    }

    /// Follow `page=N` until a page comes back shorter than `PER_PAGE`.
    async fn get_paginated(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<Value>, GitHubError> {
        let mut items = Vec::new();

        for page in 1..=MAX_PAGES {
            let mut page_query = query.to_vec();
            page_query.push(("per_page", PER_PAGE.to_string()));
            page_query.push(("page", page.to_string()));

            let page_items = match self.get_json(path, &page_query).await? {
                Value::Array(page_items) => page_items,
                _ => return Err(GitHubError::UnexpectedShape(format!("{path} page {page}"))),
            };

            let last_page = page_items.len() < PER_PAGE;
            items.extend(page_items);
            if last_page {
                debug!(path, pages = page, items = items.len(), "pagination finished");
                return Ok(items);
            }
        }

        Err(GitHubError::UnexpectedShape(format!(
            "{path} (more than {MAX_PAGES} pages)"
        )))
    }
}

fn decode<T: DeserializeOwned>(value: Value, context: &str) -> Result<T, GitHubError> {
    serde_json::from_value(value).map_err(|source| GitHubError::Decode {
        context: context.to_string(),
        source,
    })
}

/// Turn a non-success response into a rate-limit or a generic API error.
fn classify_failure(status: StatusCode, headers: &HeaderMap, body: &str) -> GitHubError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    let remaining = header_number(headers, "x-ratelimit-remaining");
    let reset_at = header_number(headers, "x-ratelimit-reset")
        .and_then(|reset| DateTime::<Utc>::from_timestamp(reset, 0));

    let limited_status = matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    );
    let quota_spent =
        remaining == Some(0) || message.to_lowercase().contains("rate limit");

    if limited_status && quota_spent {
        warn!(status = status.as_u16(), ?reset_at, "rate limited by GitHub");
        GitHubError::RateLimited { message, reset_at }
    } else {
        GitHubError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
}

#[async_trait]
impl ApiClient for RestClient {
    async fn rate_limit(&self) -> Result<RateLimit, GitHubError> {
        let value = self.get_json("/rate_limit", &[]).await?;
        let core = decode::<RateLimitResponse>(value, "rate limit")?.resources.core;
        let reset_at = DateTime::<Utc>::from_timestamp(core.reset, 0)
            .ok_or_else(|| GitHubError::UnexpectedShape("rate limit reset".to_string()))?;
        Ok(RateLimit {
            limit: core.limit,
            remaining: core.remaining,
            reset_at,
        })
    }

    #[instrument(skip(self), fields(repo = %self.repository))]
    async fn list_pull_numbers(&self) -> Result<Vec<u64>, GitHubError> {
        let query = [
            ("state", "all".to_string()),
            ("sort", "created".to_string()),
            ("direction", "desc".to_string()),
        ];
        let items = self.get_paginated(&self.repo_path("/pulls"), &query).await?;
        items
            .into_iter()
            .map(|item| decode::<PullListItem>(item, "pull request list").map(|p| p.number))
            .collect()
    }

    async fn pull(&self, number: u64) -> Result<Value, GitHubError> {
        self.get_json(&self.repo_path(&format!("/pulls/{number}")), &[])
            .await
    }

    async fn issue_comments(&self, number: u64) -> Result<Vec<Value>, GitHubError> {
        self.get_paginated(&self.repo_path(&format!("/issues/{number}/comments")), &[])
            .await
    }

    async fn review_comments(&self, number: u64) -> Result<Vec<Value>, GitHubError> {
        self.get_paginated(&self.repo_path(&format!("/pulls/{number}/comments")), &[])
            .await
    }

    async fn commits(&self, number: u64) -> Result<Vec<Value>, GitHubError> {
        let listed = self
            .get_paginated(&self.repo_path(&format!("/pulls/{number}/commits")), &[])
            .await?;

        let mut commits = Vec::with_capacity(listed.len());
        for item in listed {
            let sha = item
                .get("sha")
                .and_then(Value::as_str)
                .ok_or_else(|| GitHubError::UnexpectedShape(format!("commit list of #{number}")))?;
            // The PR commit list omits `files`; the single-commit endpoint has them.
            let full = self
                .get_json(&self.repo_path(&format!("/commits/{sha}")), &[])
                .await?;
            commits.push(full);
        }
        Ok(commits)
    }
}
