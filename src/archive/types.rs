use std::path::{Path, PathBuf};

pub const PR_JSON: &str = "pr.json";
pub const COMMENTS_JSON: &str = "comments.json";
pub const COMMENTS_CSV: &str = "comments_abbrev.csv";
pub const COMMITS_JSON: &str = "commits.json";
pub const COMMITS_CSV: &str = "commits_abbrev.csv";
pub const PR_CSV: &str = "pr_abbrev.csv";
pub const SENTINEL: &str = "done";

/// Where each pull request's record lives: `<root>/<number>/...`.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_dir(&self, number: u64) -> PathBuf {
        self.root.join(number.to_string())
    }

    pub fn file(&self, number: u64, name: &str) -> PathBuf {
        self.record_dir(number).join(name)
    }

    pub fn sentinel(&self, number: u64) -> PathBuf {
        self.file(number, SENTINEL)
    }

    /// A record counts as complete only once its sentinel exists.
    pub fn is_complete(&self, number: u64) -> bool {
        self.sentinel(number).is_file()
    }
}

/// What `archive_pull` did for one pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Sentinel already present; nothing fetched.
    AlreadyArchived,
    Archived { comments: usize, commits: usize },
}

/// How the retry wrapper should treat a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Quota spent: wait for the reset, then retry once.
    RateLimited,
    /// Any other API failure: retry once.
    Transient,
    /// Retrying cannot help (local I/O, malformed data).
    Permanent,
}
