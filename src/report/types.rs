/// Counts for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Repository the run archived from (owner/name)
    pub repository: String,
    /// Records written during this run
    pub archived: usize,
    /// Records skipped because their sentinel already existed
    pub already_archived: usize,
    /// Numbers written to the failure log during this run
    pub failed: Vec<u64>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.archived + self.already_archived + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
