//! Per-target evaluation result.

use relsync_core::PullRequestHandle;

use crate::error::SyncError;

/// Terminal state of one target's evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Base tip is at or ahead of the head tip.
    NoActionNeeded,
    /// An open release pull request already targets the current base tip.
    DuplicateSkipped { existing: PullRequestHandle },
    Created { pull: PullRequestHandle },
    /// Dry run: the pull request that would have been opened.
    WouldCreate { title: String },
    Failed(SyncError),
}

impl SyncOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }

    /// Stable snake_case name for logs and JSON output.
    pub fn key(&self) -> &'static str {
        match self {
            SyncOutcome::NoActionNeeded => "no_action_needed",
            SyncOutcome::DuplicateSkipped { .. } => "duplicate_skipped",
            SyncOutcome::Created { .. } => "created",
            SyncOutcome::WouldCreate { .. } => "would_create",
            SyncOutcome::Failed(_) => "failed",
        }
    }

    /// One-line human description.
    pub fn detail(&self) -> String {
        match self {
            SyncOutcome::NoActionNeeded => "base is up to date with head".to_string(),
            SyncOutcome::DuplicateSkipped { existing } => {
                format!("#{} already open ({})", existing.number, existing.html_url)
            }
            SyncOutcome::Created { pull } => format!("opened #{} ({})", pull.number, pull.html_url),
            SyncOutcome::WouldCreate { title } => format!("would open \"{title}\""),
            SyncOutcome::Failed(err) => err.to_string(),
        }
    }
}
