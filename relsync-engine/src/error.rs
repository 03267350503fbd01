//! Error types for relsync-engine.

use std::time::Duration;

use thiserror::Error;

use relsync_core::ForgeError;

/// Why a single target's evaluation failed.
///
/// Every variant is local to one target; none of them stops sibling
/// evaluations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("branch '{branch}' not found")]
    BranchNotFound { branch: String },

    /// Branch lookup failed for a reason other than absence.
    #[error("failed to look up branch '{branch}': {source}")]
    BranchLookupFailed {
        branch: String,
        #[source]
        source: ForgeError,
    },

    #[error("failed to look up commit {sha} of '{branch}': {source}")]
    CommitLookupFailed {
        branch: String,
        sha: String,
        #[source]
        source: ForgeError,
    },

    #[error("failed to list open pull requests: {source}")]
    PrListFailed {
        #[source]
        source: ForgeError,
    },

    #[error("failed to create pull request: {source}")]
    PrCreateFailed {
        #[source]
        source: ForgeError,
    },

    /// The pull request exists but has no reviewers; it is left open.
    #[error("pull request #{number} ({html_url}) created but requesting reviewers failed: {source}")]
    ReviewerAssignFailed {
        number: u64,
        html_url: String,
        #[source]
        source: ForgeError,
    },

    #[error("evaluation did not finish within {after:?}")]
    TimedOut { after: Duration },

    #[error("evaluation cancelled")]
    Cancelled,

    #[error("evaluation task failed: {0}")]
    TaskPanicked(String),
}

impl SyncError {
    /// Stable snake_case name for logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::BranchNotFound { .. } => "branch_not_found",
            SyncError::BranchLookupFailed { .. } => "branch_lookup_failed",
            SyncError::CommitLookupFailed { .. } => "commit_lookup_failed",
            SyncError::PrListFailed { .. } => "pr_list_failed",
            SyncError::PrCreateFailed { .. } => "pr_create_failed",
            SyncError::ReviewerAssignFailed { .. } => "reviewer_assign_failed",
            SyncError::TimedOut { .. } => "timed_out",
            SyncError::Cancelled => "cancelled",
            SyncError::TaskPanicked(_) => "task_panicked",
        }
    }

    /// `true` when a remote side effect already happened before the failure.
    pub fn is_partial(&self) -> bool {
        matches!(self, SyncError::ReviewerAssignFailed { .. })
    }

    /// The pull request left open by a partial failure.
    pub fn pull_request(&self) -> Option<(u64, &str)> {
        match self {
            SyncError::ReviewerAssignFailed {
                number, html_url, ..
            } => Some((*number, html_url.as_str())),
            _ => None,
        }
    }
}
