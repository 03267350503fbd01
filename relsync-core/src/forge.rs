//! The seam between the sync engine and a source-hosting service.

use crate::error::ForgeError;
use crate::types::{CommitInfo, NewPullRequest, PullRequestHandle, PullRequestSummary, RepoRef};

/// Remote operations the sync engine needs from a forge.
///
/// Calls block the current thread; the orchestrator runs every evaluation on
/// tokio's blocking pool. Implementations are shared across concurrent
/// evaluations and must not keep per-caller session state.
pub trait ForgeApi: Send + Sync {
    /// Tip commit SHA of `branch`. A missing branch is [`ForgeError::NotFound`].
    fn branch_tip(&self, repo: &RepoRef, branch: &str) -> Result<String, ForgeError>;

    /// Author metadata for the commit `sha`.
    fn commit(&self, repo: &RepoRef, sha: &str) -> Result<CommitInfo, ForgeError>;

    /// Every open pull request on `repo`, unfiltered.
    fn list_open_pulls(&self, repo: &RepoRef) -> Result<Vec<PullRequestSummary>, ForgeError>;

    fn create_pull(
        &self,
        repo: &RepoRef,
        pull: &NewPullRequest,
    ) -> Result<PullRequestHandle, ForgeError>;

    fn request_reviewers(
        &self,
        repo: &RepoRef,
        number: u64,
        reviewers: &[String],
    ) -> Result<(), ForgeError>;
}
