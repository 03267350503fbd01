//! Domain types for release syncing.
//!
//! Everything here is plain data: loaded once from configuration or derived
//! fresh from the forge on every run, never persisted.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The literal that identifies a release pull request by its title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseMarker(pub String);

impl ReleaseMarker {
    pub const DEFAULT: &'static str = "[NEW RELEASE]";

    /// `true` when `title` carries this marker anywhere.
    pub fn is_in(&self, title: &str) -> bool {
        title.contains(&self.0)
    }
}

impl Default for ReleaseMarker {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for ReleaseMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ReleaseMarker {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ReleaseMarker {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// An `owner/repo` pair on the forge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// One configured repository branch pair to keep in sync.
///
/// Field names on the wire are `owner`, `repo`, `head`, `base`, `reviewers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTarget {
    pub owner: String,
    pub repo: String,
    #[serde(rename = "head")]
    pub head_branch: String,
    #[serde(rename = "base")]
    pub base_branch: String,
    #[serde(default)]
    pub reviewers: BTreeSet<String>,
}

impl SyncTarget {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        head_branch: impl Into<String>,
        base_branch: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            head_branch: head_branch.into(),
            base_branch: base_branch.into(),
            reviewers: BTreeSet::new(),
        }
    }

    pub fn with_reviewers<I, S>(mut self, reviewers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reviewers = reviewers.into_iter().map(Into::into).collect();
        self
    }

    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(&self.owner, &self.repo)
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({} <- {})",
            self.owner, self.repo, self.base_branch, self.head_branch
        )
    }
}

// ---------------------------------------------------------------------------
// Forge-derived state
// ---------------------------------------------------------------------------

/// Commit metadata as returned by a commit lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub authored_at: DateTime<Utc>,
}

/// Tip of a branch at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchState {
    pub branch_name: String,
    pub commit_sha: String,
    pub authored_at: DateTime<Utc>,
}

/// An open pull request as seen by the duplicate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSummary {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub head_ref: String,
    pub base_ref: String,
    /// Base commit recorded on the pull request.
    pub base_sha: String,
}

/// Body of a pull-request creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
}

/// Identity of a pull request the creator opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestHandle {
    pub number: u64,
    pub html_url: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_defaults_to_new_release() {
        let marker = ReleaseMarker::default();
        assert_eq!(marker.to_string(), "[NEW RELEASE]");
        assert!(marker.is_in("[NEW RELEASE] main <- release (2024/01/03)"));
        assert!(!marker.is_in("NEW RELEASE main <- release"));
    }

    #[test]
    fn target_deserializes_wire_names_and_defaults_reviewers() {
        let target: SyncTarget = serde_json::from_str(
            r#"{"owner":"acme","repo":"api","head":"release","base":"main"}"#,
        )
        .expect("deserialize");
        assert_eq!(target.head_branch, "release");
        assert_eq!(target.base_branch, "main");
        assert!(target.reviewers.is_empty());
    }

    #[test]
    fn target_display_and_repo_ref() {
        let target = SyncTarget::new("acme", "api", "release", "main");
        assert_eq!(target.to_string(), "acme/api (main <- release)");
        assert_eq!(target.repo_ref().to_string(), "acme/api");
    }

    #[test]
    fn duplicate_reviewers_collapse() {
        let target =
            SyncTarget::new("acme", "api", "release", "main").with_reviewers(["bob", "alice", "bob"]);
        let names: Vec<_> = target.reviewers.iter().map(String::as_str).collect();
        assert_eq!(names, ["alice", "bob"]);
    }
}
