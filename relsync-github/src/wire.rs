//! GitHub REST payloads, only the fields relsync reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relsync_core::{CommitInfo, PullRequestHandle, PullRequestSummary};

/// `GET /repos/{owner}/{repo}/branches/{branch}`
#[derive(Debug, Deserialize)]
pub(crate) struct Branch {
    pub commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchCommit {
    pub sha: String,
}

/// `GET /repos/{owner}/{repo}/git/commits/{sha}`
#[derive(Debug, Deserialize)]
pub(crate) struct GitCommit {
    pub sha: String,
    pub author: GitActor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitActor {
    pub date: DateTime<Utc>,
}

impl From<GitCommit> for CommitInfo {
    fn from(c: GitCommit) -> Self {
        CommitInfo {
            sha: c.sha,
            authored_at: c.author.date,
        }
    }
}

/// One element of `GET /repos/{owner}/{repo}/pulls`, also the body of a
/// successful create.
#[derive(Debug, Deserialize)]
pub(crate) struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    pub head: PullRef,
    pub base: PullRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

impl From<PullRequest> for PullRequestSummary {
    fn from(p: PullRequest) -> Self {
        PullRequestSummary {
            number: p.number,
            title: p.title,
            html_url: p.html_url,
            head_ref: p.head.ref_name,
            base_ref: p.base.ref_name,
            base_sha: p.base.sha,
        }
    }
}

impl From<PullRequest> for PullRequestHandle {
    fn from(p: PullRequest) -> Self {
        PullRequestHandle {
            number: p.number,
            html_url: p.html_url,
        }
    }
}

/// `POST /repos/{owner}/{repo}/pulls/{number}/requested_reviewers`
#[derive(Debug, Serialize)]
pub(crate) struct ReviewersRequest<'a> {
    pub reviewers: &'a [String],
}

/// `POST /app/installations/{installation_id}/access_tokens`
#[derive(Debug, Deserialize)]
pub(crate) struct InstallationAccessToken {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Error body GitHub returns alongside non-2xx statuses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiMessage {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_request_maps_base_sha_and_refs() {
        let raw = r#"{
            "number": 42,
            "title": "[NEW RELEASE] main <- release (2024/01/03)",
            "html_url": "https://github.com/acme/api/pull/42",
            "state": "open",
            "head": {"ref": "release", "sha": "abc123", "label": "acme:release"},
            "base": {"ref": "main", "sha": "def456", "label": "acme:main"}
        }"#;
        let pull: PullRequest = serde_json::from_str(raw).expect("decode");
        let summary = PullRequestSummary::from(pull);
        assert_eq!(summary.number, 42);
        assert_eq!(summary.base_sha, "def456");
        assert_eq!(summary.base_ref, "main");
        assert_eq!(summary.head_ref, "release");
    }

    #[test]
    fn git_commit_reads_author_date() {
        let raw = r#"{
            "sha": "abc123",
            "author": {"name": "a", "email": "a@x", "date": "2024-01-02T00:00:00Z"},
            "committer": {"name": "b", "email": "b@x", "date": "2024-01-05T00:00:00Z"}
        }"#;
        let commit: GitCommit = serde_json::from_str(raw).expect("decode");
        let info = CommitInfo::from(commit);
        assert_eq!(info.authored_at.to_rfc3339(), "2024-01-02T00:00:00+00:00");
    }
}
