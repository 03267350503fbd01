//! Test doubles, available to other crates through the `testing` feature.
//!
//! [`MemoryForge`] mimics the behaviour of a real forge closely enough for
//! the engine: branches point at commits, created pull requests record the
//! base tip at creation time and show up in later listings. Every call is
//! recorded, and any operation can be made to fail. [`http::HttpStub`] is a
//! local HTTP server for clients that speak real HTTP.

pub mod http;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::ForgeError;
use crate::forge::ForgeApi;
use crate::types::{CommitInfo, NewPullRequest, PullRequestHandle, PullRequestSummary, RepoRef};

/// Operation names used for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForgeOp {
    BranchTip,
    Commit,
    ListOpenPulls,
    CreatePull,
    RequestReviewers,
}

/// Record of a single forge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForgeCall {
    BranchTip { repo: RepoRef, branch: String },
    Commit { repo: RepoRef, sha: String },
    ListOpenPulls { repo: RepoRef },
    CreatePull { repo: RepoRef, pull: NewPullRequest },
    RequestReviewers { repo: RepoRef, number: u64, reviewers: Vec<String> },
}

impl ForgeCall {
    /// `true` for calls that change remote state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ForgeCall::CreatePull { .. } | ForgeCall::RequestReviewers { .. }
        )
    }
}

#[derive(Debug, Default)]
struct State {
    branches: HashMap<(RepoRef, String), String>,
    commits: HashMap<String, DateTime<Utc>>,
    pulls: HashMap<RepoRef, Vec<PullRequestSummary>>,
    failures: HashMap<(Option<RepoRef>, ForgeOp), ForgeError>,
    calls: Vec<ForgeCall>,
    next_number: u64,
}

/// Thread-safe in-memory [`ForgeApi`].
#[derive(Debug, Default)]
pub struct MemoryForge {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl MemoryForge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Point `branch` at a commit `sha` authored at `authored_at`.
    pub fn set_branch(
        &self,
        repo: &RepoRef,
        branch: &str,
        sha: &str,
        authored_at: DateTime<Utc>,
    ) -> &Self {
        let mut state = self.lock();
        state
            .branches
            .insert((repo.clone(), branch.to_owned()), sha.to_owned());
        state.commits.insert(sha.to_owned(), authored_at);
        self
    }

    /// Add an already-open pull request and return its number.
    pub fn add_open_pull(&self, repo: &RepoRef, title: &str, base_sha: &str) -> u64 {
        let mut state = self.lock();
        let number = state.allocate_number();
        state.pulls.entry(repo.clone()).or_default().push(PullRequestSummary {
            number,
            title: title.to_owned(),
            html_url: pull_url(repo, number),
            head_ref: String::new(),
            base_ref: String::new(),
            base_sha: base_sha.to_owned(),
        });
        number
    }

    /// Make every `op` call fail with `error`, on any repository.
    pub fn fail(&self, op: ForgeOp, error: ForgeError) -> &Self {
        self.lock().failures.insert((None, op), error);
        self
    }

    /// Make `op` calls on `repo` fail with `error`.
    pub fn fail_for(&self, repo: &RepoRef, op: ForgeOp, error: ForgeError) -> &Self {
        self.lock().failures.insert((Some(repo.clone()), op), error);
        self
    }

    pub fn calls(&self) -> Vec<ForgeCall> {
        self.lock().calls.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_mutation()).count()
    }

    pub fn open_pulls(&self, repo: &RepoRef) -> Vec<PullRequestSummary> {
        self.lock().pulls.get(repo).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(
        &self,
        repo: &RepoRef,
        op: ForgeOp,
        call: ForgeCall,
    ) -> Result<MutexGuard<'_, State>, ForgeError> {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        let mut state = self.lock();
        state.calls.push(call);
        let injected = state
            .failures
            .get(&(Some(repo.clone()), op))
            .or_else(|| state.failures.get(&(None, op)))
            .cloned();
        match injected {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

impl State {
    fn allocate_number(&mut self) -> u64 {
        self.next_number += 1;
        self.next_number
    }
}

fn pull_url(repo: &RepoRef, number: u64) -> String {
    format!("https://forge.test/{repo}/pull/{number}")
}

impl ForgeApi for MemoryForge {
    fn branch_tip(&self, repo: &RepoRef, branch: &str) -> Result<String, ForgeError> {
        let call = ForgeCall::BranchTip {
            repo: repo.clone(),
            branch: branch.to_owned(),
        };
        let state = self.enter(repo, ForgeOp::BranchTip, call)?;
        state
            .branches
            .get(&(repo.clone(), branch.to_owned()))
            .cloned()
            .ok_or_else(|| ForgeError::NotFound {
                resource: format!("branch '{branch}'"),
            })
    }

    fn commit(&self, repo: &RepoRef, sha: &str) -> Result<CommitInfo, ForgeError> {
        let call = ForgeCall::Commit {
            repo: repo.clone(),
            sha: sha.to_owned(),
        };
        let state = self.enter(repo, ForgeOp::Commit, call)?;
        state
            .commits
            .get(sha)
            .map(|authored_at| CommitInfo {
                sha: sha.to_owned(),
                authored_at: *authored_at,
            })
            .ok_or_else(|| ForgeError::NotFound {
                resource: format!("commit {sha}"),
            })
    }

    fn list_open_pulls(&self, repo: &RepoRef) -> Result<Vec<PullRequestSummary>, ForgeError> {
        let call = ForgeCall::ListOpenPulls { repo: repo.clone() };
        let state = self.enter(repo, ForgeOp::ListOpenPulls, call)?;
        Ok(state.pulls.get(repo).cloned().unwrap_or_default())
    }

    fn create_pull(
        &self,
        repo: &RepoRef,
        pull: &NewPullRequest,
    ) -> Result<PullRequestHandle, ForgeError> {
        let call = ForgeCall::CreatePull {
            repo: repo.clone(),
            pull: pull.clone(),
        };
        let mut state = self.enter(repo, ForgeOp::CreatePull, call)?;
        let base_sha = state
            .branches
            .get(&(repo.clone(), pull.base.clone()))
            .cloned()
            .ok_or_else(|| ForgeError::Status {
                status: 422,
                message: format!("base branch '{}' does not exist", pull.base),
            })?;
        let number = state.allocate_number();
        let html_url = pull_url(repo, number);
        state.pulls.entry(repo.clone()).or_default().push(PullRequestSummary {
            number,
            title: pull.title.clone(),
            html_url: html_url.clone(),
            head_ref: pull.head.clone(),
            base_ref: pull.base.clone(),
            base_sha,
        });
        Ok(PullRequestHandle { number, html_url })
    }

    fn request_reviewers(
        &self,
        repo: &RepoRef,
        number: u64,
        reviewers: &[String],
    ) -> Result<(), ForgeError> {
        let call = ForgeCall::RequestReviewers {
            repo: repo.clone(),
            number,
            reviewers: reviewers.to_vec(),
        };
        let state = self.enter(repo, ForgeOp::RequestReviewers, call)?;
        let exists = state
            .pulls
            .get(repo)
            .is_some_and(|pulls| pulls.iter().any(|p| p.number == number));
        if exists {
            Ok(())
        } else {
            Err(ForgeError::NotFound {
                resource: format!("pull request #{number}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn created_pull_records_current_base_tip() {
        let forge = MemoryForge::new();
        let repo = RepoRef::new("acme", "api");
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        forge.set_branch(&repo, "main", "def456", at);

        let handle = forge
            .create_pull(
                &repo,
                &NewPullRequest {
                    title: "t".into(),
                    head: "release".into(),
                    base: "main".into(),
                },
            )
            .expect("create");

        let pulls = forge.list_open_pulls(&repo).expect("list");
        assert_eq!(pulls.len(), 1);
        assert_eq!(pulls[0].number, handle.number);
        assert_eq!(pulls[0].base_sha, "def456");
        assert_eq!(forge.mutation_count(), 1);
    }

    #[test]
    fn repo_scoped_failure_wins_over_global() {
        let forge = MemoryForge::new();
        let repo = RepoRef::new("acme", "api");
        forge.fail(ForgeOp::ListOpenPulls, ForgeError::Transport("global".into()));
        forge.fail_for(&repo, ForgeOp::ListOpenPulls, ForgeError::Transport("scoped".into()));

        let err = forge.list_open_pulls(&repo).unwrap_err();
        assert_eq!(err, ForgeError::Transport("scoped".into()));
        let other = forge.list_open_pulls(&RepoRef::new("acme", "web")).unwrap_err();
        assert_eq!(other, ForgeError::Transport("global".into()));
    }

    #[test]
    fn unknown_branch_is_not_found() {
        let forge = MemoryForge::new();
        let err = forge
            .branch_tip(&RepoRef::new("acme", "api"), "nope")
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
