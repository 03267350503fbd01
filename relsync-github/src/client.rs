//! Blocking GitHub REST v3 client.
//!
//! One [`ureq::Agent`] carries the connection pool, the user agent and the
//! per-call deadline. Every request is independent; there is no retry and no
//! rate-limit coordination.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use relsync_core::{
    CommitInfo, ForgeApi, ForgeError, NewPullRequest, PullRequestHandle, PullRequestSummary,
    RepoRef,
};

use crate::auth::Credentials;
use crate::error::AuthSetupError;
use crate::wire;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Deadline for each individual HTTP call (connect + read + write).
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("relsync/", env!("CARGO_PKG_VERSION"));

/// GitHub's maximum page size for the pulls listing.
const PER_PAGE: usize = 100;
/// Default upper bound on followed pages (10k open pull requests).
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Ready-to-send `Authorization` value.
#[derive(Clone)]
struct AuthHeader(String);

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthHeader(<redacted>)")
    }
}

/// GitHub implementation of [`ForgeApi`].
#[derive(Debug, Clone)]
pub struct GitHubClient {
    agent: ureq::Agent,
    api_url: String,
    authorization: Option<AuthHeader>,
    page_limit: u32,
}

impl GitHubClient {
    /// Build a client against `api_url` (e.g. [`DEFAULT_API_URL`] or a
    /// GitHub Enterprise `https://host/api/v3`).
    ///
    /// App credentials are exchanged for an installation token here, so this
    /// performs one HTTP call in that mode.
    pub fn new(
        api_url: &str,
        credentials: Credentials,
        call_timeout: Duration,
    ) -> Result<Self, AuthSetupError> {
        let api_url = api_url.trim().trim_end_matches('/');
        if !(api_url.starts_with("https://") || api_url.starts_with("http://")) {
            return Err(AuthSetupError::InvalidApiUrl {
                url: api_url.to_owned(),
            });
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(call_timeout)
            .user_agent(USER_AGENT)
            .build();
        let authorization = match &credentials {
            Credentials::PersonalToken(token) => Some(AuthHeader(format!("Bearer {token}"))),
            Credentials::App(app) => {
                let token = app.exchange(&agent, api_url)?;
                Some(AuthHeader(format!("token {token}")))
            }
            Credentials::InstallationToken(token) => Some(AuthHeader(format!("token {token}"))),
            Credentials::Anonymous => None,
        };
        tracing::debug!(api_url, auth = credentials.mode(), "GitHub client ready");

        Ok(Self {
            agent,
            api_url: api_url.to_owned(),
            authorization,
            page_limit: DEFAULT_PAGE_LIMIT,
        })
    }

    /// Follow at most `pages` pages when listing open pull requests.
    pub fn with_page_limit(mut self, pages: u32) -> Self {
        self.page_limit = pages.max(1);
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{path}", self.api_url);
        let mut request = self
            .agent
            .request(method, &url)
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", API_VERSION);
        if let Some(AuthHeader(value)) = &self.authorization {
            request = request.set("Authorization", value);
        }
        request
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T, ForgeError> {
        let mut request = self.request("GET", path);
        for (key, value) in query {
            request = request.query(key, value);
        }
        let response = request.call().map_err(|e| map_error(e, resource))?;
        response
            .into_json()
            .map_err(|e| ForgeError::Decode(format!("{resource}: {e}")))
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        resource: &str,
    ) -> Result<T, ForgeError> {
        let response = self
            .request("POST", path)
            .send_json(body)
            .map_err(|e| map_error(e, resource))?;
        response
            .into_json()
            .map_err(|e| ForgeError::Decode(format!("{resource}: {e}")))
    }
}

impl ForgeApi for GitHubClient {
    fn branch_tip(&self, repo: &RepoRef, branch: &str) -> Result<String, ForgeError> {
        let path = format!("{}/branches/{}", repo_path(repo), encode_ref(branch));
        let found: wire::Branch = self.get_json(&path, &[], &format!("branch '{branch}'"))?;
        Ok(found.commit.sha)
    }

    fn commit(&self, repo: &RepoRef, sha: &str) -> Result<CommitInfo, ForgeError> {
        let path = format!("{}/git/commits/{}", repo_path(repo), encode_ref(sha));
        let commit: wire::GitCommit = self.get_json(&path, &[], &format!("commit {sha}"))?;
        Ok(commit.into())
    }

    fn list_open_pulls(&self, repo: &RepoRef) -> Result<Vec<PullRequestSummary>, ForgeError> {
        let path = format!("{}/pulls", repo_path(repo));
        let resource = format!("pull requests of {repo}");
        let mut pulls = Vec::new();

        for page in 1..=self.page_limit {
            let query = [
                ("state", "open".to_owned()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            let batch: Vec<wire::PullRequest> = self.get_json(&path, &query, &resource)?;
            let last = batch.len() < PER_PAGE;
            pulls.extend(batch.into_iter().map(PullRequestSummary::from));
            if last {
                tracing::debug!(repo = %repo, count = pulls.len(), "listed open pull requests");
                return Ok(pulls);
            }
        }

        // Every allowed page came back full; later pages were never read.
        tracing::warn!(
            repo = %repo,
            pages = self.page_limit,
            "open pull request listing hit the page limit",
        );
        Err(ForgeError::Truncated {
            resource,
            limit: pulls.len(),
        })
    }

    fn create_pull(
        &self,
        repo: &RepoRef,
        pull: &NewPullRequest,
    ) -> Result<PullRequestHandle, ForgeError> {
        let path = format!("{}/pulls", repo_path(repo));
        let created: wire::PullRequest =
            self.post_json(&path, pull, &format!("repository {repo}"))?;
        Ok(created.into())
    }

    fn request_reviewers(
        &self,
        repo: &RepoRef,
        number: u64,
        reviewers: &[String],
    ) -> Result<(), ForgeError> {
        let path = format!("{}/pulls/{number}/requested_reviewers", repo_path(repo));
        let body = wire::ReviewersRequest { reviewers };
        let _: serde_json::Value =
            self.post_json(&path, &body, &format!("pull request #{number}"))?;
        Ok(())
    }
}

fn repo_path(repo: &RepoRef) -> String {
    format!("/repos/{}/{}", encode_ref(&repo.owner), encode_ref(&repo.repo))
}

/// Percent-encode a path component, keeping `/` so `release/2024` addresses
/// the branch rather than a nested route.
fn encode_ref(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(char::from(byte));
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

fn map_error(err: ureq::Error, resource: &str) -> ForgeError {
    match err {
        ureq::Error::Status(404, _) => ForgeError::NotFound {
            resource: resource.to_owned(),
        },
        ureq::Error::Status(status, response) => {
            let message = response
                .into_json::<wire::ApiMessage>()
                .map(|m| m.message)
                .unwrap_or_default();
            ForgeError::Status { status, message }
        }
        ureq::Error::Transport(transport) => ForgeError::Transport(transport.to_string()),
    }
}
