//! Pull request creator.

use chrono::NaiveDate;

use relsync_core::{ForgeApi, NewPullRequest, PullRequestHandle, ReleaseMarker, SyncTarget};

use crate::error::SyncError;

/// `"{marker} {base} <- {head} ({YYYY/MM/DD})"`
pub fn release_title(marker: &ReleaseMarker, target: &SyncTarget, run_date: NaiveDate) -> String {
    format!(
        "{marker} {} <- {} ({})",
        target.base_branch,
        target.head_branch,
        run_date.format("%Y/%m/%d")
    )
}

/// Open the release pull request, then request the configured reviewers.
///
/// Creation and reviewer assignment are two calls. When the second fails the
/// pull request stays open and the error carries its number.
pub fn create(
    forge: &dyn ForgeApi,
    target: &SyncTarget,
    marker: &ReleaseMarker,
    run_date: NaiveDate,
) -> Result<PullRequestHandle, SyncError> {
    let repo = target.repo_ref();
    let request = NewPullRequest {
        title: release_title(marker, target, run_date),
        head: target.head_branch.clone(),
        base: target.base_branch.clone(),
    };

    let pull = forge
        .create_pull(&repo, &request)
        .map_err(|source| SyncError::PrCreateFailed { source })?;

    if !target.reviewers.is_empty() {
        let reviewers: Vec<String> = target.reviewers.iter().cloned().collect();
        forge
            .request_reviewers(&repo, pull.number, &reviewers)
            .map_err(|source| SyncError::ReviewerAssignFailed {
                number: pull.number,
                html_url: pull.html_url.clone(),
                source,
            })?;
    }

    Ok(pull)
}
