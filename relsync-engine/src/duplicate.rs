//! Duplicate detector.
//!
//! The forge's listing endpoint cannot filter by base commit, so every open
//! pull request is fetched and matched here. A pull request is a pending
//! release when its recorded base SHA equals the *current* base tip and its
//! title carries the release marker.

use relsync_core::{ForgeApi, PullRequestSummary, ReleaseMarker, SyncTarget};

use crate::error::SyncError;

pub fn is_pending_release(
    pull: &PullRequestSummary,
    base_sha: &str,
    marker: &ReleaseMarker,
) -> bool {
    pull.base_sha == base_sha && marker.is_in(&pull.title)
}

/// First open release pull request against `base_sha`, if any.
pub fn find_pending_release(
    forge: &dyn ForgeApi,
    target: &SyncTarget,
    base_sha: &str,
    marker: &ReleaseMarker,
) -> Result<Option<PullRequestSummary>, SyncError> {
    let pulls = forge
        .list_open_pulls(&target.repo_ref())
        .map_err(|source| SyncError::PrListFailed { source })?;
    Ok(pulls
        .into_iter()
        .find(|pull| is_pending_release(pull, base_sha, marker)))
}

pub fn has_pending_release_pr(
    forge: &dyn ForgeApi,
    target: &SyncTarget,
    base_sha: &str,
    marker: &ReleaseMarker,
) -> Result<bool, SyncError> {
    Ok(find_pending_release(forge, target, base_sha, marker)?.is_some())
}
