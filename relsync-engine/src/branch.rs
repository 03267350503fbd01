//! Branch state reader: branch tip plus its authoring timestamp.

use relsync_core::{BranchState, ForgeApi, SyncTarget};

use crate::error::SyncError;

/// Resolve the tip of `branch` in `target`'s repository.
///
/// Two remote calls: branch lookup, then commit lookup for the tip SHA.
pub fn resolve(
    forge: &dyn ForgeApi,
    target: &SyncTarget,
    branch: &str,
) -> Result<BranchState, SyncError> {
    let repo = target.repo_ref();

    let sha = forge.branch_tip(&repo, branch).map_err(|source| {
        if source.is_not_found() {
            SyncError::BranchNotFound {
                branch: branch.to_owned(),
            }
        } else {
            SyncError::BranchLookupFailed {
                branch: branch.to_owned(),
                source,
            }
        }
    })?;

    let commit = forge
        .commit(&repo, &sha)
        .map_err(|source| SyncError::CommitLookupFailed {
            branch: branch.to_owned(),
            sha: sha.clone(),
            source,
        })?;

    Ok(BranchState {
        branch_name: branch.to_owned(),
        commit_sha: commit.sha,
        authored_at: commit.authored_at,
    })
}
