//! Sync decision engine.
//!
//! ## `evaluate` — per-target decision
//!
//! 1. Resolve head and base branch state.
//! 2. Base authored at or after head → `NoActionNeeded`.
//! 3. Open release pull request on the current base tip → `DuplicateSkipped`.
//! 4. Dry run → `WouldCreate`; otherwise create → `Created`.
//!
//! Any failure ends the evaluation with `Failed`. The cancel token is checked
//! before each read step and claimed (committed) before the mutation step, so
//! a cancelled evaluation never mutates and a committed one always runs to
//! completion.

use std::sync::Arc;

use chrono::NaiveDate;

use relsync_core::{ForgeApi, PullRequestHandle, ReleaseMarker, SyncTarget};

use crate::cancel::CancelToken;
use crate::error::SyncError;
use crate::outcome::SyncOutcome;
use crate::{branch, creator, duplicate};

/// Run-wide settings shared by every evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Suppress every mutation call; report `WouldCreate` instead.
    pub dry_run: bool,
    pub marker: ReleaseMarker,
    /// Date stamped into release titles.
    pub run_date: NaiveDate,
}

impl EngineOptions {
    pub fn new(dry_run: bool, run_date: NaiveDate) -> Self {
        Self {
            dry_run,
            marker: ReleaseMarker::default(),
            run_date,
        }
    }

    pub fn with_marker(mut self, marker: ReleaseMarker) -> Self {
        self.marker = marker;
        self
    }
}

/// Evaluates targets against a shared forge client.
pub struct SyncEngine {
    forge: Arc<dyn ForgeApi>,
    options: EngineOptions,
}

impl SyncEngine {
    pub fn new(forge: Arc<dyn ForgeApi>, options: EngineOptions) -> Self {
        Self { forge, options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Decide and act for one target. Blocks on remote calls.
    pub fn evaluate(&self, target: &SyncTarget, cancel: &CancelToken) -> SyncOutcome {
        match self.try_evaluate(target, cancel) {
            Ok(outcome) => outcome,
            Err(err) => SyncOutcome::Failed(err),
        }
    }

    fn try_evaluate(
        &self,
        target: &SyncTarget,
        cancel: &CancelToken,
    ) -> Result<SyncOutcome, SyncError> {
        let forge = self.forge.as_ref();
        tracing::debug!(sync_target = %target, reviewers = ?target.reviewers, "evaluating");

        checkpoint(cancel)?;
        let head = branch::resolve(forge, target, &target.head_branch)?;
        tracing::info!(
            sync_target = %target,
            branch = %head.branch_name,
            sha = %head.commit_sha,
            authored_at = %head.authored_at,
            "head branch found",
        );

        checkpoint(cancel)?;
        let base = branch::resolve(forge, target, &target.base_branch)?;
        tracing::info!(
            sync_target = %target,
            branch = %base.branch_name,
            sha = %base.commit_sha,
            authored_at = %base.authored_at,
            "base branch found",
        );

        if base.authored_at >= head.authored_at {
            return Ok(SyncOutcome::NoActionNeeded);
        }

        checkpoint(cancel)?;
        let marker = &self.options.marker;
        if let Some(existing) =
            duplicate::find_pending_release(forge, target, &base.commit_sha, marker)?
        {
            tracing::info!(
                sync_target = %target,
                number = existing.number,
                base_sha = %base.commit_sha,
                "release pull request already open",
            );
            return Ok(SyncOutcome::DuplicateSkipped {
                existing: PullRequestHandle {
                    number: existing.number,
                    html_url: existing.html_url,
                },
            });
        }

        if self.options.dry_run {
            let title = creator::release_title(marker, target, self.options.run_date);
            tracing::info!(
                sync_target = %target,
                %title,
                "[dry-run] would open release pull request",
            );
            return Ok(SyncOutcome::WouldCreate { title });
        }

        if !cancel.commit() {
            return Err(SyncError::Cancelled);
        }
        let pull = creator::create(forge, target, marker, self.options.run_date)?;
        tracing::info!(
            sync_target = %target,
            number = pull.number,
            url = %pull.html_url,
            "release pull request created",
        );
        Ok(SyncOutcome::Created { pull })
    }
}

fn checkpoint(cancel: &CancelToken) -> Result<(), SyncError> {
    if cancel.is_cancelled() {
        Err(SyncError::Cancelled)
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use relsync_core::testing::{ForgeCall, ForgeOp, MemoryForge};
    use relsync_core::ForgeError;
    use rstest::rstest;

    use super::*;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
    }

    fn target() -> SyncTarget {
        SyncTarget::new("acme", "api", "release", "main").with_reviewers(["alice", "bob"])
    }

    /// head `abc123` at `head_day`, base `def456` at `base_day`.
    fn forge(head_day: u32, base_day: u32) -> Arc<MemoryForge> {
        let forge = Arc::new(MemoryForge::new());
        let repo = target().repo_ref();
        forge.set_branch(&repo, "release", "abc123", day(head_day));
        forge.set_branch(&repo, "main", "def456", day(base_day));
        forge
    }

    fn engine(forge: &Arc<MemoryForge>, dry_run: bool) -> SyncEngine {
        SyncEngine::new(forge.clone(), EngineOptions::new(dry_run, run_date()))
    }

    #[rstest]
    #[case::base_ahead(1, 2)]
    #[case::same_instant(2, 2)]
    fn base_not_behind_needs_no_action(#[case] head_day: u32, #[case] base_day: u32) {
        let forge = forge(head_day, base_day);
        let outcome = engine(&forge, false).evaluate(&target(), &CancelToken::new());
        assert_eq!(outcome, SyncOutcome::NoActionNeeded);
        assert_eq!(forge.mutation_count(), 0);
        assert!(!forge
            .calls()
            .iter()
            .any(|c| matches!(c, ForgeCall::ListOpenPulls { .. })));
    }

    #[test]
    fn head_ahead_without_duplicate_creates_with_reviewers() {
        let forge = forge(2, 1);
        let outcome = engine(&forge, false).evaluate(&target(), &CancelToken::new());

        let SyncOutcome::Created { pull } = &outcome else {
            panic!("expected Created, got {outcome:?}");
        };
        let calls = forge.calls();
        let creates: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                ForgeCall::CreatePull { pull, .. } => Some(pull),
                _ => None,
            })
            .collect();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].title, "[NEW RELEASE] main <- release (2024/01/03)");
        assert!(calls.contains(&ForgeCall::RequestReviewers {
            repo: target().repo_ref(),
            number: pull.number,
            reviewers: vec!["alice".into(), "bob".into()],
        }));
        assert_eq!(forge.mutation_count(), 2);
    }

    #[test]
    fn open_release_on_base_tip_is_duplicate() {
        let forge = forge(2, 1);
        let existing = forge.add_open_pull(
            &target().repo_ref(),
            "[NEW RELEASE] main <- release (2024/01/02)",
            "def456",
        );

        let outcome = engine(&forge, false).evaluate(&target(), &CancelToken::new());
        assert!(
            matches!(outcome, SyncOutcome::DuplicateSkipped { existing: ref e } if e.number == existing),
            "got {outcome:?}"
        );
        assert_eq!(forge.mutation_count(), 0);
    }

    #[test]
    fn release_on_stale_base_tip_is_not_duplicate() {
        let forge = forge(2, 1);
        forge.add_open_pull(&target().repo_ref(), "[NEW RELEASE] main <- release", "0ld5ha");

        let outcome = engine(&forge, false).evaluate(&target(), &CancelToken::new());
        assert_eq!(outcome.key(), "created");
    }

    #[test]
    fn dry_run_reports_title_without_mutations() {
        let forge = forge(2, 1);
        let outcome = engine(&forge, true).evaluate(&target(), &CancelToken::new());
        assert_eq!(
            outcome,
            SyncOutcome::WouldCreate {
                title: "[NEW RELEASE] main <- release (2024/01/03)".into()
            }
        );
        assert_eq!(forge.mutation_count(), 0);
    }

    #[test]
    fn second_run_against_unchanged_state_is_duplicate() {
        let forge = forge(2, 1);
        let engine = engine(&forge, false);

        let first = engine.evaluate(&target(), &CancelToken::new());
        assert_eq!(first.key(), "created");
        let second = engine.evaluate(&target(), &CancelToken::new());
        assert_eq!(second.key(), "duplicate_skipped");
        assert_eq!(forge.mutation_count(), 2, "only the first run mutates");
    }

    #[test]
    fn custom_marker_drives_title_and_duplicate_check() {
        let forge = forge(2, 1);
        forge.add_open_pull(&target().repo_ref(), "[NEW RELEASE] main <- release", "def456");
        let options = EngineOptions::new(true, run_date()).with_marker("[SHIP IT]".into());
        let outcome =
            SyncEngine::new(forge.clone(), options).evaluate(&target(), &CancelToken::new());
        assert_eq!(
            outcome,
            SyncOutcome::WouldCreate {
                title: "[SHIP IT] main <- release (2024/01/03)".into()
            }
        );
    }

    #[test]
    fn missing_head_branch_fails_before_base_lookup() {
        let forge = Arc::new(MemoryForge::new());
        forge.set_branch(&target().repo_ref(), "main", "def456", day(1));

        let outcome = engine(&forge, false).evaluate(&target(), &CancelToken::new());
        assert_eq!(
            outcome,
            SyncOutcome::Failed(SyncError::BranchNotFound {
                branch: "release".into()
            })
        );
        assert_eq!(forge.calls().len(), 1);
    }

    #[test]
    fn list_failure_fails_without_creating() {
        let forge = forge(2, 1);
        forge.fail(ForgeOp::ListOpenPulls, ForgeError::Transport("reset".into()));
        let outcome = engine(&forge, false).evaluate(&target(), &CancelToken::new());
        assert!(matches!(outcome, SyncOutcome::Failed(SyncError::PrListFailed { .. })));
        assert_eq!(forge.mutation_count(), 0);
    }

    #[test]
    fn creation_commits_the_token() {
        let forge = forge(2, 1);
        let cancel = CancelToken::new();
        let outcome = engine(&forge, false).evaluate(&target(), &cancel);
        assert_eq!(outcome.key(), "created");
        assert!(cancel.is_committed());
        assert!(!cancel.cancel(), "a committed evaluation cannot be cancelled");
    }

    #[test]
    fn dry_run_never_commits() {
        let forge = forge(2, 1);
        let cancel = CancelToken::new();
        engine(&forge, true).evaluate(&target(), &cancel);
        assert!(!cancel.is_committed());
    }

    #[test]
    fn cancelled_token_stops_before_any_call() {
        let forge = forge(2, 1);
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = engine(&forge, false).evaluate(&target(), &cancel);
        assert_eq!(outcome, SyncOutcome::Failed(SyncError::Cancelled));
        assert!(forge.calls().is_empty());
    }
}
