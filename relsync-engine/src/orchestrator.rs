//! Concurrent fan-out over every configured target.
//!
//! Each target gets its own tokio task; the blocking engine call runs on the
//! blocking pool. Outcomes are logged as each evaluation finishes and
//! returned in configuration order once all have finished. A failed, timed
//! out or cancelled target never affects its siblings.
//!
//! A deadline or shutdown only abandons an evaluation that has not yet
//! committed to creating its pull request. Once committed, the orchestrator
//! waits for the real outcome so every opened pull request is reported.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::time::Instant;

use relsync_core::SyncTarget;

use crate::cancel::CancelToken;
use crate::engine::SyncEngine;
use crate::error::SyncError;
use crate::outcome::SyncOutcome;

/// Limits applied to a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum evaluations in flight; `None` runs every target at once.
    pub max_concurrency: Option<usize>,
    /// Deadline for a single evaluation, counted once it starts running.
    pub target_timeout: Option<Duration>,
}

/// Outcome of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub target: SyncTarget,
    pub outcome: SyncOutcome,
    pub elapsed: Duration,
}

/// Every report of a run, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<TargetReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn count(&self, key: &str) -> usize {
        self.reports.iter().filter(|r| r.outcome.key() == key).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_failed()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

/// Evaluate every target concurrently and wait for all of them.
///
/// Setting `shutdown` to `true` marks every unfinished, uncommitted
/// evaluation as `Failed(Cancelled)` and trips its cancel token.
pub async fn run(
    engine: Arc<SyncEngine>,
    targets: Vec<SyncTarget>,
    options: RunOptions,
    shutdown: watch::Receiver<bool>,
) -> RunSummary {
    let started = Instant::now();
    let limiter = options
        .max_concurrency
        .filter(|n| *n > 0)
        .map(|n| Arc::new(Semaphore::new(n)));
    tracing::info!(
        targets = targets.len(),
        dry_run = engine.options().dry_run,
        max_concurrency = ?options.max_concurrency,
        "starting release sync",
    );

    let handles: Vec<_> = targets
        .iter()
        .cloned()
        .map(|target| {
            tokio::spawn(evaluate_target(
                engine.clone(),
                target,
                limiter.clone(),
                options.target_timeout,
                shutdown.clone(),
            ))
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for (target, handle) in targets.into_iter().zip(handles) {
        let report = match handle.await {
            Ok(report) => report,
            Err(err) => TargetReport {
                target,
                outcome: SyncOutcome::Failed(SyncError::TaskPanicked(err.to_string())),
                elapsed: Duration::ZERO,
            },
        };
        reports.push(report);
    }

    let summary = RunSummary {
        reports,
        elapsed: started.elapsed(),
    };
    tracing::info!(
        total = summary.reports.len(),
        created = summary.count("created"),
        would_create = summary.count("would_create"),
        skipped = summary.count("duplicate_skipped"),
        failed = summary.failed(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "release sync finished",
    );
    summary
}

async fn evaluate_target(
    engine: Arc<SyncEngine>,
    target: SyncTarget,
    limiter: Option<Arc<Semaphore>>,
    deadline: Option<Duration>,
    mut shutdown: watch::Receiver<bool>,
) -> TargetReport {
    let started = Instant::now();
    let outcome = evaluate_with_limits(engine, &target, limiter, deadline, &mut shutdown).await;
    let elapsed = started.elapsed();
    log_outcome(&target, &outcome, elapsed);
    TargetReport {
        target,
        outcome,
        elapsed,
    }
}

async fn evaluate_with_limits(
    engine: Arc<SyncEngine>,
    target: &SyncTarget,
    limiter: Option<Arc<Semaphore>>,
    deadline: Option<Duration>,
    shutdown: &mut watch::Receiver<bool>,
) -> SyncOutcome {
    let _permit = match limiter {
        Some(semaphore) => tokio::select! {
            permit = semaphore.acquire_owned() => match permit {
                Ok(permit) => Some(permit),
                Err(_) => return SyncOutcome::Failed(SyncError::Cancelled),
            },
            () = shutdown_requested(shutdown) => return SyncOutcome::Failed(SyncError::Cancelled),
        },
        None => None,
    };

    let cancel = CancelToken::new();
    let task_cancel = cancel.clone();
    let task_target = target.clone();
    let mut handle =
        tokio::task::spawn_blocking(move || engine.evaluate(&task_target, &task_cancel));

    let interrupted = tokio::select! {
        joined = &mut handle => return joined_outcome(joined),
        after = expiry(deadline) => SyncError::TimedOut { after },
        () = shutdown_requested(shutdown) => SyncError::Cancelled,
    };

    if cancel.cancel() {
        // The blocking call keeps running; the token stops it at its next step.
        return SyncOutcome::Failed(interrupted);
    }
    tracing::warn!(
        sync_target = %target,
        interrupted = %interrupted,
        "pull request creation already under way, waiting for it to finish",
    );
    joined_outcome(handle.await)
}

/// Resolves once `deadline` has elapsed; never when there is none.
async fn expiry(deadline: Option<Duration>) -> Duration {
    match deadline {
        Some(limit) => {
            tokio::time::sleep(limit).await;
            limit
        }
        None => std::future::pending().await,
    }
}

fn joined_outcome(joined: Result<SyncOutcome, tokio::task::JoinError>) -> SyncOutcome {
    joined.unwrap_or_else(|err| SyncOutcome::Failed(SyncError::TaskPanicked(err.to_string())))
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Sender gone without a shutdown request: never fire.
            std::future::pending::<()>().await;
        }
    }
}

fn log_outcome(target: &SyncTarget, outcome: &SyncOutcome, elapsed: Duration) {
    let elapsed_ms = elapsed.as_millis() as u64;
    match outcome {
        SyncOutcome::Failed(err) => tracing::error!(
            sync_target = %target,
            kind = err.kind(),
            partial = err.is_partial(),
            error = %err,
            elapsed_ms,
            "release sync failed",
        ),
        other => tracing::info!(
            sync_target = %target,
            outcome = other.key(),
            detail = %other.detail(),
            elapsed_ms,
            "release sync finished for target",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_requested_fires_on_true() {
        let (tx, mut rx) = watch::channel(false);
        let mut waiter = tokio_test::task::spawn(shutdown_requested(&mut rx));
        tokio_test::assert_pending!(waiter.poll());
        tx.send(true).expect("send");
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn shutdown_requested_never_fires_when_sender_dropped() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let fired = tokio::time::timeout(Duration::from_secs(60), shutdown_requested(&mut rx)).await;
        assert!(fired.is_err());
    }

    #[test]
    fn summary_counts_by_outcome() {
        let target = SyncTarget::new("acme", "api", "release", "main");
        let report = |outcome| TargetReport {
            target: target.clone(),
            outcome,
            elapsed: Duration::ZERO,
        };
        let summary = RunSummary {
            reports: vec![
                report(SyncOutcome::NoActionNeeded),
                report(SyncOutcome::Failed(SyncError::Cancelled)),
                report(SyncOutcome::WouldCreate { title: "t".into() }),
            ],
            elapsed: Duration::ZERO,
        };
        assert_eq!(summary.count("no_action_needed"), 1);
        assert_eq!(summary.count("would_create"), 1);
        assert_eq!(summary.failed(), 1);
        assert!(summary.has_failures());
    }
}
