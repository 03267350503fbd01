//! Cooperative cancellation for blocking evaluations.
//!
//! A token moves from running to exactly one of two final states:
//! cancelled (the orchestrator gave up on the evaluation) or committed (the
//! engine has started creating the pull request). Whichever side wins the
//! transition decides; the other side has to respect it.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const RUNNING: u8 = 0;
const CANCELLED: u8 = 1;
const COMMITTED: u8 = 2;

/// Shared state between the orchestrator and one blocking evaluation.
#[derive(Debug, Clone)]
pub struct CancelToken(Arc<AtomicU8>);

impl Default for CancelToken {
    fn default() -> Self {
        Self(Arc::new(AtomicU8::new(RUNNING)))
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the evaluation to stop at its next step.
    ///
    /// Returns `false` when the evaluation already committed to its
    /// mutation; the caller must then wait for its real outcome.
    pub fn cancel(&self) -> bool {
        match self
            .0
            .compare_exchange(RUNNING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => true,
            Err(state) => state == CANCELLED,
        }
    }

    /// Claim the mutation step. Returns `false` if the token was cancelled
    /// first.
    pub fn commit(&self) -> bool {
        match self
            .0
            .compare_exchange(RUNNING, COMMITTED, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => true,
            Err(state) => state == COMMITTED,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst) == CANCELLED
    }

    pub fn is_committed(&self) -> bool {
        self.0.load(Ordering::SeqCst) == COMMITTED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        assert!(token.cancel());
        assert!(other.is_cancelled());
    }

    #[test]
    fn cancel_before_commit_wins() {
        let token = CancelToken::new();
        assert!(token.cancel());
        assert!(!token.commit());
        assert!(!token.is_committed());
        assert!(token.cancel(), "cancelling twice stays cancelled");
    }

    #[test]
    fn commit_before_cancel_wins() {
        let token = CancelToken::new();
        assert!(token.commit());
        assert!(!token.cancel());
        assert!(!token.is_cancelled());
        assert!(token.is_committed());
    }
}
