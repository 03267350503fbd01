//! # relsync-engine
//!
//! Release-sync decision engine and the concurrent orchestrator around it.
//!
//! [`SyncEngine::evaluate`] decides, for one [`relsync_core::SyncTarget`],
//! whether a release pull request must be opened. [`orchestrator::run`]
//! evaluates every configured target concurrently and collects one
//! [`SyncOutcome`] per target.

pub mod branch;
pub mod cancel;
pub mod creator;
pub mod duplicate;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod outcome;

pub use cancel::CancelToken;
pub use engine::{EngineOptions, SyncEngine};
pub use error::SyncError;
pub use orchestrator::{RunOptions, RunSummary, TargetReport};
pub use outcome::SyncOutcome;
