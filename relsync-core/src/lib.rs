//! relsync core library — domain types, configuration loading, the forge
//! API seam, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs
//! - [`error`] — [`ConfigError`], [`ForgeError`]
//! - [`config`] — load / parse / validate sync targets
//! - [`forge`] — the [`ForgeApi`] trait the engine talks to
//! - `testing` (behind the `testing` feature) — `MemoryForge`, an in-memory
//!   [`ForgeApi`], and `HttpStub`, a local HTTP server

pub mod config;
pub mod error;
pub mod forge;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use error::{ConfigError, ForgeError};
pub use forge::ForgeApi;
pub use types::{
    BranchState, CommitInfo, NewPullRequest, PullRequestHandle, PullRequestSummary,
    ReleaseMarker, RepoRef, SyncTarget,
};
