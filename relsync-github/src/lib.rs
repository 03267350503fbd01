//! # relsync-github
//!
//! GitHub REST implementation of [`relsync_core::ForgeApi`].
//!
//! Build a [`GitHubClient`] from resolved [`Credentials`]; the client is
//! `Send + Sync` and meant to be shared by every concurrent evaluation.
//! GitHub App credentials are exchanged for an installation token once, when
//! the client is built.

pub mod app;
pub mod auth;
pub mod client;
mod error;
mod wire;

pub use app::AppCredentials;
pub use auth::{CredentialSources, Credentials};
pub use client::{GitHubClient, DEFAULT_API_URL, DEFAULT_CALL_TIMEOUT, DEFAULT_PAGE_LIMIT};
pub use error::AuthSetupError;
