//! Error types for relsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading the sync configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading a local config file.
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error; `origin` is the file path or URL of the document.
    #[error("failed to parse config from {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parse error for `.yaml` / `.yml` config files.
    #[error("failed to parse config from {origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The remote config endpoint answered with a non-200 status.
    #[error("HTTP error {status} fetching config from {url}")]
    HttpStatus { url: String, status: u16 },

    /// The remote config endpoint could not be reached.
    #[error("failed to fetch config from {url}: {message}")]
    Fetch { url: String, message: String },

    /// A target entry parsed but failed validation.
    #[error("invalid target #{index} in {origin}: {reason}")]
    Invalid {
        origin: String,
        index: usize,
        reason: String,
    },
}

/// Errors returned by a [`crate::ForgeApi`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForgeError {
    /// The remote resource (branch, commit, repository) does not exist.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The API answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, TLS, or per-call deadline failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// A paginated listing still had results after the page limit.
    #[error("{resource} exceed {limit} results; listing is incomplete")]
    Truncated { resource: String, limit: usize },
}

impl ForgeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ForgeError::NotFound { .. })
    }
}
