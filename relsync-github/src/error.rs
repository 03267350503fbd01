use thiserror::Error;

/// Failures while resolving credentials or building the client.
///
/// All of these abort a run before any target is evaluated.
#[derive(Debug, Error)]
pub enum AuthSetupError {
    #[error("{source_name} is set but empty")]
    EmptyToken { source_name: &'static str },

    #[error("{source_name} contains whitespace or control characters")]
    MalformedToken { source_name: &'static str },

    #[error("invalid API URL '{url}': expected http:// or https://")]
    InvalidApiUrl { url: String },

    #[error("{source_name} is required when an app key is configured")]
    MissingAppId { source_name: &'static str },

    #[error("{source_name} must be a positive integer, got '{value}'")]
    InvalidAppId {
        source_name: &'static str,
        value: String,
    },

    #[error("invalid app private key: {reason}")]
    InvalidAppKey { reason: String },

    #[error("failed to sign app token: {reason}")]
    AppTokenSigning { reason: String },

    #[error("failed to exchange app token for installation {installation_id}: {message}")]
    TokenExchange {
        installation_id: u64,
        message: String,
    },
}
