pub mod sync;
pub mod targets;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use relsync_core::config::{self, ConfigSource, DEFAULT_CONFIG_FILE};
use relsync_core::SyncTarget;
use relsync_github::app::{APP_ID_ENV, APP_KEY_ENV, INSTALLATION_ID_ENV};
use relsync_github::auth::{INSTALLATION_TOKEN_ENV, PERSONAL_TOKEN_ENV};
use relsync_github::{CredentialSources, Credentials, GitHubClient, DEFAULT_API_URL};

// ---------------------------------------------------------------------------
// Shared argument groups
// ---------------------------------------------------------------------------

/// Where the target list comes from.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Local target list (`.json`, `.yaml` or `.yml`).
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Fetch the target list over HTTP instead of reading `--config`.
    #[arg(long, env = "CONFIG_URL")]
    pub config_url: Option<String>,

    /// Bearer token sent with `--config-url`.
    #[arg(long, env = "CONFIG_URL_TOKEN", hide_env_values = true)]
    pub config_url_token: Option<String>,
}

impl ConfigArgs {
    pub fn source(&self) -> ConfigSource {
        match self.config_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => ConfigSource::Url {
                url: url.to_owned(),
                token: self.config_url_token.clone(),
            },
            _ => ConfigSource::File(self.config.clone()),
        }
    }

    pub fn load(&self) -> Result<Vec<SyncTarget>> {
        let source = self.source();
        let targets = config::load(&source)
            .with_context(|| format!("failed to load configuration from {source}"))?;
        tracing::info!(%source, targets = targets.len(), "configuration loaded");
        Ok(targets)
    }
}

/// GitHub endpoint and credentials.
#[derive(Args, Debug, Clone)]
pub struct AuthArgs {
    /// REST API base URL; set for GitHub Enterprise.
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Personal access token, sent as a bearer token.
    #[arg(long = "token", env = PERSONAL_TOKEN_ENV, hide_env_values = true)]
    pub personal_token: Option<String>,

    /// GitHub App private key, base64-encoded PEM.
    #[arg(long, env = APP_KEY_ENV, hide_env_values = true)]
    pub app_key: Option<String>,

    /// GitHub App id; required with `--app-key`.
    #[arg(long, env = APP_ID_ENV)]
    pub app_id: Option<String>,

    /// GitHub App installation id; required with `--app-key`.
    #[arg(long, env = INSTALLATION_ID_ENV)]
    pub installation_id: Option<String>,

    /// Pre-exchanged GitHub App installation token.
    #[arg(long, env = INSTALLATION_TOKEN_ENV, hide_env_values = true)]
    pub installation_token: Option<String>,
}

impl AuthArgs {
    pub fn client(&self, call_timeout: Duration) -> Result<GitHubClient> {
        let credentials = Credentials::resolve(CredentialSources {
            personal_token: self.personal_token.as_deref(),
            app_key: self.app_key.as_deref(),
            app_id: self.app_id.as_deref(),
            installation_id: self.installation_id.as_deref(),
            installation_token: self.installation_token.as_deref(),
        })
        .context("failed to set up GitHub authentication")?;
        if matches!(credentials, Credentials::Anonymous) {
            tracing::warn!("no GitHub token configured; requests are anonymous and rate limited");
        }
        GitHubClient::new(&self.api_url, credentials, call_timeout)
            .context("failed to set up GitHub client")
    }
}
