//! Credential resolution.
//!
//! Precedence: personal access token, then GitHub App key (exchanged for an
//! installation token when the client is built), then a pre-exchanged
//! installation token, then anonymous access.

use std::fmt;

use crate::app::AppCredentials;
use crate::error::AuthSetupError;

pub const PERSONAL_TOKEN_ENV: &str = "GITHUB_ACCESS_TOKEN";
pub const INSTALLATION_TOKEN_ENV: &str = "GITHUB_INSTALLATION_TOKEN";

/// Raw credential inputs, typically read from the environment.
#[derive(Clone, Copy, Default)]
pub struct CredentialSources<'a> {
    pub personal_token: Option<&'a str>,
    pub app_key: Option<&'a str>,
    pub app_id: Option<&'a str>,
    pub installation_id: Option<&'a str>,
    pub installation_token: Option<&'a str>,
}

/// How requests are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    PersonalToken(String),
    App(AppCredentials),
    InstallationToken(String),
    Anonymous,
}

impl Credentials {
    /// Pick a credential from the optional sources.
    ///
    /// A source that is present but blank is an error, not a fallthrough:
    /// silently running anonymously would hide a broken deployment.
    pub fn resolve(sources: CredentialSources<'_>) -> Result<Self, AuthSetupError> {
        if let Some(token) = sources.personal_token {
            return check_token(token, PERSONAL_TOKEN_ENV)
                .map(|t| Credentials::PersonalToken(t.to_owned()));
        }
        if let Some(key) = sources.app_key {
            if key.trim().is_empty() {
                return Err(AuthSetupError::EmptyToken {
                    source_name: crate::app::APP_KEY_ENV,
                });
            }
            return AppCredentials::from_env_values(key, sources.app_id, sources.installation_id)
                .map(Credentials::App);
        }
        if let Some(token) = sources.installation_token {
            return check_token(token, INSTALLATION_TOKEN_ENV)
                .map(|t| Credentials::InstallationToken(t.to_owned()));
        }
        Ok(Credentials::Anonymous)
    }

    /// Short label for logs; never includes the secret.
    pub fn mode(&self) -> &'static str {
        match self {
            Credentials::PersonalToken(_) => "personal-token",
            Credentials::App(_) => "github-app",
            Credentials::InstallationToken(_) => "installation-token",
            Credentials::Anonymous => "anonymous",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => f.write_str("Anonymous"),
            Credentials::App(app) => f.debug_tuple("App").field(app).finish(),
            other => write!(f, "{}(<redacted>)", other.mode()),
        }
    }
}

fn check_token<'a>(token: &'a str, source_name: &'static str) -> Result<&'a str, AuthSetupError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthSetupError::EmptyToken { source_name });
    }
    if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AuthSetupError::MalformedToken { source_name });
    }
    Ok(token)
}
