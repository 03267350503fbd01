//! GitHub App authentication.
//!
//! The app's private key signs a short-lived RS256 JWT, which is exchanged
//! once per run for an installation access token. Every API call after that
//! uses the installation token.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;

use crate::client::API_VERSION;
use crate::error::AuthSetupError;
use crate::wire;

pub const APP_KEY_ENV: &str = "GITHUB_KEY";
pub const APP_ID_ENV: &str = "GITHUB_INTEGRATION_ID";
pub const INSTALLATION_ID_ENV: &str = "GITHUB_INSTALLATION_ID";

/// Backdate `iat` to tolerate clock drift between us and GitHub.
const CLOCK_DRIFT: i64 = 60;
/// GitHub rejects app JWTs valid for longer than ten minutes.
const JWT_LIFETIME: i64 = 9 * 60;

/// App id, installation id and private key of a GitHub App installation.
#[derive(Clone, PartialEq, Eq)]
pub struct AppCredentials {
    app_id: u64,
    installation_id: u64,
    private_key_pem: Vec<u8>,
}

#[derive(Debug, Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

impl AppCredentials {
    /// Validate a PEM-encoded RSA private key and pair it with the ids.
    pub fn new(
        app_id: u64,
        installation_id: u64,
        private_key_pem: Vec<u8>,
    ) -> Result<Self, AuthSetupError> {
        EncodingKey::from_rsa_pem(&private_key_pem).map_err(|e| AuthSetupError::InvalidAppKey {
            reason: e.to_string(),
        })?;
        Ok(Self {
            app_id,
            installation_id,
            private_key_pem,
        })
    }

    /// Build from raw environment values: `key` is the base64-encoded PEM
    /// (a bare PEM is accepted too), the ids must be positive integers.
    pub fn from_env_values(
        key: &str,
        app_id: Option<&str>,
        installation_id: Option<&str>,
    ) -> Result<Self, AuthSetupError> {
        let app_id = parse_id(app_id, APP_ID_ENV)?;
        let installation_id = parse_id(installation_id, INSTALLATION_ID_ENV)?;
        Self::new(app_id, installation_id, decode_key(key)?)
    }

    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    pub fn installation_id(&self) -> u64 {
        self.installation_id
    }

    /// Sign the app JWT used to request installation tokens.
    pub fn jwt(&self, now: DateTime<Utc>) -> Result<String, AuthSetupError> {
        let claims = AppClaims {
            iat: (now - Duration::seconds(CLOCK_DRIFT)).timestamp(),
            exp: (now + Duration::seconds(JWT_LIFETIME)).timestamp(),
            iss: self.app_id.to_string(),
        };
        let key = EncodingKey::from_rsa_pem(&self.private_key_pem).map_err(|e| {
            AuthSetupError::InvalidAppKey {
                reason: e.to_string(),
            }
        })?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
            AuthSetupError::AppTokenSigning {
                reason: e.to_string(),
            }
        })
    }

    /// Trade a fresh app JWT for an installation access token.
    pub(crate) fn exchange(
        &self,
        agent: &ureq::Agent,
        api_url: &str,
    ) -> Result<String, AuthSetupError> {
        let jwt = self.jwt(Utc::now())?;
        let url = format!(
            "{api_url}/app/installations/{}/access_tokens",
            self.installation_id
        );
        let exchange_failed = |message: String| AuthSetupError::TokenExchange {
            installation_id: self.installation_id,
            message,
        };

        let response = agent
            .post(&url)
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", API_VERSION)
            .set("Authorization", &format!("Bearer {jwt}"))
            .call()
            .map_err(|err| match err {
                ureq::Error::Status(status, response) => {
                    let message = response
                        .into_json::<wire::ApiMessage>()
                        .map(|m| m.message)
                        .unwrap_or_default();
                    exchange_failed(format!("API returned {status}: {message}"))
                }
                ureq::Error::Transport(transport) => exchange_failed(transport.to_string()),
            })?;
        let issued: wire::InstallationAccessToken = response
            .into_json()
            .map_err(|e| exchange_failed(format!("unexpected response body: {e}")))?;

        tracing::info!(
            app_id = self.app_id,
            installation_id = self.installation_id,
            expires_at = ?issued.expires_at,
            "installation token issued",
        );
        Ok(issued.token)
    }
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

fn parse_id(raw: Option<&str>, source_name: &'static str) -> Result<u64, AuthSetupError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Err(AuthSetupError::MissingAppId { source_name });
    };
    let invalid = || AuthSetupError::InvalidAppId {
        source_name,
        value: raw.to_owned(),
    };
    match raw.parse::<i64>().map_err(|_| invalid())? {
        0 => Err(AuthSetupError::MissingAppId { source_name }),
        id if id < 0 => Err(invalid()),
        id => u64::try_from(id).map_err(|_| invalid()),
    }
}

fn decode_key(raw: &str) -> Result<Vec<u8>, AuthSetupError> {
    let raw = raw.trim();
    if raw.starts_with("-----BEGIN") {
        return Ok(raw.as_bytes().to_vec());
    }
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| AuthSetupError::InvalidAppKey {
            reason: format!("invalid base64: {e}"),
        })
}
