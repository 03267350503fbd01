//! Sync target configuration.
//!
//! # Sources
//!
//! ```text
//! app.config.json        local JSON document (default)
//! targets.yaml           local YAML document, same schema
//! https://…/config.json  remote JSON document, optional bearer token
//! ```
//!
//! # Schema
//!
//! ```json
//! [
//!   { "owner": "acme", "repo": "api", "head": "release", "base": "main",
//!     "reviewers": ["alice", "bob"] }
//! ]
//! ```
//!
//! `reviewers` is optional. Every loader validates the parsed entries before
//! returning them, so the engine never sees a blank owner or a target whose
//! head and base are the same branch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::SyncTarget;

/// Config file read when no source is given.
pub const DEFAULT_CONFIG_FILE: &str = "app.config.json";

/// Deadline for the whole remote config request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Where to read the target list from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Url { url: String, token: Option<String> },
}

impl Default for ConfigSource {
    fn default() -> Self {
        ConfigSource::File(PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Url { url, .. } => f.write_str(url),
        }
    }
}

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

/// Load and validate targets from `source`.
pub fn load(source: &ConfigSource) -> Result<Vec<SyncTarget>, ConfigError> {
    let targets = match source {
        ConfigSource::File(path) => load_file(path)?,
        ConfigSource::Url { url, token } => fetch_url(url, token.as_deref())?,
    };
    tracing::debug!(source = %source, count = targets.len(), "loaded sync targets");
    Ok(targets)
}

/// Read a local config file. `.yaml` / `.yml` use YAML, anything else JSON.
pub fn load_file(path: &Path) -> Result<Vec<SyncTarget>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let origin = path.display().to_string();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => parse_yaml(&contents, &origin),
        _ => parse_json(&contents, &origin),
    }
}

/// GET a remote JSON config document.
///
/// The bearer header is only sent when `token` is non-blank.
pub fn fetch_url(url: &str, token: Option<&str>) -> Result<Vec<SyncTarget>, ConfigError> {
    let agent = ureq::AgentBuilder::new().timeout(FETCH_TIMEOUT).build();
    let mut request = agent
        .get(url)
        .set("Accept", "application/json")
        .set("Content-Type", "application/json");
    if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
        request = request.set("Authorization", &format!("Bearer {token}"));
    }

    let response = match request.call() {
        Ok(response) => response,
        Err(ureq::Error::Status(status, _)) => {
            return Err(ConfigError::HttpStatus {
                url: url.to_owned(),
                status,
            })
        }
        Err(ureq::Error::Transport(transport)) => {
            return Err(ConfigError::Fetch {
                url: url.to_owned(),
                message: transport.to_string(),
            })
        }
    };
    if response.status() != 200 {
        return Err(ConfigError::HttpStatus {
            url: url.to_owned(),
            status: response.status(),
        });
    }

    let body = response.into_string().map_err(|e| ConfigError::Fetch {
        url: url.to_owned(),
        message: e.to_string(),
    })?;
    parse_json(&body, url)
}

// ---------------------------------------------------------------------------
// 2. Parse
// ---------------------------------------------------------------------------

/// Parse a JSON target array. `origin` names the document in errors.
pub fn parse_json(contents: &str, origin: &str) -> Result<Vec<SyncTarget>, ConfigError> {
    let targets: Vec<SyncTarget> =
        serde_json::from_str(contents).map_err(|source| ConfigError::Json {
            origin: origin.to_owned(),
            source,
        })?;
    validate(&targets, origin)?;
    Ok(targets)
}

/// Parse a YAML target sequence. `origin` names the document in errors.
pub fn parse_yaml(contents: &str, origin: &str) -> Result<Vec<SyncTarget>, ConfigError> {
    let targets: Vec<SyncTarget> =
        serde_yaml::from_str(contents).map_err(|source| ConfigError::Yaml {
            origin: origin.to_owned(),
            source,
        })?;
    validate(&targets, origin)?;
    Ok(targets)
}

// ---------------------------------------------------------------------------
// 3. Validate
// ---------------------------------------------------------------------------

/// Reject entries the engine cannot evaluate meaningfully.
pub fn validate(targets: &[SyncTarget], origin: &str) -> Result<(), ConfigError> {
    for (index, target) in targets.iter().enumerate() {
        let invalid = |reason: String| ConfigError::Invalid {
            origin: origin.to_owned(),
            index,
            reason,
        };

        for (field, value) in [
            ("owner", &target.owner),
            ("repo", &target.repo),
            ("head", &target.head_branch),
            ("base", &target.base_branch),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(format!("`{field}` must not be empty")));
            }
        }
        if target.head_branch == target.base_branch {
            return Err(invalid(format!(
                "`head` and `base` are both '{}'",
                target.head_branch
            )));
        }
        if target.reviewers.iter().any(|r| r.trim().is_empty()) {
            return Err(invalid("reviewer names must not be empty".to_owned()));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::testing::http::HttpStub;

    #[test]
    fn parses_targets_in_order() {
        let json = r#"[
            {"owner":"acme","repo":"api","head":"release","base":"main","reviewers":["alice"]},
            {"owner":"acme","repo":"web","head":"develop","base":"master"}
        ]"#;
        let targets = parse_json(json, "inline").expect("parse");
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].repo, "api");
        assert!(targets[0].reviewers.contains("alice"));
        assert_eq!(targets[1].base_branch, "master");
        assert!(targets[1].reviewers.is_empty());
    }

    #[test]
    fn empty_array_is_valid() {
        assert!(parse_json("[]", "inline").expect("parse").is_empty());
    }

    #[test]
    fn malformed_json_names_origin() {
        let err = parse_json("{not json", "remote.json").unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }), "got: {err}");
        assert!(err.to_string().contains("remote.json"));
    }

    #[test]
    fn missing_required_field_is_parse_error() {
        let err = parse_json(r#"[{"owner":"acme","repo":"api","head":"release"}]"#, "x")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }), "got: {err}");
    }

    #[rstest]
    #[case(r#"[{"owner":" ","repo":"api","head":"release","base":"main"}]"#, "owner")]
    #[case(r#"[{"owner":"acme","repo":"","head":"release","base":"main"}]"#, "repo")]
    #[case(r#"[{"owner":"acme","repo":"api","head":"","base":"main"}]"#, "head")]
    #[case(r#"[{"owner":"acme","repo":"api","head":"main","base":"main"}]"#, "both 'main'")]
    #[case(
        r#"[{"owner":"acme","repo":"api","head":"release","base":"main","reviewers":[""]}]"#,
        "reviewer"
    )]
    fn validation_rejects(#[case] json: &str, #[case] needle: &str) {
        let err = parse_json(json, "app.config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { index: 0, .. }), "got: {err}");
        assert!(err.to_string().contains(needle), "got: {err}");
    }

    #[test]
    fn validation_reports_offending_index() {
        let json = r#"[
            {"owner":"acme","repo":"api","head":"release","base":"main"},
            {"owner":"acme","repo":"web","head":"main","base":"main"}
        ]"#;
        let err = parse_json(json, "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { index: 1, .. }), "got: {err}");
    }

    #[test]
    fn yaml_uses_same_schema() {
        let yaml = "- owner: acme\n  repo: api\n  head: release\n  base: main\n  reviewers: [alice, bob]\n";
        let targets = parse_yaml(yaml, "targets.yaml").expect("parse");
        assert_eq!(targets[0].reviewers.len(), 2);
    }

    #[test]
    fn default_source_is_app_config_json() {
        assert_eq!(
            ConfigSource::default(),
            ConfigSource::File(PathBuf::from("app.config.json"))
        );
    }

    // Remote documents, against a local HTTP stub.

    #[test]
    fn fetch_sends_bearer_token_when_given() {
        let stub = HttpStub::scripted(vec![(
            200,
            r#"[{"owner":"acme","repo":"api","head":"release","base":"main"}]"#.to_owned(),
        )])
        .expect("stub");
        let targets = load(&ConfigSource::Url {
            url: format!("{}/config.json", stub.url()),
            token: Some("s3cret".into()),
        })
        .expect("fetch");
        assert_eq!(targets.len(), 1);

        let requests = stub.finish();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path(), "/config.json");
        assert_eq!(requests[0].header("authorization"), Some("Bearer s3cret"));
        assert_eq!(requests[0].header("accept"), Some("application/json"));
    }

    #[test]
    fn fetch_omits_authorization_without_token() {
        let stub = HttpStub::scripted(vec![(200, "[]".to_owned())]).expect("stub");
        let targets = fetch_url(&format!("{}/config.json", stub.url()), Some("  ")).expect("fetch");
        assert!(targets.is_empty());
        assert!(stub.finish()[0].header("authorization").is_none());
    }

    #[test]
    fn fetch_non_ok_status_is_http_error() {
        let stub =
            HttpStub::scripted(vec![(403, r#"{"message":"nope"}"#.to_owned())]).expect("stub");
        let err = fetch_url(&format!("{}/config.json", stub.url()), None).unwrap_err();
        assert!(
            matches!(err, ConfigError::HttpStatus { status: 403, .. }),
            "got: {err}"
        );
        stub.finish();
    }

    #[test]
    fn fetch_unreachable_host_is_fetch_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let url = format!("http://{}/config.json", listener.local_addr().expect("addr"));
        drop(listener);

        let err = fetch_url(&url, None).unwrap_err();
        assert!(matches!(err, ConfigError::Fetch { .. }), "got: {err}");
    }
}
