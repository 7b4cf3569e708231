//! Client configuration.
//!
//! A [`FacadeConfig`] is built once, validated, and handed to
//! [`FacadeClient::new`](crate::FacadeClient::new); the client never mutates
//! it afterwards. Values come from an optional JSON file with environment
//! variable overrides layered on top.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cfacade_util::expand_tilde;
use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "CFACADE_CONFIG_PATH";
/// Environment variable overriding the facade base URL.
pub const BASE_URL_ENV: &str = "CFACADE_URL";
/// Environment variable toggling acceptance of invalid TLS certificates.
pub const ACCEPT_INVALID_CERTS_ENV: &str = "CFACADE_ACCEPT_INVALID_CERTS";
/// Environment variable overriding the per-request timeout in seconds.
pub const TIMEOUT_ENV: &str = "CFACADE_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Hostnames allowed to use plain HTTP without opting in.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

/// Errors raised while loading or validating client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("facade base URL is not configured (set CFACADE_URL or baseUrl)")]
    MissingBaseUrl,

    #[error("invalid facade base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("facade base URL must use https for non-localhost hosts; got '{scheme}://{host}'")]
    InsecureScheme { scheme: String, host: String },

    #[error("invalid value '{value}' for {name}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("failed to read configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Immutable settings for talking to the facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct FacadeConfig {
    /// Base URL of the facade API, without a trailing slash.
    pub base_url: String,
    /// Skip TLS certificate verification. Off unless explicitly enabled.
    pub accept_invalid_certs: bool,
    /// Permit plain `http://` for hosts other than localhost.
    pub allow_insecure_http: bool,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            accept_invalid_certs: false,
            allow_insecure_http: false,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("cfacade/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        }
    }
}

impl FacadeConfig {
    /// Defaults with `base_url` filled in. Validation happens in
    /// [`normalized_base_url`](Self::normalized_base_url).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn with_allow_insecure_http(mut self, allow: bool) -> Self {
        self.allow_insecure_http = allow;
        self
    }

    /// Sub-second values round down and are clamped to one second.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Per-request timeout, never shorter than one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Layer `CFACADE_*` environment variables over the current values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(base_url) = env::var(BASE_URL_ENV)
            && !base_url.trim().is_empty()
        {
            self.base_url = base_url.trim().to_string();
        }
        if let Ok(raw) = env::var(ACCEPT_INVALID_CERTS_ENV) {
            self.accept_invalid_certs = parse_flag(ACCEPT_INVALID_CERTS_ENV, &raw)?;
        }
        if let Ok(raw) = env::var(TIMEOUT_ENV) {
            self.request_timeout_secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidEnv { name: TIMEOUT_ENV, value: raw })?;
        }
        Ok(())
    }

    /// Validate the base URL and return it normalized (trailing `/` removed).
    pub fn normalized_base_url(&self) -> Result<String, ConfigError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        validate_base_url(trimmed, self.allow_insecure_http)?;
        Ok(trimmed.to_string())
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value: raw.to_string(),
        }),
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - must parse and include a host
/// - scheme must be `http` or `https`
/// - `localhost`/`127.0.0.1`/`[::1]` may use either scheme
/// - other hosts must use `https` unless `allow_insecure_http` is set
pub fn validate_base_url(base: &str, allow_insecure_http: bool) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: base.to_string(),
        reason,
    };
    let parsed = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    let host = parsed.host_str().ok_or_else(|| invalid("missing host".into()))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" => {
            let is_local = LOCALHOST_DOMAINS.iter().any(|&allowed| host.eq_ignore_ascii_case(allowed));
            if is_local || allow_insecure_http {
                Ok(())
            } else {
                Err(ConfigError::InsecureScheme {
                    scheme: "http".into(),
                    host: host.to_string(),
                })
            }
        }
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

/// Returns the path of the configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("cfacade").join("config.json")
}

/// Load configuration from the default path and apply environment overrides.
pub fn load_config() -> Result<FacadeConfig, ConfigError> {
    let mut config = load_config_from_path(&default_config_path())?;
    config.apply_env_overrides()?;
    Ok(config)
}

/// Load configuration from a specific file. A missing file yields defaults.
pub fn load_config_from_path(path: &Path) -> Result<FacadeConfig, ConfigError> {
    if !path.exists() {
        return Ok(FacadeConfig::default());
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
