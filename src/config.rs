//! Configuration file parser for ~/.config/navigator/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged, since they are usually typos.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::api::{ApiConfig, ApiError, Endpoints, HttpGateway, SchemaVariant, DEFAULT_MAX_DOWNLOAD_BYTES};
use crate::prefs::{SystemTimezones, TimezoneProvider};

/// Environment variable that overrides `api_token`.
pub const TOKEN_ENV_VAR: &str = "NAVIGATOR_API_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

/// Client configuration. Every field has a default, so any subset of keys
/// may be given.
///
/// `Debug` masks `api_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend origin, e.g. `https://navigator.example.com`.
    pub base_url: String,

    /// Which backend generation to talk to.
    pub variant: SchemaVariant,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Account the daily summary is requested for.
    pub user_id: i64,

    /// Where downloaded reports are written. Defaults to the working directory.
    pub download_dir: Option<PathBuf>,

    /// Timezone for documents the server has no value for. Falls back to
    /// `$TZ` when unset.
    pub timezone: Option<String>,

    /// Bearer token. The env var takes precedence.
    pub api_token: Option<String>,

    /// Upper bound on a downloaded report body.
    pub max_download_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            variant: SchemaVariant::default(),
            request_timeout_secs: 30,
            user_id: 1,
            download_dir: None,
            timezone: None,
            api_token: None,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("variant", &self.variant)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_id", &self.user_id)
            .field("download_dir", &self.download_dir)
            .field("timezone", &self.timezone)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("max_download_bytes", &self.max_download_bytes)
            .finish()
    }
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "base_url",
        "variant",
        "request_timeout_secs",
        "user_id",
        "download_dir",
        "timezone",
        "api_token",
        "max_download_bytes",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line information
    /// - Over 1 MB → `Err(ConfigError::TooLarge)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            path = %path.display(),
            base_url = %config.base_url,
            variant = %config.variant,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Token from `NAVIGATOR_API_TOKEN`, else from the file.
    pub fn resolve_token(&self) -> Option<SecretString> {
        Self::pick_token(std::env::var(TOKEN_ENV_VAR).ok(), self.api_token.as_deref())
    }

    fn pick_token(env: Option<String>, file: Option<&str>) -> Option<SecretString> {
        env.filter(|t| !t.trim().is_empty())
            .or_else(|| file.filter(|t| !t.trim().is_empty()).map(str::to_owned))
            .map(SecretString::from)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn api_config(&self) -> Result<ApiConfig, ApiError> {
        Ok(ApiConfig::new(Endpoints::new(&self.base_url)?, self.variant))
    }

    /// HTTP gateway with timeout, download cap and token applied.
    pub fn gateway(&self) -> Result<HttpGateway, ApiError> {
        Ok(HttpGateway::new(self.api_config()?)?
            .with_timeout(self.request_timeout())
            .with_max_download_bytes(self.max_download_bytes)
            .with_token(self.resolve_token()))
    }

    /// IANA zone list, with the configured timezone as the local default.
    pub fn timezones(&self) -> Arc<dyn TimezoneProvider> {
        let system = SystemTimezones::default();
        match &self.timezone {
            Some(zone) if system.is_supported(zone) => {
                Arc::new(SystemTimezones::new(zone.clone()).pinned())
            }
            Some(zone) => {
                tracing::warn!(timezone = %zone, "Unknown timezone in config, ignoring");
                Arc::new(system)
            }
            None => Arc::new(system),
        }
    }
}
