//! Runtime settings read from the environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::config::{resolve_state_dir, CACHE_SUBDIR, PENDING_SUBDIR};
use crate::error::{ConfigError, Result};

pub const API_URL_ENV: &str = "REPORT_API_URL";
pub const API_KEY_ENV: &str = "REPORT_API_KEY";
pub const CACHE_VERSION_ENV: &str = "REPORT_CACHE_VERSION";
pub const APP_SCOPE_ENV: &str = "REPORT_APP_SCOPE";
pub const STALL_THRESHOLD_ENV: &str = "REPORT_STALL_THRESHOLD";
pub const PROBE_INTERVAL_ENV: &str = "REPORT_PROBE_INTERVAL_SECS";

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/";
const DEFAULT_CACHE_PREFIX: &str = "report-app";
const DEFAULT_CACHE_VERSION: &str = "v1";
const DEFAULT_STALL_THRESHOLD: u32 = 20;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 45;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Settings shared by every report-app command.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the report service.
    pub api_url: Url,
    /// Sent as `X-API-KEY` when set.
    pub api_key: Option<String>,
    /// Cache name prefix; the cache name is `{prefix}-{version}`.
    pub cache_prefix: String,
    /// Offline cache version tag.
    pub cache_version: String,
    /// URL the mini app is served from. Defaults to the API base.
    pub app_scope: Url,
    /// Failed attempts before an entry is reported as stalled.
    pub stall_threshold: u32,
    /// Interval between health probes in `watch` mode.
    pub probe_interval: Duration,
    /// Timeout for a single health probe.
    pub probe_timeout: Duration,
    /// Root of local state.
    pub state_dir: PathBuf,
}

fn parse_url(var: &'static str, value: &str) -> Result<Url> {
    Url::parse(value.trim()).map_err(|e| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_number<T>(var: &'static str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

impl AppConfig {
    /// Reads settings from the process environment.
    ///
    /// Load `.env` files before calling this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Unset or blank variables take
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_url = match get(API_URL_ENV) {
            Some(value) => parse_url(API_URL_ENV, &value)?,
            None => parse_url(API_URL_ENV, DEFAULT_API_URL)?,
        };
        let app_scope = match get(APP_SCOPE_ENV) {
            Some(value) => parse_url(APP_SCOPE_ENV, &value)?,
            None => api_url.clone(),
        };
        let stall_threshold = match get(STALL_THRESHOLD_ENV) {
            Some(value) => parse_number(STALL_THRESHOLD_ENV, &value)?,
            None => DEFAULT_STALL_THRESHOLD,
        };
        let probe_secs: u64 = match get(PROBE_INTERVAL_ENV) {
            Some(value) => parse_number(PROBE_INTERVAL_ENV, &value)?,
            None => DEFAULT_PROBE_INTERVAL_SECS,
        };
        if probe_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: PROBE_INTERVAL_ENV,
                value: "0".to_string(),
                reason: "interval must be at least one second".to_string(),
            });
        }

        let config = Self {
            api_url,
            api_key: get(API_KEY_ENV).map(|key| key.trim().to_string()),
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            cache_version: get(CACHE_VERSION_ENV)
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| DEFAULT_CACHE_VERSION.to_string()),
            app_scope,
            stall_threshold,
            probe_interval: Duration::from_secs(probe_secs),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            state_dir: resolve_state_dir(&lookup),
        };
        debug!(
            api_url = %config.api_url,
            cache_version = %config.cache_version,
            state_dir = %config.state_dir.display(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Sets the state directory.
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Sets the cache version.
    pub fn with_cache_version(mut self, version: impl Into<String>) -> Self {
        self.cache_version = version.into();
        self
    }

    /// Sets the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Pending store directory under this config's state dir.
    pub fn pending_dir(&self) -> PathBuf {
        self.state_dir.join(PENDING_SUBDIR)
    }

    /// Offline cache directory under this config's state dir.
    pub fn cache_dir(&self) -> PathBuf {
        self.state_dir.join(CACHE_SUBDIR)
    }
}
