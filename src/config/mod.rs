//! Environment-backed configuration.
//!
//! The remote store is read from `UPSTASH_REDIS_REST_URL` /
//! `UPSTASH_REDIS_REST_TOKEN`; everything else has defaults overridable with
//! `DOCKET_*` variables.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::time::Duration;

use crate::constants::{DEFAULT_L1_CAPACITY, DEFAULT_L1_TTL_SECS};

/// Connection settings for the remote (tier 2) store.
#[derive(Clone)]
pub struct RemoteConfig {
    /// REST endpoint URL.
    pub url: String,
    /// Bearer token.
    pub token: String,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Cache configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote store settings. `None` disables tier 2 (degraded mode).
    pub remote: Option<RemoteConfig>,

    /// Per-request timeout for the remote store. Default: `5s`.
    pub request_timeout: Duration,

    /// Retries for transient remote failures. Default: `2`.
    pub request_retries: u32,

    /// Max entries in each in-process tier. Default: `1_000`.
    pub l1_capacity: u64,

    /// Time to live of in-process entries. Default: `300s`.
    pub l1_ttl: Duration,
}

/// Default request timeout used when `DOCKET_REQUEST_TIMEOUT_MS` is not set.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default retry count used when `DOCKET_REQUEST_RETRIES` is not set.
pub const DEFAULT_REQUEST_RETRIES: u32 = 2;

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            request_retries: DEFAULT_REQUEST_RETRIES,
            l1_capacity: DEFAULT_L1_CAPACITY,
            l1_ttl: Duration::from_secs(DEFAULT_L1_TTL_SECS),
        }
    }
}

impl Config {
    const ENV_REMOTE_URL: &'static str = "UPSTASH_REDIS_REST_URL";
    const ENV_REMOTE_TOKEN: &'static str = "UPSTASH_REDIS_REST_TOKEN";
    const ENV_REQUEST_TIMEOUT_MS: &'static str = "DOCKET_REQUEST_TIMEOUT_MS";
    const ENV_REQUEST_RETRIES: &'static str = "DOCKET_REQUEST_RETRIES";
    const ENV_L1_CAPACITY: &'static str = "DOCKET_L1_CAPACITY";
    const ENV_L1_TTL_SECS: &'static str = "DOCKET_L1_TTL_SECS";

    /// Loads configuration from environment variables (falling back to defaults).
    ///
    /// A missing URL or token is not an error: tier 2 is simply disabled.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let remote = Self::parse_remote_from_env();
        let request_timeout = Self::parse_u64_from_env(Self::ENV_REQUEST_TIMEOUT_MS)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_timeout);
        let request_retries = Self::parse_u64_from_env(Self::ENV_REQUEST_RETRIES)?
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .unwrap_or(defaults.request_retries);
        let l1_capacity =
            Self::parse_u64_from_env(Self::ENV_L1_CAPACITY)?.unwrap_or(defaults.l1_capacity);
        let l1_ttl = Self::parse_u64_from_env(Self::ENV_L1_TTL_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.l1_ttl);

        let config = Self {
            remote,
            request_timeout,
            request_retries,
            l1_capacity,
            l1_ttl,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates basic invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.l1_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_L1_CAPACITY,
                reason: "must be greater than 0",
            });
        }
        if self.l1_ttl.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_L1_TTL_SECS,
                reason: "must be greater than 0",
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_REQUEST_TIMEOUT_MS,
                reason: "must be greater than 0",
            });
        }
        if let Some(remote) = &self.remote
            && !(remote.url.starts_with("https://") || remote.url.starts_with("http://"))
        {
            return Err(ConfigError::InvalidUrl {
                value: remote.url.clone(),
            });
        }
        Ok(())
    }

    /// Returns `true` when a remote store is configured.
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    fn parse_remote_from_env() -> Option<RemoteConfig> {
        let url = Self::parse_optional_string_from_env(Self::ENV_REMOTE_URL)?;
        let token = Self::parse_optional_string_from_env(Self::ENV_REMOTE_TOKEN)?;
        Some(RemoteConfig { url, token })
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_u64_from_env(var_name: &'static str) -> Result<Option<u64>, ConfigError> {
        match Self::parse_optional_string_from_env(var_name) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                    source: e,
                }),
            None => Ok(None),
        }
    }
}
