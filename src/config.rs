//! Runtime configuration: `.env`, environment variables, then CLI flags.

use std::time::Duration;

use thiserror::Error;

use crate::api::client::DEFAULT_TIMEOUT;
use crate::api::resource::DEFAULT_COLLECTION;

pub const ENV_API_URL: &str = "MSP_API_URL";
pub const ENV_API_KEY: &str = "MSP_API_KEY";
pub const ENV_COLLECTION: &str = "MSP_COLLECTION";
pub const ENV_TIMEOUT_SECS: &str = "MSP_TIMEOUT_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:54321/functions/v1/msp-gateway";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("MSP_TIMEOUT_SECS must be a positive number of seconds, got '{0}'")]
    InvalidTimeout(String),
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    /// Raw key, if one was configured. Validated when the client is built.
    pub api_key: Option<String>,
    pub collection: String,
    pub timeout: Duration,
}

/// Values given on the command line; `None` falls back to the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub collection: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Resolve settings from the process environment.
    pub fn load(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::resolve(overrides, |name| std::env::var(name).ok())
    }

    /// Resolve settings with an explicit variable lookup.
    pub fn resolve(
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let timeout = match overrides.timeout_secs {
            Some(secs) => parse_timeout(&secs.to_string())?,
            None => match non_empty(ENV_TIMEOUT_SECS) {
                Some(raw) => parse_timeout(&raw)?,
                None => DEFAULT_TIMEOUT,
            },
        };

        Ok(Self {
            api_url: overrides
                .api_url
                .or_else(|| non_empty(ENV_API_URL))
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: overrides.api_key.or_else(|| non_empty(ENV_API_KEY)),
            collection: overrides
                .collection
                .or_else(|| non_empty(ENV_COLLECTION))
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            timeout,
        })
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}
