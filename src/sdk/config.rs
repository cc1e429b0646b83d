use std::env;
use std::time::Duration;

use crate::{Error, Result};

pub const API_URL_VAR: &str = "MERCATO_API_URL";
pub const API_TOKEN_VAR: &str = "MERCATO_API_TOKEN";
pub const API_TIMEOUT_VAR: &str = "MERCATO_API_TIMEOUT_SECS";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach the REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `MERCATO_API_URL`, `MERCATO_API_TOKEN` and `MERCATO_API_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the environment, then lets every value set in `overrides` win.
    pub fn from_env_with(overrides: ConfigOverrides) -> Result<Self> {
        Self::from_lookup_with(|key| env::var(key).ok(), overrides)
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Self::from_lookup_with(lookup, ConfigOverrides::default())
    }

    pub fn from_lookup_with(
        lookup: impl Fn(&str) -> Option<String>,
        overrides: ConfigOverrides,
    ) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = overrides
            .base_url
            .or_else(|| get(API_URL_VAR))
            .ok_or_else(|| Error::Config(format!("{} is not set", API_URL_VAR)))?;
        let mut config = GatewayConfig::new(base_url);

        if let Some(token) = overrides.token.or_else(|| get(API_TOKEN_VAR)) {
            config = config.with_token(token);
        }
        match overrides.timeout {
            Some(timeout) => config = config.with_timeout(timeout),
            None => {
                if let Some(raw) = get(API_TIMEOUT_VAR) {
                    let secs: u64 = raw.trim().parse().map_err(|_| {
                        Error::Config(format!(
                            "{} must be a whole number of seconds, got {:?}",
                            API_TIMEOUT_VAR, raw
                        ))
                    })?;
                    config = config.with_timeout(Duration::from_secs(secs));
                }
            }
        }
        Ok(config)
    }
}

/// Values given explicitly (command-line flags) that take precedence over the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout: Option<Duration>,
}
