use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Environment variable holding the API base URL.
pub const API_URL_VAR: &str = "ACTIVITY_API_URL";
/// Optional artificial response latency in milliseconds.
pub const DELAY_VAR: &str = "ACTIVITY_API_DELAY_MS";
/// Optional freshness window for cached entries in milliseconds.
pub const STALE_TIME_VAR: &str = "ACTIVITY_API_STALE_MS";

/// Latency added to successful responses unless configured otherwise.
pub const DEFAULT_RESPONSE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidVar { name: &'static str, value: String },
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[cfg(feature = "toml")]
    #[error("failed to parse client config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Client settings, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: Url,
    /// Delay applied to every successful response.
    pub response_delay: Duration,
    /// Freshness of fetched entries when the server sends no `max-age`. `None` keeps entries fresh
    /// until invalidated.
    pub stale_time: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(ClientConfig {
            base_url: parse_base_url(base_url)?,
            response_delay: DEFAULT_RESPONSE_DELAY,
            stale_time: None,
        })
    }

    /// Read [`API_URL_VAR`], [`DELAY_VAR`] and [`STALE_TIME_VAR`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(API_URL_VAR).ok_or(ConfigError::MissingVar(API_URL_VAR))?;
        let mut config = Self::new(&base_url)?;
        if let Some(ms) = millis_var(&lookup, DELAY_VAR)? {
            config.response_delay = ms;
        }
        config.stale_time = millis_var(&lookup, STALE_TIME_VAR)?;
        Ok(config)
    }

    /// Parse a TOML document with `base_url`, and optionally `response_delay_ms` and `stale_time_ms`.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        #[derive(serde::Deserialize)]
        struct Raw {
            base_url: String,
            response_delay_ms: Option<u64>,
            stale_time_ms: Option<u64>,
        }
        let raw: Raw = toml::from_str(s)?;
        let mut config = Self::new(&raw.base_url)?;
        if let Some(ms) = raw.response_delay_ms {
            config.response_delay = Duration::from_millis(ms);
        }
        config.stale_time = raw.stale_time_ms.map(Duration::from_millis);
        Ok(config)
    }

    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn parse_base_url(s: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
        url: s.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(s.trim()).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("only http and https are supported"));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("url must have a host"));
    }
    Ok(url)
}

fn millis_var(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|_| ConfigError::InvalidVar { name, value })
}
