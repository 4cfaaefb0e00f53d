use std::env;
use std::time::Duration;

use course_core::Clock;
use thiserror::Error;
use url::Url;

use crate::player::RetakePolicy;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid API base URL {raw:?}: {reason}")]
    InvalidBaseUrl { raw: String, reason: String },
}

/// Parses and normalizes an API base URL.
///
/// Only `http` and `https` are accepted. Query, fragment and trailing
/// slashes are dropped so endpoint paths can be appended as segments.
///
/// # Errors
///
/// Returns `ConfigError::InvalidBaseUrl` when `raw` is not such a URL.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };
    let mut url = Url::parse(raw.trim()).map_err(|err| invalid(&err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Where the course API lives and how long to wait for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// # Errors
    ///
    /// See [`parse_base_url`].
    pub fn parse(base_url: &str) -> Result<Self, ConfigError> {
        parse_base_url(base_url).map(Self::new)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `COURSE_API_URL` and `COURSE_API_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when `COURSE_API_URL` is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when `COURSE_API_URL` is set but invalid.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = match lookup("COURSE_API_URL").filter(|url| !url.trim().is_empty()) {
            Some(raw) => parse_base_url(&raw)?,
            None => default_base_url(),
        };
        let timeout = lookup("COURSE_API_TIMEOUT_SECS")
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Ok(Self::new(base_url).with_timeout(Duration::from_secs(timeout)))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(default_base_url())
    }
}

/// # Panics
///
/// Panics if `DEFAULT_API_URL` stops being a valid URL.
fn default_base_url() -> Url {
    parse_base_url(DEFAULT_API_URL).expect("default API URL should be valid")
}

/// Behavior knobs for the course player.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlayerConfig {
    pub retake_policy: RetakePolicy,
    pub clock: Clock,
}

impl PlayerConfig {
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_retake_policy(mut self, policy: RetakePolicy) -> Self {
        self.retake_policy = policy;
        self
    }

    /// Reads `COURSE_ENFORCE_MAX_RETAKES`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enforce = lookup("COURSE_ENFORCE_MAX_RETAKES").is_some_and(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        });
        Self {
            retake_policy: if enforce {
                RetakePolicy::EnforceLocally
            } else {
                RetakePolicy::ServerEnforced
            },
            clock: Clock::default_clock(),
        }
    }
}
