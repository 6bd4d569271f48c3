//! Client configuration

use crate::transport::{RetryPolicy, BASE_DELAY, MAX_RETRIES};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_NOTICE_DISMISS: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid service URL {0:?}: expected http:// or https://")]
    InvalidUrl(String),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Static configuration shared by every call
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub retry: RetryPolicy,
    /// Bounded wait for the health check
    pub health_timeout: Duration,
    /// How long a retryable notice stays up untouched
    pub notice_dismiss_after: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            notice_dismiss_after: DEFAULT_NOTICE_DISMISS,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unparseable values fall back
    /// to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("SYMPTOM_API_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let max_attempts = parse_var(&lookup, "SYMPTOM_MAX_RETRIES").unwrap_or(MAX_RETRIES);
        let base_delay = parse_var(&lookup, "SYMPTOM_RETRY_BASE_MS")
            .map_or(BASE_DELAY, Duration::from_millis);
        let health_timeout = parse_var(&lookup, "SYMPTOM_HEALTH_TIMEOUT_MS")
            .map_or(DEFAULT_HEALTH_TIMEOUT, Duration::from_millis);
        let notice_dismiss_after = parse_var(&lookup, "SYMPTOM_NOTICE_DISMISS_MS")
            .map_or(DEFAULT_NOTICE_DISMISS, Duration::from_millis);

        Self {
            base_url,
            retry: RetryPolicy::new(max_attempts, base_delay),
            health_timeout,
            notice_dismiss_after,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.starts_with("http://") || self.base_url.starts_with("https://") {
            Ok(())
        } else {
            Err(ConfigError::InvalidUrl(self.base_url.clone()))
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable setting, using default");
            None
        }
    }
}
