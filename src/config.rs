use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_CACHE_PATH: &str = "curify-cache.json";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

const API_URL_VAR: &str = "CURIFY_API_URL";
const ACCESS_TOKEN_VAR: &str = "CURIFY_ACCESS_TOKEN";
const CACHE_PATH_VAR: &str = "CURIFY_CACHE_PATH";
const HTTP_TIMEOUT_VAR: &str = "CURIFY_HTTP_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got '{value}'")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },
}

/// Runtime settings for the backend client and local cache
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub access_token: Option<String>,
    pub cache_path: PathBuf,
    pub http_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            access_token: None,
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(API_URL_VAR) {
            config.api_url = normalize_api_url(&raw).ok_or(ConfigError::InvalidUrl {
                var: API_URL_VAR,
                value: raw,
            })?;
        }

        config.access_token = normalize_token(lookup(ACCESS_TOKEN_VAR));

        if let Some(path) = lookup(CACHE_PATH_VAR) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                config.cache_path = PathBuf::from(trimmed);
            }
        }

        if let Some(raw) = lookup(HTTP_TIMEOUT_VAR) {
            config.http_timeout_secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout {
                    var: HTTP_TIMEOUT_VAR,
                    value: raw,
                })?;
        }

        tracing::debug!(
            "Client config: api_url={}, has_token={}, cache={:?}, timeout={}s",
            config.api_url,
            config.access_token.is_some(),
            config.cache_path,
            config.http_timeout_secs
        );

        Ok(config)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

pub fn normalize_api_url(input: &str) -> Option<String> {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Some(DEFAULT_API_URL.to_string());
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Some(trimmed.to_string())
    } else {
        None
    }
}

fn normalize_token(token: Option<String>) -> Option<String> {
    token.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.access_token.is_none());
        assert_eq!(config.cache_path, PathBuf::from(DEFAULT_CACHE_PATH));
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_overrides_are_normalized() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("CURIFY_API_URL", " https://api.curify-ai.com/ "),
            ("CURIFY_ACCESS_TOKEN", "  "),
            ("CURIFY_CACHE_PATH", "/tmp/curify.json"),
            ("CURIFY_HTTP_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://api.curify-ai.com");
        assert!(config.access_token.is_none());
        assert_eq!(config.cache_path, PathBuf::from("/tmp/curify.json"));
        assert_eq!(config.http_timeout_secs, 30);
    }

    #[test]
    fn test_rejects_malformed_values() {
        let url = ClientConfig::from_lookup(lookup_from(&[("CURIFY_API_URL", "ftp://x")]));
        assert!(matches!(url, Err(ConfigError::InvalidUrl { .. })));

        let timeout =
            ClientConfig::from_lookup(lookup_from(&[("CURIFY_HTTP_TIMEOUT_SECS", "0")]));
        assert!(matches!(timeout, Err(ConfigError::InvalidTimeout { .. })));
    }
}
