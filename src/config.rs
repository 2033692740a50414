//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for the Twitter backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    /// OAuth 1.0a Consumer Key (API Key)
    pub consumer_key: String,

    /// OAuth 1.0a Consumer Secret (API Secret)
    pub consumer_secret: String,

    /// OAuth 1.0a Access Token
    pub access_token: String,

    /// OAuth 1.0a Access Token Secret
    pub access_token_secret: String,

    /// Base URL for the Twitter API v2 (default: <https://api.twitter.com>)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// How long cached lookups stay fresh
    #[serde(default = "default_cache_ttl", with = "duration_secs")]
    pub cache_ttl: Duration,

    /// Page size for paginated endpoints
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_api_url() -> String {
    "https://api.twitter.com".into()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(900)
}

fn default_page_size() -> u32 {
    200
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl TwitterConfig {
    /// Build a configuration from `TWITTER_*` environment variables.
    ///
    /// Required: `TWITTER_CONSUMER_KEY`, `TWITTER_CONSUMER_SECRET`,
    /// `TWITTER_ACCESS_TOKEN`, `TWITTER_ACCESS_TOKEN_SECRET`.
    /// Optional: `TWITTER_API_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing variable.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    fn from_env_with(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            get(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("missing environment variable {key}")))
        };

        let mut config = Self {
            consumer_key: required("TWITTER_CONSUMER_KEY")?,
            consumer_secret: required("TWITTER_CONSUMER_SECRET")?,
            access_token: required("TWITTER_ACCESS_TOKEN")?,
            access_token_secret: required("TWITTER_ACCESS_TOKEN_SECRET")?,
            ..Self::default()
        };

        if let Some(url) = get("TWITTER_API_URL") {
            config.api_url = url;
        }

        Ok(config)
    }

    /// Check that all required credentials are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
            ("access_token", &self.access_token),
            ("access_token_secret", &self.access_token_secret),
        ];

        for (name, value) in fields {
            if value.is_empty() {
                return Err(Error::Config(format!("{name} is required")));
            }
        }

        Ok(())
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            access_token: String::new(),
            access_token_secret: String::new(),
            api_url: default_api_url(),
            timeout: default_timeout(),
            cache_ttl: default_cache_ttl(),
            page_size: default_page_size(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per request
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay between retries in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter factor (0.0-1.0)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_jitter() -> f64 {
    0.1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let config: TwitterConfig = serde_json::from_value(serde_json::json!({
            "consumer_key": "ck",
            "consumer_secret": "cs",
            "access_token": "at",
            "access_token_secret": "ats"
        }))
        .unwrap();

        assert_eq!(config.api_url, "https://api.twitter.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.cache_ttl, Duration::from_secs(900));
        assert_eq!(config.page_size, 200);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_validate_missing_credential() {
        let config = TwitterConfig {
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            access_token: "at".into(),
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("access_token_secret"));
    }

    #[test]
    fn test_from_env_complete() {
        let config = TwitterConfig::from_env_with(|key| match key {
            "TWITTER_CONSUMER_KEY" => Some("ck".into()),
            "TWITTER_CONSUMER_SECRET" => Some("cs".into()),
            "TWITTER_ACCESS_TOKEN" => Some("at".into()),
            "TWITTER_ACCESS_TOKEN_SECRET" => Some("ats".into()),
            "TWITTER_API_URL" => Some("http://localhost:9999".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.consumer_key, "ck");
        assert_eq!(config.api_url, "http://localhost:9999");
    }

    #[test]
    fn test_from_env_missing_variable() {
        let err = TwitterConfig::from_env_with(|key| match key {
            "TWITTER_CONSUMER_KEY" => Some("ck".into()),
            _ => None,
        })
        .unwrap_err();

        assert!(err.to_string().contains("TWITTER_CONSUMER_SECRET"));
    }
}
