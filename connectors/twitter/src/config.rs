//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TwitterError, TwitterResult};

/// Configuration for the Twitter client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    /// OAuth 2.0 Bearer Token (app-only auth)
    pub bearer_token: String,

    /// Base URL for the Twitter API v2 (default: https://api.twitter.com)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout for REST calls. Stream connections are not bound by it.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Streaming subscription settings
    #[serde(default)]
    pub stream: StreamConfig,
}

fn default_api_url() -> String {
    "https://api.twitter.com".into()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("twitter-client/{}", env!("CARGO_PKG_VERSION"))
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
    /// Create a configuration with the given bearer token and defaults elsewhere.
    #[must_use]
    pub fn new(bearer_token: impl Into<String>) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            ..Self::default()
        }
    }

    /// Point the client at a different API host.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Check that the configuration can be used to build a client.
    pub fn validate(&self) -> TwitterResult<()> {
        if self.bearer_token.trim().is_empty() {
            return Err(TwitterError::Config("bearer_token is required".into()));
        }
        if self.api_url.trim().is_empty() {
            return Err(TwitterError::Config("api_url is required".into()));
        }
        self.stream.validate()
    }

    /// Base path for user endpoints.
    #[must_use]
    pub fn users_url(&self) -> String {
        format!("{}/2/users", self.api_url.trim_end_matches('/'))
    }

    /// Base path for tweet endpoints.
    #[must_use]
    pub fn tweets_url(&self) -> String {
        format!("{}/2/tweets", self.api_url.trim_end_matches('/'))
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            bearer_token: String::new(),
            api_url: default_api_url(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            stream: StreamConfig::default(),
        }
    }
}

/// Settings for a streaming subscription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Capacity of the record channel. A full channel stalls the reader.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Capacity of the error channel.
    #[serde(default = "default_error_capacity")]
    pub error_capacity: usize,

    /// Largest line the decoder will buffer before giving up.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

const fn default_channel_capacity() -> usize {
    256
}

const fn default_error_capacity() -> usize {
    1
}

const fn default_max_line_bytes() -> usize {
    1024 * 1024
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            error_capacity: default_error_capacity(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

impl StreamConfig {
    /// Set the record channel capacity.
    #[must_use]
    pub const fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the maximum line size.
    #[must_use]
    pub const fn with_max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = limit;
        self
    }

    fn validate(&self) -> TwitterResult<()> {
        // tokio's mpsc panics on a zero capacity
        if self.channel_capacity == 0 || self.error_capacity == 0 {
            return Err(TwitterError::Config(
                "stream channel capacities must be non-zero".into(),
            ));
        }
        if self.max_line_bytes == 0 {
            return Err(TwitterError::Config(
                "stream max_line_bytes must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Rate limit information from Twitter API headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimitInfo {
    /// Maximum number of requests allowed in the window
    pub limit: Option<u32>,

    /// Remaining requests in the current window
    pub remaining: Option<u32>,

    /// Unix timestamp when the rate limit resets
    pub reset: Option<u64>,
}

impl RateLimitInfo {
    /// Parse rate limit info from response headers.
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        let parse = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        };

        Self {
            limit: parse("x-rate-limit-limit"),
            remaining: parse("x-rate-limit-remaining"),
            reset: parse("x-rate-limit-reset").map(u64::from),
        }
    }

    /// Get the duration until rate limit resets.
    #[must_use]
    pub fn time_until_reset(&self) -> Option<Duration> {
        let reset = self.reset?;
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?
            .as_secs();

        if reset > now {
            Some(Duration::from_secs(reset - now))
        } else {
            None
        }
    }
}
