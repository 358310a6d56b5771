//! Twitter-specific error types.

use std::time::Duration;

use reqwest::{StatusCode, header::HeaderMap};
use serde::Deserialize;
use thiserror::Error;

use crate::{config::RateLimitInfo, types::TwitterApiError};

/// Errors returned synchronously by client calls and by [`crate::open`].
#[derive(Error, Debug)]
pub enum TwitterError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport failed before a response was available
    #[error("Transport error: {0}")]
    Transport(String),

    /// Twitter API returned an error
    #[error("Twitter API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        title: Option<String>,
        error_type: Option<String>,
        errors: Vec<TwitterApiError>,
    },

    /// Rate limited
    #[error("Rate limited, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    /// Stream error
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required argument was missing or empty
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl TwitterError {
    /// Check if this error is retryable.
    ///
    /// The client never retries on its own; this only classifies the fault
    /// for callers that implement their own policy.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Transport(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::Stream(e) => e.is_reconnectable(),
            _ => false,
        }
    }

    /// Get the suggested retry delay.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(Duration::from_secs(*retry_after)),
            _ => None,
        }
    }

    /// Build the error for a non-2xx response from its status, headers and body.
    ///
    /// Twitter answers with either a top-level problem (`title`, `detail`,
    /// `type`) or an `errors` array; both shapes are accepted. A body that is
    /// not JSON at all becomes the message verbatim.
    pub(crate) fn from_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = RateLimitInfo::from_headers(headers)
                .time_until_reset()
                .map_or(60, |d| d.as_secs());
            return Self::RateLimited { retry_after };
        }

        #[derive(Deserialize)]
        struct ErrorBody {
            #[serde(default)]
            title: Option<String>,
            #[serde(default)]
            detail: Option<String>,
            #[serde(default, rename = "type")]
            error_type: Option<String>,
            #[serde(default)]
            errors: Vec<TwitterApiError>,
        }

        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) => {
                let first = parsed.errors.first();
                let message = parsed
                    .detail
                    .clone()
                    .or_else(|| first.and_then(|e| e.detail.clone()))
                    .or_else(|| parsed.title.clone())
                    .or_else(|| first.and_then(|e| e.title.clone()))
                    .unwrap_or_else(|| status.to_string());

                Self::Api {
                    status: status.as_u16(),
                    message,
                    title: parsed.title.or_else(|| first.and_then(|e| e.title.clone())),
                    error_type: parsed
                        .error_type
                        .or_else(|| first.and_then(|e| e.error_type.clone())),
                    errors: parsed.errors,
                }
            }
            Err(_) => {
                let text = String::from_utf8_lossy(body).trim().to_string();
                Self::Api {
                    status: status.as_u16(),
                    message: if text.is_empty() { status.to_string() } else { text },
                    title: None,
                    error_type: None,
                    errors: Vec::new(),
                }
            }
        }
    }

    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TwitterError {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Faults that end a running subscription.
///
/// These are delivered on the subscription's error channel, never returned
/// from [`crate::open`].
#[derive(Error, Debug)]
pub enum StreamError {
    /// The connection dropped or could not be read.
    #[error("stream read failed: {0}")]
    Read(#[source] std::io::Error),

    /// A line could not be decoded as a record.
    #[error("stream decode failed: {source} (line: {line})")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// A single line grew past the configured limit without a newline.
    #[error("stream line of {size} bytes exceeds limit of {limit}")]
    LineTooLong { size: usize, limit: usize },
}

impl StreamError {
    /// Whether the caller may reasonably open a new subscription.
    ///
    /// `Read` means the connection ended; the record stream itself was
    /// intact. `Decode` and `LineTooLong` mean the payload was corrupt.
    #[must_use]
    pub const fn is_reconnectable(&self) -> bool {
        matches!(self, Self::Read(_))
    }
}

/// Result type for Twitter operations.
pub type TwitterResult<T> = Result<T, TwitterError>;
