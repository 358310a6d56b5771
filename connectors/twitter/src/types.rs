//! Twitter API v2 types.
//!
//! Resource objects keep the handful of fields the client itself reads and
//! carry everything else through `extra` untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Core Response Wrapper
// ─────────────────────────────────────────────────────────────────────────────

/// Standard Twitter API v2 response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterResponse<T> {
    /// The primary data
    pub data: Option<T>,

    /// Included expansions (users, tweets, media, etc.)
    #[serde(default)]
    pub includes: Option<Includes>,

    /// Metadata about the response
    #[serde(default)]
    pub meta: Option<ResponseMeta>,

    /// Errors (partial failures)
    #[serde(default)]
    pub errors: Option<Vec<TwitterApiError>>,
}

/// Included expansions in Twitter API responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Includes {
    /// Expanded user objects
    #[serde(default)]
    pub users: Vec<User>,

    /// Expanded tweet objects
    #[serde(default)]
    pub tweets: Vec<Tweet>,

    /// Expanded media objects
    #[serde(default)]
    pub media: Vec<Value>,

    /// Expanded place objects
    #[serde(default)]
    pub places: Vec<Value>,

    /// Expanded poll objects
    #[serde(default)]
    pub polls: Vec<Value>,
}

/// Response metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub result_count: Option<u32>,

    /// Token for next page
    #[serde(default)]
    pub next_token: Option<String>,

    /// Token for previous page
    #[serde(default)]
    pub previous_token: Option<String>,

    #[serde(default)]
    pub newest_id: Option<String>,

    #[serde(default)]
    pub oldest_id: Option<String>,
}

/// Twitter API error object.
///
/// Appears both in `errors[]` of partially failed responses and in the body
/// of rejected requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwitterApiError {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub detail: Option<String>,

    /// Problem type URI
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,

    #[serde(default)]
    pub reason: Option<String>,

    /// Resource type (e.g., "tweet", "user")
    #[serde(default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub resource_id: Option<String>,

    /// Parameter that caused the error
    #[serde(default)]
    pub parameter: Option<String>,

    #[serde(default)]
    pub value: Option<String>,

    /// Set when the app is not enrolled for the endpoint
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub required_enrollment: Option<String>,

    #[serde(default)]
    pub registration_url: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Resources
// ─────────────────────────────────────────────────────────────────────────────

/// Twitter tweet object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,

    #[serde(default)]
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,

    /// Creation timestamp (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Language of the tweet (BCP47)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    /// Requested fields this client does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Twitter user object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Handle without @
    #[serde(default)]
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of a retweet or undo-retweet call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retweeted {
    pub retweeted: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream Types
// ─────────────────────────────────────────────────────────────────────────────

/// Filtered stream rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRule {
    /// Assigned by the server; absent when adding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Rule value (query)
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl StreamRule {
    /// A new rule to add.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: None,
            value: value.into(),
            tag: None,
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Stream rules response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRulesResponse {
    #[serde(default)]
    pub data: Option<Vec<StreamRule>>,

    #[serde(default)]
    pub meta: Option<StreamRulesMeta>,

    #[serde(default)]
    pub errors: Option<Vec<TwitterApiError>>,
}

/// Stream rules metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRulesMeta {
    /// Timestamp
    pub sent: String,

    /// Summary of changes, only on add/delete
    #[serde(default)]
    pub summary: Option<RulesSummary>,
}

/// Rules change summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesSummary {
    #[serde(default)]
    pub created: Option<u32>,

    #[serde(default)]
    pub not_created: Option<u32>,

    #[serde(default)]
    pub deleted: Option<u32>,

    #[serde(default)]
    pub not_deleted: Option<u32>,

    #[serde(default)]
    pub valid: Option<u32>,

    #[serde(default)]
    pub invalid: Option<u32>,
}

/// One record from the filtered stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamTweet {
    pub data: Tweet,

    #[serde(default)]
    pub includes: Option<Includes>,

    /// Rules that caused this tweet to be delivered
    #[serde(default)]
    pub matching_rules: Vec<MatchingRule>,
}

/// Matching rule for stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingRule {
    pub id: String,

    #[serde(default)]
    pub tag: Option<String>,
}

/// One record from the sampled (volume) stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeStreamTweet {
    #[serde(default)]
    pub data: Option<Tweet>,

    #[serde(default)]
    pub includes: Option<Includes>,

    /// Operational messages the platform interleaves with tweets
    #[serde(default)]
    pub errors: Vec<TwitterApiError>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

/// Optional query parameters shared by lookup, timeline, and stream endpoints.
///
/// Empty lists and unset values are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub expansions: Vec<String>,
    pub tweet_fields: Vec<String>,
    pub user_fields: Vec<String>,
    pub media_fields: Vec<String>,
    pub place_fields: Vec<String>,
    pub poll_fields: Vec<String>,

    /// Page size (the API accepts 5–100 or 1–1000 depending on endpoint)
    pub max_results: Option<u32>,

    pub pagination_token: Option<String>,
    pub since_id: Option<String>,
    pub until_id: Option<String>,

    /// ISO 8601
    pub start_time: Option<String>,
    pub end_time: Option<String>,

    /// Stream endpoints only: replay up to five minutes missed while disconnected
    pub backfill_minutes: Option<u32>,
}

impl QueryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn expansions<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expansions = values.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn tweet_fields<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tweet_fields = values.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn user_fields<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_fields = values.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    #[must_use]
    pub fn pagination_token(mut self, token: impl Into<String>) -> Self {
        self.pagination_token = Some(token.into());
        self
    }

    #[must_use]
    pub const fn backfill_minutes(mut self, minutes: u32) -> Self {
        self.backfill_minutes = Some(minutes);
        self
    }

    /// Render as query pairs.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        let lists = [
            ("expansions", &self.expansions),
            ("tweet.fields", &self.tweet_fields),
            ("user.fields", &self.user_fields),
            ("media.fields", &self.media_fields),
            ("place.fields", &self.place_fields),
            ("poll.fields", &self.poll_fields),
        ];
        for (key, values) in lists {
            if !values.is_empty() {
                params.push((key.to_string(), values.join(",")));
            }
        }

        if let Some(max_results) = self.max_results {
            params.push(("max_results".to_string(), max_results.to_string()));
        }

        let scalars = [
            ("pagination_token", &self.pagination_token),
            ("since_id", &self.since_id),
            ("until_id", &self.until_id),
            ("start_time", &self.start_time),
            ("end_time", &self.end_time),
        ];
        for (key, value) in scalars {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                params.push((key.to_string(), value.to_string()));
            }
        }

        if let Some(minutes) = self.backfill_minutes {
            params.push(("backfill_minutes".to_string(), minutes.to_string()));
        }

        params
    }
}
