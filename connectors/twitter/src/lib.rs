//! Twitter API v2 client
//!
//! Bearer-token access to the v2 REST endpoints plus long-lived streaming
//! subscriptions on the filtered and sampled tweet streams.
//!
//! ## Streaming
//!
//! A stream connect returns a [`Subscription`] once the response head arrives.
//! A background worker reads the body line by line and publishes:
//! - decoded records on a bounded channel, in arrival order
//! - at most one terminal [`StreamError`] on a separate channel
//!
//! Blank keep-alive lines are skipped. [`SubscriptionCloser::close`] may be
//! called any number of times from any task; it returns once the worker has
//! released the connection. Reconnecting is left to the caller, guided by
//! [`StreamError::is_reconnectable`].

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod decoder;
mod error;
mod session;
mod transport;
mod types;

pub use client::TwitterClient;
pub use config::{RateLimitInfo, StreamConfig, TwitterConfig};
pub use decoder::{Frame, LineDecoder};
pub use error::{StreamError, TwitterError, TwitterResult};
pub use session::{Subscription, SubscriptionCloser, SubscriptionState, open};
pub use transport::{ByteStream, ReqwestTransport, Transport, TransportResponse};
pub use types::{
    Includes, MatchingRule, QueryOptions, ResponseMeta, Retweeted, RulesSummary, StreamRule,
    StreamRulesMeta, StreamRulesResponse, StreamTweet, Tweet, TwitterApiError, TwitterResponse,
    User, VolumeStreamTweet,
};
