//! HTTP transport boundary.
//!
//! The streaming session only needs "send this request, give me the status and
//! a body I can read incrementally". [`ReqwestTransport`] is the production
//! implementation; tests plug in scripted ones.

use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use reqwest::{Client, Request, StatusCode, header::HeaderMap};
use tracing::debug;

use crate::error::TwitterResult;

/// An incrementally readable response body.
///
/// Dropping it closes the underlying connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Status line plus open body of a response.
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl TransportResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: ByteStream) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Read the remainder of the body into memory and close it.
    pub async fn collect_body(self) -> io::Result<Vec<u8>> {
        self.collect_body_limited(usize::MAX).await
    }

    /// Read at most `limit` bytes of the body, then close it.
    ///
    /// Stops as soon as the limit is reached, so a body that never ends
    /// cannot stall the caller.
    pub async fn collect_body_limited(self, limit: usize) -> io::Result<Vec<u8>> {
        let mut body = self.body;
        let mut out = Vec::new();
        while out.len() < limit {
            let Some(chunk) = body.next().await else {
                break;
            };
            let chunk = chunk?;
            let take = chunk.len().min(limit - out.len());
            out.extend_from_slice(&chunk[..take]);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Something that can execute a fully built request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return as soon as the response head is available.
    async fn send(&self, request: Request) -> TwitterResult<TransportResponse>;
}

/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> TwitterResult<TransportResponse> {
        debug!(method = %request.method(), url = %request.url(), "Sending stream request");

        let response = self.client.execute(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(io::Error::other));

        Ok(TransportResponse::new(status, Box::pin(body)).with_headers(headers))
    }
}
