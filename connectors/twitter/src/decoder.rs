//! Newline-delimited JSON decoding for stream bodies.
//!
//! The platform writes one JSON object per line and sends blank lines as
//! heartbeats. Chunk boundaries from the transport do not line up with record
//! boundaries, so bytes are buffered until a full line is available.

use std::marker::PhantomData;

use bytes::BytesMut;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::{error::StreamError, transport::ByteStream};

/// One decoded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame<T> {
    /// A record to hand to the consumer.
    Record(T),

    /// Blank heartbeat line.
    KeepAlive,
}

/// Pulls lines off a response body and decodes them as `T`.
pub struct LineDecoder<T> {
    body: ByteStream,
    buffer: BytesMut,
    /// Prefix of `buffer` already searched for a newline.
    scanned: usize,
    max_line_bytes: usize,
    eof: bool,
    failed: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> LineDecoder<T> {
    /// Wrap an open body. Lines longer than `max_line_bytes`, excluding the
    /// newline, are rejected whether or not they are terminated.
    #[must_use]
    pub fn new(body: ByteStream, max_line_bytes: usize) -> Self {
        Self {
            body,
            buffer: BytesMut::with_capacity(8192),
            scanned: 0,
            max_line_bytes,
            eof: false,
            failed: false,
            _record: PhantomData,
        }
    }

    /// Next frame, or `None` once the body is exhausted.
    ///
    /// After an error is returned every later call returns `None`: a corrupt
    /// stream cannot be resynchronized.
    ///
    /// Cancel safe: dropping the future loses no buffered bytes.
    pub async fn next_frame(&mut self) -> Option<Result<Frame<T>, StreamError>> {
        if self.failed {
            return None;
        }

        loop {
            let newline = self.buffer[self.scanned..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|offset| self.scanned + offset);

            if let Some(pos) = newline {
                self.scanned = 0;
                if pos > self.max_line_bytes {
                    return Some(Err(self.line_too_long(pos)));
                }
                let line = self.buffer.split_to(pos + 1);
                return Some(self.decode_line(&line[..pos]));
            }
            self.scanned = self.buffer.len();

            if self.buffer.len() > self.max_line_bytes {
                return Some(Err(self.line_too_long(self.buffer.len())));
            }

            if self.eof {
                if self.buffer.is_empty() {
                    return None;
                }
                // final line without a terminator
                self.scanned = 0;
                let line = self.buffer.split();
                return Some(self.decode_line(&line));
            }

            match self.body.next().await {
                Some(Ok(chunk)) => {
                    trace!(bytes = chunk.len(), "Received stream chunk");
                    self.buffer.extend_from_slice(&chunk);
                }
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(StreamError::Read(e)));
                }
                None => {
                    debug!("Stream body reached EOF");
                    self.eof = true;
                }
            }
        }
    }

    fn line_too_long(&mut self, size: usize) -> StreamError {
        self.failed = true;
        StreamError::LineTooLong {
            size,
            limit: self.max_line_bytes,
        }
    }

    fn decode_line(&mut self, line: &[u8]) -> Result<Frame<T>, StreamError> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(Frame::KeepAlive);
        }

        serde_json::from_slice(line).map(Frame::Record).map_err(|source| {
            self.failed = true;
            StreamError::Decode {
                line: String::from_utf8_lossy(line).trim_end().to_string(),
                source,
            }
        })
    }
}

impl<T> std::fmt::Debug for LineDecoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineDecoder")
            .field("buffered", &self.buffer.len())
            .field("scanned", &self.scanned)
            .field("max_line_bytes", &self.max_line_bytes)
            .field("eof", &self.eof)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}
