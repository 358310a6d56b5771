//! Stream sessions.
//!
//! [`open`] turns one request into one [`Subscription`]: a worker task reads
//! the response body through a [`LineDecoder`] and hands records and errors to
//! the consumer over bounded channels until the body ends, a fatal error
//! occurs, or the subscription is closed.

use std::sync::Arc;

use reqwest::Request;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{
    config::StreamConfig,
    decoder::{Frame, LineDecoder},
    error::{StreamError, TwitterError, TwitterResult},
    transport::Transport,
};

/// Lifecycle of a subscription.
///
/// `Connecting` only exists while [`open`] is waiting on the transport; a
/// failed connect never produces a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Connecting,
    Streaming,
    /// Close was requested; the worker is tearing down.
    Draining,
    /// A read or decode failure ended the stream; the worker is tearing down.
    Errored,
    /// Body released and both channels closed.
    Closed,
}

/// Open a streaming connection and start its worker.
///
/// A non-2xx response is read, released, and returned as an error; no worker
/// is started in that case. On success the call returns as soon as the
/// response head has arrived.
pub async fn open<T>(
    transport: &dyn Transport,
    request: Request,
    config: StreamConfig,
) -> TwitterResult<Subscription<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    let url = request.url().clone();
    debug!(url = %url, state = ?SubscriptionState::Connecting, "Opening stream");

    let response = transport.send(request).await?;

    if !response.status.is_success() {
        let status = response.status;
        let headers = response.headers.clone();
        // drops the body on every path
        let body = response
            .collect_body_limited(config.max_line_bytes)
            .await
            .unwrap_or_default();
        warn!(url = %url, status = status.as_u16(), "Stream connect rejected");
        return Err(TwitterError::from_response(status, &headers, &body));
    }

    let (record_tx, record_rx) = mpsc::channel(config.channel_capacity);
    let (error_tx, error_rx) = mpsc::channel(config.error_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (state_tx, state_rx) = watch::channel(SubscriptionState::Streaming);

    let decoder = LineDecoder::new(response.body, config.max_line_bytes);
    let worker = Worker {
        decoder,
        records: record_tx,
        errors: error_tx,
        shutdown: shutdown_rx,
        state: state_tx,
    };

    info!(url = %url, "Stream connected");
    tokio::spawn(worker.run());

    Ok(Subscription {
        records: record_rx,
        errors: error_rx,
        closer: SubscriptionCloser {
            shutdown: Arc::new(shutdown_tx),
            state: state_rx,
        },
    })
}

/// Consumer side of an open stream.
///
/// Drain [`Self::records`] and [`Self::errors`] until both return `None` to
/// observe end of stream. Dropping the subscription (and every
/// [`SubscriptionCloser`] cloned from it) cancels the worker.
#[derive(Debug)]
pub struct Subscription<T> {
    records: mpsc::Receiver<T>,
    errors: mpsc::Receiver<StreamError>,
    closer: SubscriptionCloser,
}

impl<T> Subscription<T> {
    /// Records in wire order.
    pub fn records(&mut self) -> &mut mpsc::Receiver<T> {
        &mut self.records
    }

    /// At most one fatal error, then closed.
    pub fn errors(&mut self) -> &mut mpsc::Receiver<StreamError> {
        &mut self.errors
    }

    /// Receive the next record; `None` once the stream has ended.
    pub async fn next_record(&mut self) -> Option<T> {
        self.records.recv().await
    }

    /// Receive the terminal error, if any; `None` once the stream has ended.
    pub async fn next_error(&mut self) -> Option<StreamError> {
        self.errors.recv().await
    }

    /// A handle that can close this subscription from elsewhere.
    #[must_use]
    pub fn closer(&self) -> SubscriptionCloser {
        self.closer.clone()
    }

    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        self.closer.state()
    }

    /// Cancel the stream and wait until the worker has released the body.
    pub async fn close(&self) {
        self.closer.close().await;
    }

    /// Split into the two receivers and a closer.
    ///
    /// The returned closer keeps the stream alive. Discarding it, as in
    /// `let (records, errors, _) = sub.into_parts();`, cancels the worker
    /// right away; bind it to a named variable for as long as records are
    /// wanted.
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        mpsc::Receiver<T>,
        mpsc::Receiver<StreamError>,
        SubscriptionCloser,
    ) {
        (self.records, self.errors, self.closer)
    }
}

/// Cloneable cancellation handle for a [`Subscription`].
#[derive(Debug, Clone)]
pub struct SubscriptionCloser {
    shutdown: Arc<watch::Sender<bool>>,
    state: watch::Receiver<SubscriptionState>,
}

impl SubscriptionCloser {
    /// Raise the cancellation signal without waiting. Idempotent.
    pub fn cancel(&self) {
        self.shutdown.send_replace(true);
    }

    /// Raise the cancellation signal and wait for the worker to finish.
    ///
    /// Safe to call any number of times, from any number of clones at once.
    pub async fn close(&self) {
        self.cancel();
        let mut state = self.state.clone();
        // Err means the worker is gone, which is just as closed
        let _ = state
            .wait_for(|s| *s == SubscriptionState::Closed)
            .await;
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        *self.state.borrow()
    }
}

/// Resolves once cancellation is raised or every closer is dropped.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|c| *c).await;
}

struct Worker<T> {
    decoder: LineDecoder<T>,
    records: mpsc::Sender<T>,
    errors: mpsc::Sender<StreamError>,
    shutdown: watch::Receiver<bool>,
    state: watch::Sender<SubscriptionState>,
}

impl<T: DeserializeOwned + Send + 'static> Worker<T> {
    async fn run(self) {
        let Self {
            mut decoder,
            records,
            errors,
            mut shutdown,
            state,
        } = self;

        let mut delivered: u64 = 0;

        loop {
            if *shutdown.borrow() {
                state.send_replace(SubscriptionState::Draining);
                break;
            }

            let frame = tokio::select! {
                biased;
                () = cancelled(&mut shutdown) => {
                    state.send_replace(SubscriptionState::Draining);
                    break;
                }
                frame = decoder.next_frame() => frame,
            };

            match frame {
                Some(Ok(Frame::Record(record))) => {
                    // a blocked send is abandoned on cancellation
                    let sent = tokio::select! {
                        biased;
                        () = cancelled(&mut shutdown) => false,
                        res = records.send(record) => res.is_ok(),
                    };
                    if !sent {
                        debug!(delivered, "Record dropped, subscription no longer consumed");
                        state.send_replace(SubscriptionState::Draining);
                        break;
                    }
                    delivered += 1;
                }
                Some(Ok(Frame::KeepAlive)) => {
                    debug!("Received heartbeat");
                }
                Some(Err(e)) => {
                    warn!(error = %e, delivered, "Stream failed");
                    state.send_replace(SubscriptionState::Errored);
                    tokio::select! {
                        biased;
                        () = cancelled(&mut shutdown) => {
                            debug!("Error dropped, subscription already cancelled");
                        }
                        _ = errors.send(e) => {}
                    }
                    break;
                }
                None => {
                    info!(delivered, "Stream ended by remote");
                    break;
                }
            }
        }

        // Sole owner of the body: this is the only place it is closed.
        drop(decoder);
        drop(records);
        drop(errors);

        state.send_replace(SubscriptionState::Closed);
        info!(delivered, "Stream subscription closed");
    }
}
