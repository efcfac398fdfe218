//! Lease heartbeats.

use futures::StreamExt;
use tokio::sync::mpsc;

use super::StreamScope;
use crate::Error;
use crate::tracing_support::StreamMetrics;
use crate::transport::{InboundStream, StreamTransport, WireKeepAlive};
use crate::types::KeepAlive;

/// Cloneable send side of a [`KeepAliver`].
#[derive(Debug, Clone)]
pub struct KeepAliveSender {
    scope: StreamScope,
    queue: mpsc::Sender<KeepAlive>,
}

impl KeepAliveSender {
    /// Queues a heartbeat.
    ///
    /// Waits until the forwarding task accepts the heartbeat, or the stream
    /// closes. Never blocks on a closed stream.
    ///
    /// # Errors
    ///
    /// Returns the latched error, or [`Cancelled`](crate::ErrorKind::Cancelled)
    /// after a graceful close.
    pub async fn send(&self, keep_alive: KeepAlive) -> Result<(), Error> {
        match self.scope.guard(self.queue.send(keep_alive)).await {
            Some(Ok(())) => Ok(()),
            Some(Err(_)) | None => Err(self.scope.closed_error()),
        }
    }

    /// Returns `true` once the stream is closed.
    pub fn is_closed(&self) -> bool {
        self.scope.is_closed()
    }
}

/// A heartbeat stream keeping server leases alive.
///
/// Heartbeats are relayed to the control plane in the order they were
/// queued. Any send or receive failure closes the stream and is reported by
/// [`error`](Self::error). Dropping the keep-aliver closes it, and every
/// [`KeepAliveSender`] cloned from it starts failing.
///
/// ## Example
///
/// ```rust,ignore
/// let keep_aliver = client.keep_aliver().await?;
/// let sender = keep_aliver.sender();
///
/// sender
///     .send(KeepAlive::new("node-1", Utc::now() + Duration::minutes(10)))
///     .await?;
/// ```
#[derive(Debug)]
pub struct KeepAliver {
    scope: StreamScope,
    sender: KeepAliveSender,
}

impl KeepAliver {
    pub(crate) async fn open(
        transport: &dyn StreamTransport,
        metrics: StreamMetrics,
    ) -> Result<Self, Error> {
        let stream = transport.send_keep_alives().await?;

        let scope = StreamScope::with_metrics("keep_alive", metrics);
        scope.metrics().increment_streams_opened();
        tracing::info!("opened keep-alive stream");

        let (queue, pending) = mpsc::channel(1);
        tokio::spawn(forward_keep_alives(scope.clone(), pending, stream.sender));
        tokio::spawn(receive_acks(scope.clone(), stream.receiver));

        Ok(Self {
            sender: KeepAliveSender {
                scope: scope.clone(),
                queue,
            },
            scope,
        })
    }

    /// Returns a cloneable send handle.
    pub fn sender(&self) -> KeepAliveSender {
        self.sender.clone()
    }

    /// Queues a heartbeat; see [`KeepAliveSender::send`].
    pub async fn send(&self, keep_alive: KeepAlive) -> Result<(), Error> {
        self.sender.send(keep_alive).await
    }

    /// Waits until the stream is closed.
    pub async fn done(&self) {
        self.scope.done().await;
    }

    /// Returns the error that terminated the stream, if any.
    pub fn error(&self) -> Option<Error> {
        self.scope.error()
    }

    /// Returns `true` once the stream is closed.
    pub fn is_closed(&self) -> bool {
        self.scope.is_closed()
    }

    /// Closes the stream. Idempotent.
    pub fn close(&self) {
        self.scope.close();
    }
}

impl Drop for KeepAliver {
    fn drop(&mut self) {
        self.scope.close();
    }
}

async fn forward_keep_alives(
    scope: StreamScope,
    mut pending: mpsc::Receiver<KeepAlive>,
    wire: mpsc::Sender<WireKeepAlive>,
) {
    while let Some(Some(keep_alive)) = scope.guard(pending.recv()).await {
        let message = WireKeepAlive::from(&keep_alive);
        match scope.guard(wire.send(message)).await {
            Some(Ok(())) => scope.metrics().increment_keep_alives_sent(),
            Some(Err(_)) => {
                scope.latch(Error::stream_closed());
                return;
            }
            None => return,
        }
    }
}

async fn receive_acks(scope: StreamScope, mut acks: InboundStream<()>) {
    match scope.guard(acks.next()).await {
        Some(Some(Err(err))) => scope.latch(err),
        Some(_) => scope.latch(Error::stream_closed()),
        None => {}
    }
}
