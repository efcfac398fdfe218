//! Mock transport implementation for testing.
//!
//! The transport operates entirely in-memory. Every stream a client opens
//! is handed to the test as a peer handle: the test plays the control
//! plane's side of the call by pushing frames, reading what the client
//! sent, finishing the call or failing it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use parking_lot::RwLock;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::{ReceiverStream, UnboundedReceiverStream};

use super::proto::{
    AuditStreamRequest, WatchRequest, WireEvent, WireKeepAlive, WireStreamStatus,
    audit_stream_request::Request,
};
use super::traits::{BidiStream, InboundStream, OUTBOUND_BUFFER, StreamTransport, Transport};
use crate::Error;

/// Mock transport for testing.
///
/// ## Example
///
/// ```rust
/// use accessplane::testing::MockTransport;
/// use accessplane::transport::{StreamTransport, WatchRequest, WireEvent};
///
/// # tokio_test::block_on(async {
/// let transport = MockTransport::new();
/// let _events = transport.watch_events(WatchRequest::default()).await.unwrap();
///
/// let peer = transport.accept_watch().await.unwrap();
/// peer.send(WireEvent::default());
/// # });
/// ```
pub struct MockTransport {
    watches: PeerQueue<WatchPeer>,
    keep_alives: PeerQueue<KeepAlivePeer>,
    audits: PeerQueue<AuditPeer>,
    open_count: AtomicU64,
    simulate_failure: RwLock<Option<Error>>,
}

struct PeerQueue<P> {
    tx: mpsc::UnboundedSender<P>,
    rx: Mutex<mpsc::UnboundedReceiver<P>>,
}

impl<P> PeerQueue<P> {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    fn push(&self, peer: P) {
        // The receiver lives as long as the transport.
        let _ = self.tx.send(peer);
    }

    async fn accept(&self) -> Option<P> {
        self.rx.lock().await.recv().await
    }
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            watches: PeerQueue::new(),
            keep_alives: PeerQueue::new(),
            audits: PeerQueue::new(),
            open_count: AtomicU64::new(0),
            simulate_failure: RwLock::new(None),
        }
    }

    /// Creates a new mock transport behind an `Arc`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Sets a failure to return from the next stream open.
    pub fn set_failure(&self, error: Error) {
        *self.simulate_failure.write() = Some(error);
    }

    /// Clears any simulated failure.
    pub fn clear_failure(&self) {
        *self.simulate_failure.write() = None;
    }

    /// Returns the number of streams opened.
    pub fn open_count(&self) -> u64 {
        self.open_count.load(Ordering::Relaxed)
    }

    /// Waits for the next watch the client opens.
    pub async fn accept_watch(&self) -> Option<WatchPeer> {
        self.watches.accept().await
    }

    /// Waits for the next heartbeat stream the client opens.
    pub async fn accept_keep_alives(&self) -> Option<KeepAlivePeer> {
        self.keep_alives.accept().await
    }

    /// Waits for the next audit stream the client opens.
    pub async fn accept_audit_stream(&self) -> Option<AuditPeer> {
        self.audits.accept().await
    }

    fn open(&self) -> Result<(), Error> {
        let failure = self.simulate_failure.write().take();
        if let Some(error) = failure {
            return Err(error);
        }
        self.open_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("open_count", &self.open_count())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl StreamTransport for MockTransport {
    async fn watch_events(&self, request: WatchRequest) -> Result<InboundStream<WireEvent>, Error> {
        self.open()?;
        let (events, inbound) = mpsc::unbounded_channel();
        self.watches.push(WatchPeer { request, events });
        Ok(UnboundedReceiverStream::new(inbound).boxed())
    }

    async fn send_keep_alives(&self) -> Result<BidiStream<WireKeepAlive, ()>, Error> {
        self.open()?;
        let (sender, received) = mpsc::channel(OUTBOUND_BUFFER);
        let (acks, inbound) = mpsc::unbounded_channel();
        self.keep_alives.push(KeepAlivePeer {
            received: ReceiverStream::new(received),
            acks,
        });
        Ok(BidiStream::new(sender, UnboundedReceiverStream::new(inbound).boxed()))
    }

    async fn create_audit_stream(
        &self,
    ) -> Result<BidiStream<AuditStreamRequest, WireStreamStatus>, Error> {
        self.open()?;
        let (sender, requests) = mpsc::channel(OUTBOUND_BUFFER);
        let (statuses, inbound) = mpsc::unbounded_channel();
        self.audits.push(AuditPeer {
            requests: Some(requests),
            statuses,
        });
        Ok(BidiStream::new(sender, UnboundedReceiverStream::new(inbound).boxed()))
    }

    fn transport_type(&self) -> Transport {
        Transport::Mock
    }
}

/// Server side of a mock watch.
///
/// Dropping the peer ends the stream cleanly.
#[derive(Debug)]
pub struct WatchPeer {
    request: WatchRequest,
    events: mpsc::UnboundedSender<Result<WireEvent, Error>>,
}

impl WatchPeer {
    /// Returns the request the watch was opened with.
    pub fn request(&self) -> &WatchRequest {
        &self.request
    }

    /// Pushes an event frame. Returns `false` once the client is gone.
    pub fn send(&self, event: WireEvent) -> bool {
        self.events.send(Ok(event)).is_ok()
    }

    /// Terminates the stream with an error.
    pub fn fail(self, error: Error) {
        let _ = self.events.send(Err(error));
    }

    /// Returns `true` once the client has dropped the stream.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    /// Waits until the client drops the stream.
    pub async fn closed(&self) {
        self.events.closed().await;
    }
}

/// Server side of a mock heartbeat stream.
#[derive(Debug)]
pub struct KeepAlivePeer {
    received: ReceiverStream<WireKeepAlive>,
    acks: mpsc::UnboundedSender<Result<(), Error>>,
}

impl KeepAlivePeer {
    /// Waits for the next heartbeat; `None` once the client half-closes.
    pub async fn recv(&mut self) -> Option<WireKeepAlive> {
        self.received.next().await
    }

    /// Completes the call with its empty response.
    pub fn finish(self) {
        let _ = self.acks.send(Ok(()));
    }

    /// Terminates the call with an error.
    pub fn fail(self, error: Error) {
        let _ = self.acks.send(Err(error));
    }
}

/// Server side of a mock audit stream.
#[derive(Debug)]
pub struct AuditPeer {
    requests: Option<mpsc::Receiver<AuditStreamRequest>>,
    statuses: mpsc::UnboundedSender<Result<WireStreamStatus, Error>>,
}

impl AuditPeer {
    /// Waits for the next request variant; `None` once the client
    /// half-closes or the peer stopped reading.
    pub async fn recv(&mut self) -> Option<Request> {
        loop {
            let request = self.requests.as_mut()?.recv().await?;
            if let Some(request) = request.request {
                return Some(request);
            }
        }
    }

    /// Pushes a status update.
    pub fn send_status(&self, status: WireStreamStatus) -> bool {
        self.statuses.send(Ok(status)).is_ok()
    }

    /// Stops reading requests, so further client sends fail.
    pub fn stop_reading(&mut self) {
        self.requests = None;
    }

    /// Terminates the stream with an error.
    pub fn fail(self, error: Error) {
        let _ = self.statuses.send(Err(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::transport::proto::{CreateStream, Operation};

    #[tokio::test]
    async fn test_watch_peer_frames_reach_client() {
        let transport = MockTransport::new();
        let mut events = transport
            .watch_events(WatchRequest::default())
            .await
            .unwrap();
        let peer = transport.accept_watch().await.unwrap();

        assert!(peer.send(WireEvent {
            r#type: Operation::Put as i32,
            resource: None,
        }));
        drop(peer);

        let first = events.next().await.unwrap().unwrap();
        assert_eq!(first.r#type, Operation::Put as i32);
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_simulated_failure_applies_once() {
        let transport = MockTransport::new();
        transport.set_failure(Error::connection("refused"));

        let err = transport.send_keep_alives().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(transport.send_keep_alives().await.is_ok());
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test]
    async fn test_audit_peer_stop_reading_fails_sends() {
        let transport = MockTransport::new();
        let bidi = transport.create_audit_stream().await.unwrap();
        let mut peer = transport.accept_audit_stream().await.unwrap();

        bidi.sender
            .send(AuditStreamRequest {
                request: Some(Request::CreateStream(CreateStream {
                    session_id: "s".into(),
                })),
            })
            .await
            .unwrap();
        assert!(matches!(peer.recv().await, Some(Request::CreateStream(_))));

        peer.stop_reading();
        assert!(bidi.sender.send(AuditStreamRequest::default()).await.is_err());
    }

    #[test]
    fn test_transport_type() {
        assert_eq!(MockTransport::new().transport_type(), Transport::Mock);
    }
}
