//! Transport trait definitions and common types.
//!
//! This module defines the upstream stream surface the client's stream
//! wrappers are built on.

use futures::stream::BoxStream;
use tokio::sync::mpsc;

use super::proto::{
    AuditStreamRequest, WatchRequest, WireEvent, WireKeepAlive, WireStreamStatus,
};
use crate::Error;

/// Buffer of the outbound leg of a bidirectional stream.
pub const OUTBOUND_BUFFER: usize = 16;

// ============================================================================
// Transport Enum
// ============================================================================

/// Available transport implementations.
///
/// ## Example
///
/// ```rust
/// use accessplane::Transport;
///
/// let transport = Transport::Grpc;
/// assert!(transport.is_grpc());
/// assert_eq!(transport.to_string(), "gRPC");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// gRPC over HTTP/2 (default).
    #[default]
    Grpc,
    /// In-memory mock, for testing.
    Mock,
}

impl Transport {
    /// Returns `true` if this is gRPC transport.
    pub fn is_grpc(&self) -> bool {
        matches!(self, Transport::Grpc)
    }

    /// Returns `true` if this is mock transport.
    pub fn is_mock(&self) -> bool {
        matches!(self, Transport::Mock)
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Grpc => write!(f, "gRPC"),
            Transport::Mock => write!(f, "Mock"),
        }
    }
}

// ============================================================================
// Streams
// ============================================================================

/// Inbound leg of a stream: messages until the peer finishes or fails.
pub type InboundStream<T> = BoxStream<'static, Result<T, Error>>;

/// Both legs of a bidirectional stream.
///
/// Dropping `sender` half-closes the outbound leg. A send fails once the
/// transport has stopped consuming the outbound leg.
pub struct BidiStream<S, R> {
    /// Outbound leg.
    pub sender: mpsc::Sender<S>,
    /// Inbound leg.
    pub receiver: InboundStream<R>,
}

impl<S, R> BidiStream<S, R> {
    /// Creates a bidirectional stream from its legs.
    pub fn new(sender: mpsc::Sender<S>, receiver: InboundStream<R>) -> Self {
        Self { sender, receiver }
    }
}

impl<S, R> std::fmt::Debug for BidiStream<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BidiStream")
            .field("sender_closed", &self.sender.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// The streaming calls of the control plane's auth service.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    /// Opens a server-streaming watch.
    async fn watch_events(&self, request: WatchRequest) -> Result<InboundStream<WireEvent>, Error>;

    /// Opens a heartbeat stream. The inbound leg yields one empty ack when
    /// the server closes the call.
    async fn send_keep_alives(&self) -> Result<BidiStream<WireKeepAlive, ()>, Error>;

    /// Opens an audit stream.
    async fn create_audit_stream(
        &self,
    ) -> Result<BidiStream<AuditStreamRequest, WireStreamStatus>, Error>;

    /// Returns the transport type.
    fn transport_type(&self) -> Transport;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_transport_default() {
        assert_eq!(Transport::default(), Transport::Grpc);
    }

    #[test]
    fn test_transport_checks() {
        assert!(Transport::Grpc.is_grpc());
        assert!(!Transport::Grpc.is_mock());
        assert!(Transport::Mock.is_mock());
    }

    #[test]
    fn test_transport_display() {
        assert_eq!(Transport::Grpc.to_string(), "gRPC");
        assert_eq!(Transport::Mock.to_string(), "Mock");
    }

    #[tokio::test]
    async fn test_bidi_send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel::<u32>(OUTBOUND_BUFFER);
        let bidi: BidiStream<u32, ()> = BidiStream::new(tx, futures::stream::empty().boxed());
        drop(rx);
        assert!(bidi.sender.send(1).await.is_err());
        assert!(format!("{:?}", bidi).contains("sender_closed: true"));
    }
}
