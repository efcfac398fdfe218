//! Client for the control plane's streaming calls.
//!
//! [`Client`] owns the channel and the [`CodecRegistry`], and opens:
//! - [`Watcher`]s over the change feed
//! - [`KeepAliver`]s for lease heartbeats
//! - [`AuditStream`]s for session recordings
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use accessplane::prelude::*;
//!
//! let client = Client::builder()
//!     .url("https://auth.example.com:3025")
//!     .tls_config(tls)
//!     .build()
//!     .await?;
//!
//! let mut watcher = client
//!     .watcher(&WatchFilter::new().with_kind(WatchKind::new("role")))
//!     .await?;
//! while let Some(event) = watcher.recv().await {
//!     // ...
//! }
//! ```

mod builder;
mod inner;

pub use builder::{ClientBuilder, HasUrl, NoUrl};

use std::sync::Arc;

use crate::Error;
use crate::events::EventCodec;
use crate::marshal::{CodecRegistry, MarshalOptions};
use crate::stream::{AuditStream, KeepAliver, WatchFilter, Watcher};
use crate::tracing_support::StreamMetrics;
use crate::transport::{StreamTransport, Transport};
use crate::types::SessionId;

/// The access plane client.
///
/// ## Thread Safety
///
/// `Client` is `Clone` and thread-safe. Clones share the channel, the
/// codec registry and the metrics; each stream is independent.
///
/// ## Example
///
/// ```rust
/// use accessplane::Client;
/// use accessplane::testing::MockTransport;
///
/// # tokio_test::block_on(async {
/// let client = Client::from_transport(MockTransport::shared());
/// assert_eq!(client.registry().kinds().len(), 6);
/// # });
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<inner::ClientInner>,
}

impl Client {
    /// Creates a new client builder.
    ///
    /// The builder uses the typestate pattern to ensure the URL is provided
    /// at compile time.
    pub fn builder() -> ClientBuilder<NoUrl> {
        ClientBuilder::new()
    }

    /// Creates a client over `transport` with default settings.
    ///
    /// Used to plug in alternative transports and in tests.
    pub fn from_transport(transport: Arc<dyn StreamTransport>) -> Self {
        Self::from_inner(inner::ClientInner {
            url: None,
            transport,
            registry: Arc::new(CodecRegistry::with_defaults()),
            metrics: StreamMetrics::new(),
            event_decode_options: MarshalOptions::new().skip_validation(),
        })
    }

    /// Subscribes to the change feed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`](crate::ErrorKind::InvalidArgument) for an
    /// empty filter, or the error that prevented the stream from opening.
    pub async fn watcher(&self, filter: &WatchFilter) -> Result<Watcher, Error> {
        Watcher::open(self.inner.transport.as_ref(), filter, self.event_codec()).await
    }

    /// Opens a heartbeat stream.
    pub async fn keep_aliver(&self) -> Result<KeepAliver, Error> {
        KeepAliver::open(self.inner.transport.as_ref(), self.inner.metrics.clone()).await
    }

    /// Opens an audit stream for a new session.
    ///
    /// Returns once the create request was sent.
    pub async fn create_audit_stream(&self, session_id: &SessionId) -> Result<AuditStream, Error> {
        AuditStream::create(
            self.inner.transport.as_ref(),
            session_id,
            self.inner.metrics.clone(),
        )
        .await
    }

    /// Reopens the audit stream of an interrupted session.
    ///
    /// `upload_id` is the one reported by the interrupted stream's status.
    pub async fn resume_audit_stream(
        &self,
        session_id: &SessionId,
        upload_id: impl Into<String>,
    ) -> Result<AuditStream, Error> {
        AuditStream::resume(
            self.inner.transport.as_ref(),
            session_id,
            upload_id.into(),
            self.inner.metrics.clone(),
        )
        .await
    }

    /// Returns an event codec over this client's registry.
    pub fn event_codec(&self) -> EventCodec {
        EventCodec::new(Arc::clone(&self.inner.registry))
            .with_decode_options(self.inner.event_decode_options.clone())
            .with_metrics(self.inner.metrics.clone())
    }

    /// Returns the codec registry.
    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.inner.registry
    }

    /// Returns the metrics shared by every stream.
    pub fn metrics(&self) -> &StreamMetrics {
        &self.inner.metrics
    }

    /// Returns the control plane URL, if the client was built from one.
    pub fn url(&self) -> Option<&url::Url> {
        self.inner.url.as_ref()
    }

    /// Returns the transport type.
    pub fn transport_type(&self) -> Transport {
        self.inner.transport.transport_type()
    }

    pub(crate) fn from_inner(inner: inner::ClientInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.inner.url.as_ref().map(url::Url::as_str))
            .field("transport", &self.inner.transport.transport_type())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, OpType};
    use crate::stream::WatchKind;
    use crate::testing::MockTransport;
    use crate::transport::proto::audit_stream_request::Request;
    use crate::types::{KeepAlive, User, UserSpec};
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_watcher_decodes_with_client_codec() {
        let transport = MockTransport::shared();
        let client = Client::from_transport(transport.clone());

        let mut watcher = client
            .watcher(&WatchFilter::new().with_kind(WatchKind::new("user")))
            .await
            .unwrap();
        let peer = transport.accept_watch().await.unwrap();

        let frame = client
            .event_codec()
            .encode_event(&Event::put(User::new("alice", UserSpec::default())))
            .unwrap();
        peer.send(frame);

        let event = watcher.recv().await.unwrap();
        assert_eq!(event.op, OpType::Put);
        let resource = event.resource.unwrap();
        assert_eq!(resource.kind(), "user");
        assert_eq!(resource.name(), "alice");
        assert_eq!(client.metrics().snapshot().events_decoded, 1);
        assert_eq!(client.metrics().snapshot().streams_opened, 1);
    }

    #[tokio::test]
    async fn test_watcher_rejects_empty_filter() {
        let transport = MockTransport::shared();
        let client = Client::from_transport(transport.clone());

        let err = client.watcher(&WatchFilter::new()).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        assert_eq!(transport.open_count(), 0);
    }

    #[tokio::test]
    async fn test_keep_aliver_relays_heartbeat() {
        let transport = MockTransport::shared();
        let client = Client::from_transport(transport.clone());

        let keep_aliver = client.keep_aliver().await.unwrap();
        let mut peer = transport.accept_keep_alives().await.unwrap();

        let expires = Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap();
        keep_aliver.send(KeepAlive::new("node-1", expires)).await.unwrap();
        assert_eq!(peer.recv().await.unwrap().name, "node-1");
    }

    #[tokio::test]
    async fn test_audit_streams_open_with_session() {
        let transport = MockTransport::shared();
        let client = Client::from_transport(transport.clone());
        let session = SessionId::new();

        let created = client.create_audit_stream(&session).await.unwrap();
        let mut peer = transport.accept_audit_stream().await.unwrap();
        let first = peer.recv().await;
        assert!(
            matches!(&first, Some(Request::CreateStream(c)) if c.session_id == session.to_string()),
            "unexpected first request: {:?}",
            first
        );
        assert_eq!(created.session_id(), &session);

        let _resumed = client.resume_audit_stream(&session, "upload-1").await.unwrap();
        let mut peer = transport.accept_audit_stream().await.unwrap();
        let first = peer.recv().await;
        assert!(
            matches!(&first, Some(Request::ResumeStream(r)) if r.upload_id == "upload-1"),
            "unexpected first request: {:?}",
            first
        );
    }

    #[test]
    fn test_client_debug_and_clone() {
        let client = Client::from_transport(MockTransport::shared());
        let clone = client.clone();
        assert!(Arc::ptr_eq(client.registry(), clone.registry()));
        assert!(client.url().is_none());

        let debug = format!("{:?}", client);
        assert!(debug.contains("Mock"));
    }
}
