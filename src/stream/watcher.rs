//! Change-feed watcher.

use futures::StreamExt;
use tokio::sync::mpsc;

use super::StreamScope;
use crate::Error;
use crate::events::{Event, EventCodec};
use crate::transport::{InboundStream, StreamTransport, WatchRequest, WireEvent, proto};

/// Selects one resource kind for a watch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchKind {
    /// Resource kind, e.g. `"user"`.
    pub kind: String,
    /// Restrict to one resource name.
    pub name: Option<String>,
    /// Include secrets in delivered resources.
    pub load_secrets: bool,
    /// Server-side predicate.
    pub predicate: Option<String>,
}

impl WatchKind {
    /// Selects every resource of `kind`.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Restricts the selection to one name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Requests secrets with each resource.
    #[must_use]
    pub fn with_secrets(mut self) -> Self {
        self.load_secrets = true;
        self
    }

    /// Adds a server-side predicate.
    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }
}

impl From<&WatchKind> for proto::WatchKind {
    fn from(kind: &WatchKind) -> Self {
        Self {
            kind: kind.kind.clone(),
            load_secrets: kind.load_secrets,
            name: kind.name.clone().unwrap_or_default(),
            predicate: kind.predicate.clone().unwrap_or_default(),
        }
    }
}

/// The kinds a watch subscribes to.
///
/// ## Example
///
/// ```rust
/// use accessplane::stream::{WatchFilter, WatchKind};
///
/// let filter = WatchFilter::new()
///     .with_kind(WatchKind::new("user"))
///     .with_kind(WatchKind::new("role").with_name("admin"));
/// assert_eq!(filter.kinds.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchFilter {
    /// Kinds to watch.
    pub kinds: Vec<WatchKind>,
}

impl WatchFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a kind.
    #[must_use]
    pub fn with_kind(mut self, kind: WatchKind) -> Self {
        self.kinds.push(kind);
        self
    }

    pub(crate) fn to_request(&self) -> Result<WatchRequest, Error> {
        if self.kinds.is_empty() {
            return Err(Error::invalid_argument("watch filter names no kinds"));
        }
        if let Some(kind) = self.kinds.iter().find(|k| k.kind.is_empty()) {
            return Err(Error::invalid_argument(format!(
                "watch filter entry has an empty kind: {:?}",
                kind
            )));
        }
        Ok(WatchRequest {
            kinds: self.kinds.iter().map(proto::WatchKind::from).collect(),
        })
    }
}

/// A subscription to the control plane's change feed.
///
/// Events arrive in the order the control plane sent them. The receive task
/// reads the next frame only after the previous event has been taken, so at
/// most one decoded event waits in the handle.
///
/// The stream never reconnects. When the feed ends, fails, or delivers a
/// frame that cannot be decoded, the watcher closes and [`error`](Self::error)
/// reports why; a clean end of the feed is reported as
/// [`StreamClosed`](crate::ErrorKind::StreamClosed). Dropping the watcher
/// closes it.
///
/// ## Example
///
/// ```rust,ignore
/// let mut watcher = client
///     .watcher(WatchFilter::new().with_kind(WatchKind::new("user")))
///     .await?;
///
/// while let Some(event) = watcher.recv().await {
///     println!("{} {:?}", event.op, event.resource.map(|r| r.name().to_string()));
/// }
/// if let Some(err) = watcher.error() {
///     eprintln!("watch ended: {}", err);
/// }
/// ```
#[derive(Debug)]
pub struct Watcher {
    scope: StreamScope,
    events: mpsc::Receiver<Event>,
}

impl Watcher {
    pub(crate) async fn open(
        transport: &dyn StreamTransport,
        filter: &WatchFilter,
        codec: EventCodec,
    ) -> Result<Self, Error> {
        let request = filter.to_request()?;
        let kinds: Vec<&str> = filter.kinds.iter().map(|k| k.kind.as_str()).collect();
        let frames = transport.watch_events(request).await?;

        let scope = StreamScope::with_metrics("watch", codec.metrics().clone());
        scope.metrics().increment_streams_opened();
        tracing::info!(?kinds, "opened watch stream");

        let (tx, events) = mpsc::channel(1);
        tokio::spawn(receive_events(scope.clone(), frames, codec, tx));
        Ok(Self { scope, events })
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once the watcher is closed. An event already waiting
    /// when the watcher closes is still delivered.
    pub async fn recv(&mut self) -> Option<Event> {
        tokio::select! {
            biased;
            event = self.events.recv() => event,
            _ = self.scope.done() => self.events.try_recv().ok(),
        }
    }

    /// Waits until the watcher is closed.
    pub async fn done(&self) {
        self.scope.done().await;
    }

    /// Returns the error that terminated the watcher, if any.
    pub fn error(&self) -> Option<Error> {
        self.scope.error()
    }

    /// Returns `true` once the watcher is closed.
    pub fn is_closed(&self) -> bool {
        self.scope.is_closed()
    }

    /// Closes the watcher. Idempotent.
    pub fn close(&self) {
        self.scope.close();
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.scope.close();
    }
}

async fn receive_events(
    scope: StreamScope,
    mut frames: InboundStream<WireEvent>,
    codec: EventCodec,
    tx: mpsc::Sender<Event>,
) {
    loop {
        let Some(permit) = scope.guard(tx.reserve()).await else {
            return;
        };
        let Ok(permit) = permit else {
            scope.close();
            return;
        };

        let Some(frame) = scope.guard(frames.next()).await else {
            return;
        };
        let decoded = match frame {
            Some(Ok(wire)) => codec.decode_event(wire),
            Some(Err(err)) => Err(err),
            None => Err(Error::stream_closed()),
        };
        match decoded {
            Ok(event) => permit.send(event),
            Err(err) => {
                scope.latch(err);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::marshal::CodecRegistry;
    use crate::testing::MockTransport;
    use crate::transport::Operation;
    use std::sync::Arc;

    fn codec() -> EventCodec {
        EventCodec::new(Arc::new(CodecRegistry::with_defaults()))
    }

    fn users() -> WatchFilter {
        WatchFilter::new().with_kind(WatchKind::new("user"))
    }

    fn init_frame() -> WireEvent {
        WireEvent {
            r#type: Operation::Init as i32,
            resource: None,
        }
    }

    #[test]
    fn test_empty_filter_rejected() {
        let err = WatchFilter::new().to_request().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = WatchFilter::new()
            .with_kind(WatchKind::default())
            .to_request()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_filter_to_wire() {
        let request = WatchFilter::new()
            .with_kind(WatchKind::new("role").with_name("admin").with_secrets())
            .to_request()
            .unwrap();
        assert_eq!(request.kinds.len(), 1);
        assert_eq!(request.kinds[0].name, "admin");
        assert!(request.kinds[0].load_secrets);
        assert!(request.kinds[0].predicate.is_empty());
    }

    #[tokio::test]
    async fn test_clean_end_latches_stream_closed() {
        let transport = MockTransport::new();
        let mut watcher = Watcher::open(&transport, &users(), codec()).await.unwrap();
        let peer = transport.accept_watch().await.unwrap();
        assert_eq!(peer.request().kinds[0].kind, "user");

        peer.send(init_frame());
        drop(peer);

        assert_eq!(watcher.recv().await, Some(Event::init()));
        assert_eq!(watcher.recv().await, None);
        watcher.done().await;
        assert_eq!(watcher.error().unwrap().kind(), ErrorKind::StreamClosed);
    }

    #[tokio::test]
    async fn test_decode_failure_latches() {
        let transport = MockTransport::new();
        let mut watcher = Watcher::open(&transport, &users(), codec()).await.unwrap();
        let peer = transport.accept_watch().await.unwrap();

        peer.send(WireEvent {
            r#type: 9,
            resource: None,
        });
        assert_eq!(watcher.recv().await, None);
        assert_eq!(watcher.error().unwrap().kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_transport_error_latches() {
        let transport = MockTransport::new();
        let mut watcher = Watcher::open(&transport, &users(), codec()).await.unwrap();
        transport
            .accept_watch()
            .await
            .unwrap()
            .fail(Error::connection("connection reset"));

        assert_eq!(watcher.recv().await, None);
        assert_eq!(watcher.error().unwrap().kind(), ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_close_is_graceful() {
        let transport = MockTransport::new();
        let mut watcher = Watcher::open(&transport, &users(), codec()).await.unwrap();
        let peer = transport.accept_watch().await.unwrap();

        watcher.close();
        assert_eq!(watcher.recv().await, None);
        assert!(watcher.error().is_none());
        peer.closed().await;
    }

    #[tokio::test]
    async fn test_drop_releases_stream() {
        let transport = MockTransport::new();
        let watcher = Watcher::open(&transport, &users(), codec()).await.unwrap();
        let peer = transport.accept_watch().await.unwrap();

        drop(watcher);
        peer.closed().await;
        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn test_open_failure_is_returned() {
        let transport = MockTransport::new();
        transport.set_failure(Error::connection("refused"));
        let err = Watcher::open(&transport, &users(), codec()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
