//! Session-scoped audit event streams.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, oneshot, watch};

use super::StreamScope;
use crate::{Error, ErrorKind};
use crate::tracing_support::StreamMetrics;
use crate::transport::proto::{
    AuditRecord, CompleteStream, CreateStream, FlushAndCloseStream, ResumeStream,
    audit_stream_request::Request,
};
use crate::transport::{AuditStreamRequest, InboundStream, StreamTransport, WireStreamStatus};
use crate::types::{AuditEvent, SessionId, StreamStatus};

/// How long [`AuditStream::close`] waits for its flush to reach the transport.
pub const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

struct Outgoing {
    request: AuditStreamRequest,
    ack: oneshot::Sender<Result<(), Error>>,
}

/// Latest-value view of an audit stream's progress.
///
/// A newer status overwrites one that was not read yet.
#[derive(Debug, Clone)]
pub struct StatusReceiver {
    rx: watch::Receiver<Option<StreamStatus>>,
}

impl StatusReceiver {
    /// Returns the most recent status, if any arrived.
    pub fn latest(&self) -> Option<StreamStatus> {
        self.rx.borrow().clone()
    }

    /// Waits for a status newer than the last one seen through this
    /// receiver. Returns `None` once the stream stops receiving.
    pub async fn changed(&mut self) -> Option<StreamStatus> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }
}

/// An open audit stream for one session.
///
/// Requests are sent in the order they are issued, and each call returns
/// once its request was handed to the transport. A failed send closes the
/// stream and is returned from the call that issued it.
///
/// A stream ends with exactly one of two intents: [`complete`](Self::complete)
/// when the session is over, or [`close`](Self::close) to flush and release
/// the stream so it can be resumed later with the upload id from
/// [`status`](Self::status). Dropping the handle closes it without a flush.
///
/// ## Example
///
/// ```rust,ignore
/// let session = SessionId::new();
/// let stream = client.create_audit_stream(&session).await?;
///
/// stream
///     .emit_audit_event(&AuditEvent::new("session.start", "T2000I").with_session_id(&session))
///     .await?;
/// stream.complete().await?;
/// ```
#[derive(Debug)]
pub struct AuditStream {
    scope: StreamScope,
    session_id: SessionId,
    requests: mpsc::Sender<Outgoing>,
    status: watch::Receiver<Option<StreamStatus>>,
    ending: Arc<AtomicBool>,
}

impl std::fmt::Debug for Outgoing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outgoing").finish_non_exhaustive()
    }
}

impl AuditStream {
    /// Opens a stream for a new session.
    pub(crate) async fn create(
        transport: &dyn StreamTransport,
        session_id: &SessionId,
        metrics: StreamMetrics,
    ) -> Result<Self, Error> {
        let open = Request::CreateStream(CreateStream {
            session_id: session_id.to_string(),
        });
        Self::open(transport, session_id, open, metrics).await
    }

    /// Reopens the stream of an interrupted session.
    pub(crate) async fn resume(
        transport: &dyn StreamTransport,
        session_id: &SessionId,
        upload_id: String,
        metrics: StreamMetrics,
    ) -> Result<Self, Error> {
        if upload_id.is_empty() {
            return Err(Error::invalid_argument("resuming an audit stream requires an upload id"));
        }
        let open = Request::ResumeStream(ResumeStream {
            session_id: session_id.to_string(),
            upload_id,
        });
        Self::open(transport, session_id, open, metrics).await
    }

    async fn open(
        transport: &dyn StreamTransport,
        session_id: &SessionId,
        open: Request,
        metrics: StreamMetrics,
    ) -> Result<Self, Error> {
        let resumed = matches!(open, Request::ResumeStream(_));
        let stream = transport.create_audit_stream().await?;

        let scope = StreamScope::with_metrics("audit", metrics);
        scope.metrics().increment_streams_opened();

        let ending = Arc::new(AtomicBool::new(false));
        let (status_tx, status) = watch::channel(None);
        let (requests, pending) = mpsc::channel(1);
        tokio::spawn(forward_requests(scope.clone(), pending, stream.sender));
        tokio::spawn(receive_statuses(
            scope.clone(),
            stream.receiver,
            status_tx,
            Arc::clone(&ending),
        ));

        let audit = Self {
            scope,
            session_id: *session_id,
            requests,
            status,
            ending,
        };
        if let Err(err) = audit.send(open).await {
            audit.scope.close();
            return Err(err);
        }
        tracing::info!(session_id = %session_id, resumed, "opened audit stream");
        Ok(audit)
    }

    /// Returns the session this stream records.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Appends an event to the session.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the event cannot be encoded, or the
    /// send error that closed the stream.
    pub async fn emit_audit_event(&self, event: &AuditEvent) -> Result<(), Error> {
        let record = AuditRecord::try_from(event)?;
        self.send(Request::Event(record)).await?;
        self.scope.metrics().increment_audit_events_emitted();
        Ok(())
    }

    /// Marks the session complete. The stream ends once the control plane
    /// acknowledges; a clean end after this is not an error.
    pub async fn complete(&self) -> Result<(), Error> {
        self.ending.store(true, Ordering::SeqCst);
        self.send(Request::CompleteStream(CompleteStream {})).await
    }

    /// Flushes buffered events and closes the stream.
    ///
    /// The flush is best effort: its error is returned, but the stream is
    /// closed either way and [`error`](Self::error) stays clear. A flush that
    /// is not handed to the transport within [`CLOSE_FLUSH_TIMEOUT`] fails
    /// with [`Timeout`](ErrorKind::Timeout). After
    /// [`complete`](Self::complete) no flush is sent.
    pub async fn close(&self) -> Result<(), Error> {
        if self.scope.is_closed() {
            return Ok(());
        }
        let result = if self.ending.swap(true, Ordering::SeqCst) {
            Ok(())
        } else {
            let flush = self.send(Request::FlushAndCloseStream(FlushAndCloseStream {}));
            match tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, flush).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(session_id = %self.session_id, "audit stream flush timed out");
                    Err(Error::new(ErrorKind::Timeout, "timed out flushing audit stream"))
                }
            }
        };
        self.scope.close();
        result
    }

    /// Returns a receiver of status updates.
    pub fn status(&self) -> StatusReceiver {
        StatusReceiver {
            rx: self.status.clone(),
        }
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

    async fn send(&self, request: Request) -> Result<(), Error> {
        let (ack, acked) = oneshot::channel();
        let outgoing = Outgoing {
            request: AuditStreamRequest {
                request: Some(request),
            },
            ack,
        };
        match self.scope.guard(self.requests.send(outgoing)).await {
            Some(Ok(())) => {}
            Some(Err(_)) | None => return Err(self.scope.closed_error()),
        }
        // The forwarding task acks every request it takes and drops the
        // rest when it exits.
        acked.await.unwrap_or_else(|_| Err(self.scope.closed_error()))
    }
}

impl Drop for AuditStream {
    fn drop(&mut self) {
        self.scope.close();
    }
}

async fn forward_requests(
    scope: StreamScope,
    mut pending: mpsc::Receiver<Outgoing>,
    wire: mpsc::Sender<AuditStreamRequest>,
) {
    while let Some(Some(outgoing)) = scope.guard(pending.recv()).await {
        let result = match scope.guard(wire.send(outgoing.request)).await {
            Some(Ok(())) => Ok(()),
            Some(Err(_)) => {
                let err = Error::stream_closed();
                scope.latch(err.clone());
                Err(err)
            }
            None => Err(scope.closed_error()),
        };
        let failed = result.is_err();
        let _ = outgoing.ack.send(result);
        if failed {
            return;
        }
    }
}

async fn receive_statuses(
    scope: StreamScope,
    mut statuses: InboundStream<WireStreamStatus>,
    latest: watch::Sender<Option<StreamStatus>>,
    ending: Arc<AtomicBool>,
) {
    loop {
        match scope.guard(statuses.next()).await {
            None => return,
            Some(Some(Ok(status))) => {
                scope.metrics().increment_statuses_received();
                latest.send_replace(Some(status.into()));
            }
            Some(Some(Err(err))) => {
                scope.latch(err);
                return;
            }
            Some(None) if ending.load(Ordering::SeqCst) => {
                scope.close();
                return;
            }
            Some(None) => {
                scope.latch(Error::stream_closed());
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use crate::transport::OUTBOUND_BUFFER;
    use chrono::{TimeZone, Utc};

    fn event(index: i64) -> AuditEvent {
        AuditEvent::new("session.print", "T2010I")
            .with_index(index)
            .with_time(Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_create_sends_open_first() {
        let transport = MockTransport::new();
        let session = SessionId::new();
        let stream = AuditStream::create(&transport, &session, StreamMetrics::new())
            .await
            .unwrap();
        let mut peer = transport.accept_audit_stream().await.unwrap();

        let first = peer.recv().await;
        assert!(
            matches!(&first, Some(Request::CreateStream(create)) if create.session_id == session.to_string()),
            "unexpected first request: {:?}",
            first
        );
        assert_eq!(stream.session_id(), &session);
    }

    #[tokio::test]
    async fn test_resume_requires_upload_id() {
        let transport = MockTransport::new();
        let err = AuditStream::resume(&transport, &SessionId::new(), String::new(), StreamMetrics::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(transport.open_count(), 0);
    }

    #[tokio::test]
    async fn test_resume_sends_upload_id() {
        let transport = MockTransport::new();
        let session = SessionId::new();
        let _stream =
            AuditStream::resume(&transport, &session, "upload-7".into(), StreamMetrics::new())
                .await
                .unwrap();
        let mut peer = transport.accept_audit_stream().await.unwrap();
        let first = peer.recv().await;
        assert!(
            matches!(&first, Some(Request::ResumeStream(resume)) if resume.upload_id == "upload-7"),
            "unexpected first request: {:?}",
            first
        );
    }

    #[tokio::test]
    async fn test_send_failure_returned_and_latched() {
        let transport = MockTransport::new();
        let stream = AuditStream::create(&transport, &SessionId::new(), StreamMetrics::new())
            .await
            .unwrap();
        let mut peer = transport.accept_audit_stream().await.unwrap();
        peer.stop_reading();

        let err = stream.emit_audit_event(&event(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StreamClosed);
        assert_eq!(stream.error().unwrap().kind(), ErrorKind::StreamClosed);
        assert!(stream.is_closed());
    }

    #[tokio::test]
    async fn test_open_failure_closes() {
        let transport = MockTransport::new();
        transport.set_failure(Error::connection("refused"));
        let err = AuditStream::create(&transport, &SessionId::new(), StreamMetrics::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_close_flushes_then_cancels() {
        let transport = MockTransport::new();
        let stream = AuditStream::create(&transport, &SessionId::new(), StreamMetrics::new())
            .await
            .unwrap();
        let mut peer = transport.accept_audit_stream().await.unwrap();

        stream.close().await.unwrap();
        assert!(matches!(peer.recv().await, Some(Request::CreateStream(_))));
        assert!(matches!(peer.recv().await, Some(Request::FlushAndCloseStream(_))));
        assert!(stream.is_closed());
        assert!(stream.error().is_none());

        // Closing again is a no-op.
        stream.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_gives_up_on_stalled_peer() {
        let transport = MockTransport::new();
        let stream = AuditStream::create(&transport, &SessionId::new(), StreamMetrics::new())
            .await
            .unwrap();
        // Holds the request channel open without draining it.
        let _peer = transport.accept_audit_stream().await.unwrap();

        // The open request already takes one slot.
        for index in 1..OUTBOUND_BUFFER as i64 {
            stream.emit_audit_event(&event(index)).await.unwrap();
        }

        let err = tokio::time::timeout(CLOSE_FLUSH_TIMEOUT * 2, stream.close())
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(stream.is_closed());
        assert!(stream.error().is_none());
    }

    #[tokio::test]
    async fn test_emit_after_close_is_cancelled() {
        let transport = MockTransport::new();
        let stream = AuditStream::create(&transport, &SessionId::new(), StreamMetrics::new())
            .await
            .unwrap();
        stream.close().await.unwrap();
        let err = stream.emit_audit_event(&event(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_server_end_after_complete_is_graceful() {
        let transport = MockTransport::new();
        let stream = AuditStream::create(&transport, &SessionId::new(), StreamMetrics::new())
            .await
            .unwrap();
        let peer = transport.accept_audit_stream().await.unwrap();

        stream.complete().await.unwrap();
        drop(peer);
        stream.done().await;
        assert!(stream.error().is_none());
    }

    #[tokio::test]
    async fn test_server_end_without_complete_latches() {
        let transport = MockTransport::new();
        let stream = AuditStream::create(&transport, &SessionId::new(), StreamMetrics::new())
            .await
            .unwrap();
        drop(transport.accept_audit_stream().await.unwrap());

        stream.done().await;
        assert_eq!(stream.error().unwrap().kind(), ErrorKind::StreamClosed);
    }

    #[tokio::test]
    async fn test_status_receiver_sees_updates() {
        let transport = MockTransport::new();
        let metrics = StreamMetrics::new();
        let stream = AuditStream::create(&transport, &SessionId::new(), metrics.clone())
            .await
            .unwrap();
        let peer = transport.accept_audit_stream().await.unwrap();
        let mut status = stream.status();
        assert!(status.latest().is_none());

        peer.send_status(WireStreamStatus {
            upload_id: "u-1".into(),
            last_event_index: 4,
        });
        let seen = status.changed().await.unwrap();
        assert_eq!(seen.last_event_index, 4);
        assert_eq!(status.latest().unwrap().upload_id, "u-1");
        assert_eq!(metrics.snapshot().statuses_received, 1);
    }
}
