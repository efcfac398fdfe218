//! Audit stream integration tests.

use accessplane::testing::status_frame;
use accessplane::transport::proto::audit_stream_request::Request;
use accessplane::types::{AuditEvent, SessionId};
use accessplane::ErrorKind;
use chrono::{TimeZone, Utc};

use crate::common::{TestFixture, WAIT};

fn print_event(index: i64) -> AuditEvent {
    AuditEvent::new("session.print", "T2010I")
        .with_index(index)
        .with_time(Utc.with_ymd_and_hms(2031, 5, 1, 12, 0, 0).unwrap())
        .with_field("bytes", 42)
}

#[tokio::test]
async fn test_create_append_complete() {
    let fixture = TestFixture::create().await.unwrap();
    let session = SessionId::new();

    let stream = fixture.client.create_audit_stream(&session).await.unwrap();
    let mut peer = fixture.transport.accept_audit_stream().await.unwrap();

    stream.emit_audit_event(&print_event(0)).await.unwrap();
    stream.emit_audit_event(&print_event(1)).await.unwrap();
    stream.complete().await.unwrap();

    let mut received = Vec::new();
    for _ in 0..4 {
        received.push(tokio::time::timeout(WAIT, peer.recv()).await.unwrap().unwrap());
    }
    assert!(
        matches!(&received[0], Request::CreateStream(c) if c.session_id == session.to_string()),
        "unexpected open request: {:?}",
        received[0]
    );
    for (slot, index) in [(1, 0), (2, 1)] {
        assert!(
            matches!(&received[slot], Request::Event(record) if record.index == index && record.event_type == "session.print"),
            "unexpected event request: {:?}",
            received[slot]
        );
    }
    assert!(
        matches!(received[3], Request::CompleteStream(_)),
        "unexpected terminal request: {:?}",
        received[3]
    );

    peer.send_status(status_frame("upload-1", 1));
    drop(peer);

    tokio::time::timeout(WAIT, stream.done()).await.unwrap();
    assert!(stream.error().is_none());
    assert_eq!(fixture.client.metrics().snapshot().audit_events_emitted, 2);
}

#[tokio::test]
async fn test_latest_status_wins() {
    let fixture = TestFixture::create().await.unwrap();
    let stream = fixture
        .client
        .create_audit_stream(&SessionId::new())
        .await
        .unwrap();
    let peer = fixture.transport.accept_audit_stream().await.unwrap();
    let mut status = stream.status();

    stream.emit_audit_event(&print_event(1)).await.unwrap();
    stream.emit_audit_event(&print_event(2)).await.unwrap();
    stream.complete().await.unwrap();

    assert!(peer.send_status(status_frame("upload-1", 1)));
    assert!(peer.send_status(status_frame("upload-1", 2)));

    let metrics = fixture.client.metrics().clone();
    tokio::time::timeout(WAIT, async {
        while metrics.snapshot().statuses_received < 2 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    // Both statuses landed before the first read: only the newer one is seen.
    let seen = tokio::time::timeout(WAIT, status.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen.last_event_index, 2);
    assert_eq!(seen.upload_id, "upload-1");

    stream.close().await.unwrap();
    assert!(stream.is_closed());
    assert!(stream.error().is_none());
}

#[tokio::test]
async fn test_close_flushes_without_error() {
    let fixture = TestFixture::create().await.unwrap();
    let stream = fixture
        .client
        .create_audit_stream(&SessionId::new())
        .await
        .unwrap();
    let mut peer = fixture.transport.accept_audit_stream().await.unwrap();

    stream.emit_audit_event(&print_event(0)).await.unwrap();
    stream.close().await.unwrap();

    let _open = peer.recv().await;
    let _event = peer.recv().await;
    let flush = tokio::time::timeout(WAIT, peer.recv()).await.unwrap();
    assert!(
        matches!(flush, Some(Request::FlushAndCloseStream(_))),
        "unexpected request: {:?}",
        flush
    );

    assert!(stream.is_closed());
    assert!(stream.error().is_none());

    let err = stream.emit_audit_event(&print_event(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_resume_after_interruption() {
    let fixture = TestFixture::create().await.unwrap();
    let session = SessionId::new();

    let first = fixture.client.create_audit_stream(&session).await.unwrap();
    let peer = fixture.transport.accept_audit_stream().await.unwrap();
    peer.send_status(status_frame("upload-9", 7));
    let upload_id = tokio::time::timeout(WAIT, first.status().changed())
        .await
        .unwrap()
        .unwrap()
        .upload_id;
    peer.fail(accessplane::Error::connection("connection reset"));

    tokio::time::timeout(WAIT, first.done()).await.unwrap();
    assert_eq!(first.error().unwrap().kind(), ErrorKind::Connection);

    let resumed = fixture
        .client
        .resume_audit_stream(&session, upload_id)
        .await
        .unwrap();
    let mut peer = fixture.transport.accept_audit_stream().await.unwrap();
    let open = tokio::time::timeout(WAIT, peer.recv()).await.unwrap();
    assert!(
        matches!(&open, Some(Request::ResumeStream(r)) if r.upload_id == "upload-9" && r.session_id == session.to_string()),
        "unexpected open request: {:?}",
        open
    );
    assert!(!resumed.is_closed());
}
