//! Keep-alive integration tests.

use accessplane::transport::KeepAliveType;
use accessplane::types::{KeepAlive, KeepAliveKind};
use accessplane::ErrorKind;
use chrono::{TimeZone, Utc};

use crate::common::{TestFixture, WAIT};

fn lease(name: &str) -> KeepAlive {
    KeepAlive::new(name, Utc.with_ymd_and_hms(2031, 5, 1, 12, 0, 0).unwrap())
}

#[tokio::test]
async fn test_heartbeats_from_many_senders() {
    let fixture = TestFixture::create().await.unwrap();
    let keep_aliver = fixture.client.keep_aliver().await.unwrap();
    let mut peer = fixture.transport.accept_keep_alives().await.unwrap();

    let mut tasks = Vec::new();
    for name in ["node-1", "node-2", "node-3"] {
        let sender = keep_aliver.sender();
        tasks.push(tokio::spawn(async move {
            sender.send(lease(name).with_kind(KeepAliveKind::App)).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let mut names = Vec::new();
    for _ in 0..3 {
        let received = tokio::time::timeout(WAIT, peer.recv()).await.unwrap().unwrap();
        assert_eq!(received.r#type, KeepAliveType::App as i32);
        names.push(received.name);
    }
    names.sort();
    assert_eq!(names, ["node-1", "node-2", "node-3"]);
    assert_eq!(fixture.client.metrics().snapshot().keep_alives_sent, 3);
}

#[tokio::test]
async fn test_send_after_close_does_not_block() {
    let fixture = TestFixture::create().await.unwrap();
    let keep_aliver = fixture.client.keep_aliver().await.unwrap();
    let _peer = fixture.transport.accept_keep_alives().await.unwrap();
    let sender = keep_aliver.sender();

    keep_aliver.close();
    for _ in 0..3 {
        let result = tokio::time::timeout(WAIT, sender.send(lease("node-1")))
            .await
            .unwrap();
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Cancelled);
    }
    assert!(sender.is_closed());
    assert!(keep_aliver.error().is_none());
}

#[tokio::test]
async fn test_server_failure_reaches_senders() {
    let fixture = TestFixture::create().await.unwrap();
    let keep_aliver = fixture.client.keep_aliver().await.unwrap();
    let peer = fixture.transport.accept_keep_alives().await.unwrap();
    let sender = keep_aliver.sender();

    peer.fail(accessplane::Error::connection("lease service unavailable"));
    tokio::time::timeout(WAIT, keep_aliver.done()).await.unwrap();

    let err = tokio::time::timeout(WAIT, sender.send(lease("node-1")))
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(fixture.client.metrics().snapshot().stream_failures, 1);
}
