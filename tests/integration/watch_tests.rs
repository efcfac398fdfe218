//! Watch feed integration tests.

use accessplane::events::{Event, OpType};
use accessplane::testing::init_frame;
use accessplane::transport::WireEvent;
use accessplane::types::ResourceHeader;
use accessplane::{ErrorKind, WatchFilter, WatchKind};

use crate::common::{TestFixture, WAIT, role, user};

fn users_and_roles() -> WatchFilter {
    WatchFilter::new()
        .with_kind(WatchKind::new("user"))
        .with_kind(WatchKind::new("role"))
}

fn five_puts(fixture: &TestFixture) -> Vec<WireEvent> {
    [
        Event::put(user("alice")),
        Event::put(role("auditor")),
        Event::put(user("bob")),
        Event::put(role("dba")),
        Event::put(user("carol")),
    ]
    .into_iter()
    .map(|event| fixture.put_frame(event).unwrap())
    .collect()
}

#[tokio::test]
async fn test_events_delivered_in_order() {
    let fixture = TestFixture::create().await.unwrap();
    let mut watcher = fixture.client.watcher(&users_and_roles()).await.unwrap();
    let peer = fixture.transport.accept_watch().await.unwrap();

    let kinds: Vec<&str> = peer.request().kinds.iter().map(|k| k.kind.as_str()).collect();
    assert_eq!(kinds, ["user", "role"]);

    for frame in five_puts(&fixture) {
        peer.send(frame);
    }

    let mut seen = Vec::new();
    for _ in 0..5 {
        let event = tokio::time::timeout(WAIT, watcher.recv()).await.unwrap().unwrap();
        assert_eq!(event.op, OpType::Put);
        let resource = event.resource.unwrap();
        seen.push(format!("{}/{}", resource.kind(), resource.name()));
    }
    assert_eq!(
        seen,
        ["user/alice", "role/auditor", "user/bob", "role/dba", "user/carol"]
    );
    assert_eq!(fixture.client.metrics().snapshot().events_decoded, 5);
    assert!(watcher.error().is_none());
}

#[tokio::test]
async fn test_close_mid_delivery() {
    let fixture = TestFixture::create().await.unwrap();
    let mut watcher = fixture.client.watcher(&users_and_roles()).await.unwrap();
    let peer = fixture.transport.accept_watch().await.unwrap();

    for frame in five_puts(&fixture) {
        peer.send(frame);
    }
    for expected in ["alice", "auditor"] {
        let event = tokio::time::timeout(WAIT, watcher.recv()).await.unwrap().unwrap();
        assert_eq!(event.resource.unwrap().name(), expected);
    }

    watcher.close();

    // At most the one event already queued is still handed out.
    let mut drained = 0;
    while tokio::time::timeout(WAIT, watcher.recv()).await.unwrap().is_some() {
        drained += 1;
    }
    assert!(drained <= 1, "{} events delivered after close", drained);

    tokio::time::timeout(WAIT, watcher.done()).await.unwrap();
    assert!(watcher.error().is_none());
    tokio::time::timeout(WAIT, peer.closed()).await.unwrap();
}

#[tokio::test]
async fn test_delete_carries_header() {
    let fixture = TestFixture::create().await.unwrap();
    let mut watcher = fixture.client.watcher(&users_and_roles()).await.unwrap();
    let peer = fixture.transport.accept_watch().await.unwrap();

    peer.send(init_frame());
    peer.send(
        fixture
            .put_frame(Event::delete(ResourceHeader::new("user", "v2", "alice")))
            .unwrap(),
    );

    assert_eq!(watcher.recv().await, Some(Event::init()));
    let event = tokio::time::timeout(WAIT, watcher.recv()).await.unwrap().unwrap();
    assert_eq!(event.op, OpType::Delete);
    let resource = event.resource.unwrap();
    assert!(resource.is_header());
    assert_eq!(resource.name(), "alice");
}

#[tokio::test]
async fn test_close_unblocks_pending_recv() {
    let fixture = TestFixture::create().await.unwrap();
    let mut watcher = fixture.client.watcher(&users_and_roles()).await.unwrap();
    let peer = fixture.transport.accept_watch().await.unwrap();

    let pending =
        tokio::time::timeout(std::time::Duration::from_millis(50), watcher.recv()).await;
    assert!(pending.is_err(), "recv returned without a frame");

    watcher.close();
    let next = tokio::time::timeout(WAIT, watcher.recv()).await.unwrap();
    assert_eq!(next, None);
    assert!(watcher.error().is_none());

    tokio::time::timeout(WAIT, peer.closed()).await.unwrap();
}

#[tokio::test]
async fn test_header_only_put_is_flagged() {
    let fixture = TestFixture::create().await.unwrap();
    let mut watcher = fixture.client.watcher(&users_and_roles()).await.unwrap();
    let peer = fixture.transport.accept_watch().await.unwrap();

    peer.send(
        fixture
            .put_frame(Event::put(ResourceHeader::new("role", "v3", "auditor")))
            .unwrap(),
    );

    let event = tokio::time::timeout(WAIT, watcher.recv()).await.unwrap().unwrap();
    assert!(event.is_header_only_put());
    assert_eq!(fixture.client.metrics().snapshot().header_only_puts, 1);
}

#[tokio::test]
async fn test_server_end_is_reported_after_done() {
    let fixture = TestFixture::create().await.unwrap();
    let mut watcher = fixture.client.watcher(&users_and_roles()).await.unwrap();
    let peer = fixture.transport.accept_watch().await.unwrap();

    peer.send(init_frame());
    drop(peer);

    assert_eq!(watcher.recv().await, Some(Event::init()));
    tokio::time::timeout(WAIT, watcher.done()).await.unwrap();
    assert_eq!(watcher.error().unwrap().kind(), ErrorKind::StreamClosed);
    assert_eq!(watcher.recv().await, None);
}
