//! Testing utilities for code built on the access-plane client.
//!
//! [`MockTransport`] replaces the gRPC channel. Every stream the client
//! opens surfaces as a peer handle, and the test plays the control plane:
//!
//! - [`WatchPeer`]: push watch frames, end or fail the feed
//! - [`KeepAlivePeer`]: read heartbeats, finish or fail the call
//! - [`AuditPeer`]: read audit requests, report status, fail the call
//!
//! ## Quick Start
//!
//! ```rust
//! use accessplane::Client;
//! use accessplane::stream::{WatchFilter, WatchKind};
//! use accessplane::testing::{MockTransport, init_frame};
//!
//! # tokio_test::block_on(async {
//! let transport = MockTransport::shared();
//! let client = Client::from_transport(transport.clone());
//!
//! let mut watcher = client
//!     .watcher(&WatchFilter::new().with_kind(WatchKind::new("role")))
//!     .await
//!     .unwrap();
//! let peer = transport.accept_watch().await.unwrap();
//! peer.send(init_frame());
//!
//! assert!(watcher.recv().await.is_some());
//! # });
//! ```

use crate::transport::{Operation, WireEvent, WireStreamStatus};

pub use crate::transport::{AuditPeer, KeepAlivePeer, MockTransport, WatchPeer};

/// Returns the frame a control plane sends once a watch is established.
pub fn init_frame() -> WireEvent {
    WireEvent {
        r#type: Operation::Init as i32,
        resource: None,
    }
}

/// Returns a status frame acknowledging events up to `last_event_index`.
pub fn status_frame(upload_id: impl Into<String>, last_event_index: i64) -> WireStreamStatus {
    WireStreamStatus {
        upload_id: upload_id.into(),
        last_event_index,
    }
}
