//! Transport layer for the control plane's streaming calls.
//!
//! This module provides the underlying transport implementations:
//!
//! - gRPC transport (via tonic) - default
//! - Mock transport - for testing without network
//!
//! Users normally interact with the higher-level [`Client`](crate::Client);
//! the [`StreamTransport`] trait is public so alternative transports can be
//! plugged in through [`Client::from_transport`](crate::Client::from_transport).
//!
//! ## Feature Flags
//!
//! - `grpc` (default): Enable gRPC transport
//!
//! ## Wire messages
//!
//! Resource payloads inside [`WireEvent`] are marshaled JSON documents;
//! see [`marshal`](crate::marshal).

pub(crate) mod convert;
pub mod proto;
pub(crate) mod traits;

#[cfg(feature = "grpc")]
pub(crate) mod grpc;

pub(crate) mod mock;

pub use proto::{
    AuditRecord, AuditStreamRequest, KeepAliveType, Operation, WatchKind, WatchRequest, WireEvent,
    WireKeepAlive, WireStreamStatus,
};
pub use traits::{BidiStream, InboundStream, OUTBOUND_BUFFER, StreamTransport, Transport};

#[cfg(feature = "grpc")]
pub use grpc::GrpcTransport;

pub use mock::{AuditPeer, KeepAlivePeer, MockTransport, WatchPeer};
