//! Prelude module for convenient imports.
//!
//! ```rust
//! use accessplane::prelude::*;
//! ```
//!
//! This provides access to:
//! - The client and its configuration
//! - Error types
//! - Stream handles and watch filters
//! - Events and the resource model

pub use crate::{
    client::{Client, ClientBuilder},
    config::{ConnectionConfig, TlsConfig},
    error::{Error, ErrorKind, Result},
    events::{Event, OpType},
    marshal::{CodecRegistry, MarshalOptions},
    stream::{AuditStream, KeepAliveSender, KeepAliver, WatchFilter, WatchKind, Watcher},
    tracing_support::StreamMetrics,
    types::{
        AccessRequest, AuditEvent, KeepAlive, KeepAliveKind, Metadata, Resource, ResourceHeader,
        ReverseTunnel, Role, SessionId, StreamStatus, TunnelConnection, User, WebSession,
    },
};
