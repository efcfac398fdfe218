//! # accessplane
//!
//! Streaming client core for an access-control plane.
//!
//! The control plane publishes cluster state (users, roles, sessions,
//! tunnels, access requests) and collects audit events. This crate
//! provides the three long-lived streams components keep open against it,
//! and the versioned resource model their payloads are decoded into.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use accessplane::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .url("https://auth.example.com:3025")
//!         .tls_config(
//!             TlsConfig::builder()
//!                 .ca_cert_file("ca.pem")
//!                 .client_cert_file("node.pem")
//!                 .client_key_file("node-key.pem")
//!                 .build(),
//!         )
//!         .build()
//!         .await?;
//!
//!     // Follow role changes
//!     let mut watcher = client
//!         .watcher(&WatchFilter::new().with_kind(WatchKind::new("role")))
//!         .await?;
//!     while let Some(event) = watcher.recv().await {
//!         println!("{} {:?}", event.op, event.resource.map(|r| r.name().to_string()));
//!     }
//!
//!     watcher.done().await;
//!     if let Some(err) = watcher.error() {
//!         eprintln!("watch failed: {}", err);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Key Concepts
//!
//! - **Streams**: [`Watcher`], [`KeepAliver`] and [`AuditStream`] share one
//!   lifecycle: `done()`, `error()`, `close()`
//! - **Failures are latched**: a receive-side failure closes the stream and
//!   is reported by `error()`; a close the caller asked for reports `None`
//! - **Versions**: resources are read in their legacy or current shape and
//!   always surface in the current one; see [`marshal`]
//!
//! ## Features
//!
//! - `grpc` (default): Enable the gRPC transport via tonic

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

// Core modules
pub mod client;
pub mod config;
pub mod error;
pub mod types;

// Wire payloads
pub mod events;
pub mod marshal;

// Streams
pub mod stream;

// Transport layer
pub mod transport;

// Testing utilities
pub mod testing;

// Tracing support
pub mod tracing_support;

// Prelude for convenient imports
pub mod prelude;

// Re-export main types at crate root for convenience
pub use client::{Client, ClientBuilder};
pub use error::{Error, ErrorKind, Result};
pub use events::{Event, EventCodec, OpType};
pub use marshal::{CodecRegistry, MarshalOptions};
pub use stream::{
    AuditStream, KeepAliveSender, KeepAliver, StatusReceiver, StreamScope, WatchFilter, WatchKind,
    Watcher,
};
pub use types::{AuditEvent, KeepAlive, Resource, ResourceHeader, SessionId, StreamStatus};

// Re-export config types
pub use config::{ConnectionConfig, TlsConfig};

// Observability
pub use tracing_support::{StreamMetrics, StreamMetricsSnapshot};

pub use transport::Transport;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_compiles() {
        // Basic smoke test
        let _ = ErrorKind::StreamClosed;
    }
}
