//! Configuration types.
//!
//! This module provides configuration options for:
//! - [`ConnectionConfig`]: Channel timeouts and keep-alives
//! - [`TlsConfig`]: TLS settings and client identity

mod connection;
mod tls;

pub use connection::ConnectionConfig;
pub use tls::TlsConfig;
