//! Channel configuration for long-lived streams.

use std::time::Duration;

/// Configuration of the channel every stream is multiplexed over.
///
/// Streams live for as long as their handles, so there is no per-call
/// deadline. `open_timeout` bounds only the time a stream may take to
/// be established.
///
/// ## Default Values
///
/// - `connect_timeout`: 10s
/// - `open_timeout`: 30s
/// - `http2_keep_alive_interval`: 30s
/// - `keep_alive_timeout`: 20s
/// - `tcp_keepalive`: 60s
///
/// ## Example
///
/// ```rust
/// use accessplane::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new()
///     .with_connect_timeout(Duration::from_secs(5))
///     .with_http2_keep_alive_interval(Duration::from_secs(10));
/// assert_eq!(config.connect_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Timeout for establishing the TCP/TLS connection.
    pub connect_timeout: Duration,

    /// Timeout for a stream to become ready.
    pub open_timeout: Duration,

    /// Interval between HTTP/2 PING frames.
    pub http2_keep_alive_interval: Duration,

    /// Time to wait for a PING acknowledgement before closing the connection.
    pub keep_alive_timeout: Duration,

    /// TCP keepalive; `None` disables it.
    pub tcp_keepalive: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            open_timeout: Duration::from_secs(30),
            http2_keep_alive_interval: Duration::from_secs(30),
            keep_alive_timeout: Duration::from_secs(20),
            tcp_keepalive: Some(Duration::from_secs(60)),
        }
    }
}

impl ConnectionConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the stream open timeout.
    #[must_use]
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Sets the HTTP/2 keep-alive interval.
    #[must_use]
    pub fn with_http2_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.http2_keep_alive_interval = interval;
        self
    }

    /// Sets the keep-alive acknowledgement timeout.
    #[must_use]
    pub fn with_keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }

    /// Sets the TCP keepalive, or disables it with `None`.
    #[must_use]
    pub fn with_tcp_keepalive(mut self, keepalive: Option<Duration>) -> Self {
        self.tcp_keepalive = keepalive;
        self
    }
}
