//! Stream metrics.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Counters shared by every stream a client opens.
///
/// Cloning is cheap; clones share the same counters.
///
/// ## Example
///
/// ```rust
/// use accessplane::tracing_support::StreamMetrics;
///
/// let metrics = StreamMetrics::new();
/// metrics.increment_events_decoded();
/// metrics.increment_header_only_puts();
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.events_decoded, 1);
/// assert_eq!(snapshot.header_only_puts, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StreamMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    streams_opened: AtomicU64,
    stream_failures: AtomicU64,
    events_decoded: AtomicU64,
    header_only_puts: AtomicU64,
    keep_alives_sent: AtomicU64,
    audit_events_emitted: AtomicU64,
    statuses_received: AtomicU64,
}

impl StreamMetrics {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a stream opened.
    pub fn increment_streams_opened(&self) {
        self.inner.streams_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a stream terminated by an error.
    pub fn increment_stream_failures(&self) {
        self.inner.stream_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a watch event decoded.
    pub fn increment_events_decoded(&self) {
        self.inner.events_decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a put event that carried only a resource header.
    pub fn increment_header_only_puts(&self) {
        self.inner.header_only_puts.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a heartbeat written to the wire.
    pub fn increment_keep_alives_sent(&self) {
        self.inner.keep_alives_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an audit event written to the wire.
    pub fn increment_audit_events_emitted(&self) {
        self.inner.audit_events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an audit stream status received.
    pub fn increment_statuses_received(&self) {
        self.inner.statuses_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of current values.
    pub fn snapshot(&self) -> StreamMetricsSnapshot {
        StreamMetricsSnapshot {
            streams_opened: self.inner.streams_opened.load(Ordering::Relaxed),
            stream_failures: self.inner.stream_failures.load(Ordering::Relaxed),
            events_decoded: self.inner.events_decoded.load(Ordering::Relaxed),
            header_only_puts: self.inner.header_only_puts.load(Ordering::Relaxed),
            keep_alives_sent: self.inner.keep_alives_sent.load(Ordering::Relaxed),
            audit_events_emitted: self.inner.audit_events_emitted.load(Ordering::Relaxed),
            statuses_received: self.inner.statuses_received.load(Ordering::Relaxed),
        }
    }
}

/// A snapshot of metrics values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamMetricsSnapshot {
    /// Streams opened.
    pub streams_opened: u64,
    /// Streams terminated by an error.
    pub stream_failures: u64,
    /// Watch events decoded.
    pub events_decoded: u64,
    /// Put events carrying only a header.
    pub header_only_puts: u64,
    /// Heartbeats written.
    pub keep_alives_sent: u64,
    /// Audit events written.
    pub audit_events_emitted: u64,
    /// Audit stream statuses received.
    pub statuses_received: u64,
}

impl StreamMetricsSnapshot {
    /// Returns the fraction of opened streams that failed.
    pub fn failure_rate(&self) -> f64 {
        if self.streams_opened == 0 {
            0.0
        } else {
            self.stream_failures as f64 / self.streams_opened as f64
        }
    }
}
