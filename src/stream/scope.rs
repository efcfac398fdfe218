//! Cancellable scope shared by a stream handle and its background tasks.

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::Error;
use crate::tracing_support::StreamMetrics;

/// Lifetime of one stream: a cancellation token plus a latched terminal
/// error.
///
/// The first error latched wins and cancels the scope. [`close`](Self::close)
/// cancels without latching, so a stream closed by its owner reports no
/// error. Once cancelled, nothing more is latched.
///
/// ## Example
///
/// ```rust
/// use accessplane::stream::StreamScope;
/// use accessplane::Error;
///
/// let scope = StreamScope::new("example");
/// scope.latch(Error::stream_closed());
/// scope.latch(Error::internal("ignored"));
///
/// assert!(scope.is_closed());
/// assert_eq!(scope.error().unwrap().kind(), accessplane::ErrorKind::StreamClosed);
/// ```
#[derive(Debug, Clone)]
pub struct StreamScope {
    inner: Arc<ScopeInner>,
}

#[derive(Debug)]
struct ScopeInner {
    name: &'static str,
    token: CancellationToken,
    error: RwLock<Option<Error>>,
    metrics: StreamMetrics,
}

impl StreamScope {
    /// Creates an open scope.
    pub fn new(name: &'static str) -> Self {
        Self::with_metrics(name, StreamMetrics::new())
    }

    /// Creates an open scope that counts failures in `metrics`.
    pub fn with_metrics(name: &'static str, metrics: StreamMetrics) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                name,
                token: CancellationToken::new(),
                error: RwLock::new(None),
                metrics,
            }),
        }
    }

    /// Records `error` as the terminal error and cancels the scope.
    ///
    /// Ignored if an error is already latched or the scope is closed.
    pub fn latch(&self, error: Error) {
        {
            let mut slot = self.inner.error.write();
            if slot.is_some() || self.inner.token.is_cancelled() {
                return;
            }
            tracing::warn!(stream = self.inner.name, error = %error, "stream terminated");
            *slot = Some(error);
            self.inner.token.cancel();
        }
        self.inner.metrics.increment_stream_failures();
    }

    /// Cancels the scope without latching an error. Idempotent.
    pub fn close(&self) {
        let _slot = self.inner.error.write();
        if !self.inner.token.is_cancelled() {
            tracing::debug!(stream = self.inner.name, "stream closed");
            self.inner.token.cancel();
        }
    }

    /// Waits until the scope is cancelled.
    pub async fn done(&self) {
        self.inner.token.cancelled().await;
    }

    /// Returns the latched error, if any.
    pub fn error(&self) -> Option<Error> {
        self.inner.error.read().clone()
    }

    /// Returns `true` once the scope is cancelled.
    pub fn is_closed(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Returns the name used in logs.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Error reported to callers of a closed stream: the latched error,
    /// or [`Cancelled`](crate::ErrorKind::Cancelled) after a graceful close.
    pub fn closed_error(&self) -> Error {
        self.error().unwrap_or_else(Error::cancelled)
    }

    /// Runs `future` until it completes or the scope is cancelled.
    pub(crate) async fn guard<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.inner.token.cancelled() => None,
            output = future => Some(output),
        }
    }

    pub(crate) fn metrics(&self) -> &StreamMetrics {
        &self.inner.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::time::Duration;

    #[test]
    fn test_first_latch_wins() {
        let scope = StreamScope::new("test");
        scope.latch(Error::connection("reset"));
        scope.latch(Error::protocol("later"));
        assert_eq!(scope.error().unwrap().kind(), ErrorKind::Connection);
        assert!(scope.is_closed());
    }

    #[test]
    fn test_close_never_latches() {
        let scope = StreamScope::new("test");
        scope.close();
        scope.close();
        scope.latch(Error::stream_closed());
        assert!(scope.is_closed());
        assert!(scope.error().is_none());
        assert_eq!(scope.closed_error().kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_latch_counts_failure() {
        let metrics = StreamMetrics::new();
        let scope = StreamScope::with_metrics("test", metrics.clone());
        scope.latch(Error::stream_closed());
        scope.latch(Error::stream_closed());
        assert_eq!(metrics.snapshot().stream_failures, 1);
    }

    #[tokio::test]
    async fn test_done_wakes_on_close() {
        let scope = StreamScope::new("test");
        let waiter = {
            let scope = scope.clone();
            tokio::spawn(async move { scope.done().await })
        };
        scope.close();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_guard_unblocks_on_cancel() {
        let scope = StreamScope::new("test");
        let guarded = {
            let scope = scope.clone();
            tokio::spawn(async move { scope.guard(futures::future::pending::<()>()).await })
        };
        scope.latch(Error::stream_closed());
        assert!(guarded.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_close_and_latch() {
        for _ in 0..50 {
            let scope = StreamScope::new("test");
            let closer = {
                let scope = scope.clone();
                tokio::spawn(async move { scope.close() })
            };
            let latcher = {
                let scope = scope.clone();
                tokio::spawn(async move { scope.latch(Error::stream_closed()) })
            };
            closer.await.unwrap();
            latcher.await.unwrap();
            assert!(scope.is_closed());
        }
    }
}
