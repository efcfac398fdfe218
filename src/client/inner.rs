//! Internal client implementation.

use std::sync::Arc;

use crate::marshal::{CodecRegistry, MarshalOptions};
use crate::tracing_support::StreamMetrics;
use crate::transport::StreamTransport;

pub(crate) struct ClientInner {
    /// The control plane URL; `None` for caller-supplied transports.
    pub url: Option<url::Url>,

    /// Transport every stream is opened on.
    pub transport: Arc<dyn StreamTransport>,

    /// Codecs for resource payloads.
    pub registry: Arc<CodecRegistry>,

    /// Counters shared by every stream.
    pub metrics: StreamMetrics,

    /// Options watch payloads are decoded with.
    pub event_decode_options: MarshalOptions,
}
