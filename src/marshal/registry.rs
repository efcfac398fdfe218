//! Registry of per-kind codecs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::codec::{HeaderPeek, KindCodec, ResourceCodec, marshal_header};
use super::MarshalOptions;
use crate::Error;
use crate::types::{
    AccessRequest, Resource, ReverseTunnel, Role, TunnelConnection, User, WebSession,
};

/// Maps resource kinds to their codecs.
///
/// A registry is owned by a [`Client`](crate::Client) and shared by every
/// stream the client opens. Lookups and replacements go through one lock;
/// a replacement swaps the whole codec, so a lookup sees either the old or
/// the new codec, never a mix.
///
/// ## Example
///
/// ```rust
/// use accessplane::marshal::{CodecRegistry, MarshalOptions};
/// use accessplane::types::{ReverseTunnel, Resource};
///
/// let registry = CodecRegistry::with_defaults();
/// let tunnel: Resource = ReverseTunnel::new("east", vec!["10.0.0.1:3024".into()]).into();
///
/// let data = registry.marshal(&tunnel, &MarshalOptions::new()).unwrap();
/// let back = registry.unmarshal(&data, &MarshalOptions::new()).unwrap();
/// assert_eq!(back.kind(), "reverse_tunnel");
/// ```
pub struct CodecRegistry {
    codecs: RwLock<HashMap<&'static str, Arc<dyn ResourceCodec>>>,
}

impl CodecRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            codecs: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry with a codec for every built-in kind.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(KindCodec::<User>::new()));
        registry.register(Arc::new(KindCodec::<Role>::new()));
        registry.register(Arc::new(KindCodec::<WebSession>::new()));
        registry.register(Arc::new(KindCodec::<ReverseTunnel>::new()));
        registry.register(Arc::new(KindCodec::<TunnelConnection>::new()));
        registry.register(Arc::new(KindCodec::<AccessRequest>::new()));
        registry
    }

    /// Registers a codec, returning the one it replaced.
    pub fn register(&self, codec: Arc<dyn ResourceCodec>) -> Option<Arc<dyn ResourceCodec>> {
        let kind = codec.kind();
        let version = codec.version();
        let previous = self.codecs.write().insert(kind, codec);
        if previous.is_some() {
            tracing::info!(kind, version, "replaced resource codec");
        } else {
            tracing::debug!(kind, version, "registered resource codec");
        }
        previous
    }

    /// Returns the codec for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedResource`](crate::ErrorKind::UnsupportedResource)
    /// if no codec is registered for the kind.
    pub fn get(&self, kind: &str) -> Result<Arc<dyn ResourceCodec>, Error> {
        self.codecs
            .read()
            .get(kind)
            .cloned()
            .ok_or_else(|| Error::unsupported_resource(format!("resource kind {:?} is not supported", kind)))
    }

    /// Returns the registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.codecs.read().keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Encodes any resource with the codec of its kind.
    ///
    /// Headers are encoded directly.
    pub fn marshal(&self, resource: &Resource, options: &MarshalOptions) -> Result<Vec<u8>, Error> {
        match resource {
            Resource::Header(header) => marshal_header(header, options),
            other => self.get(other.kind())?.marshal(other, options),
        }
    }

    /// Decodes a document, dispatching on its `kind` field.
    ///
    /// # Errors
    ///
    /// Fails with a validation error on empty or malformed input and with
    /// [`UnsupportedResource`](crate::ErrorKind::UnsupportedResource) when the
    /// kind is missing or unknown. Unversioned legacy documents carry no kind;
    /// decode those with [`unmarshal_kind`](Self::unmarshal_kind).
    pub fn unmarshal(&self, data: &[u8], options: &MarshalOptions) -> Result<Resource, Error> {
        if data.is_empty() {
            return Err(Error::validation("missing resource data"));
        }
        let header = HeaderPeek::read(data)?;
        if header.kind.is_empty() {
            return Err(Error::unsupported_resource("resource document has no kind"));
        }
        self.get(&header.kind)?.unmarshal(data, options)
    }

    /// Decodes a document known to be of `kind`.
    pub fn unmarshal_kind(&self, kind: &str, data: &[u8], options: &MarshalOptions) -> Result<Resource, Error> {
        self.get(kind)?.unmarshal(data, options)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
