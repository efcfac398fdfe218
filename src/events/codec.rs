//! Mapping between [`Event`]s and [`WireEvent`]s.

use std::sync::Arc;

use super::{Event, OpType};
use crate::Error;
use crate::marshal::{CodecRegistry, MarshalOptions, marshal_header, unmarshal_header};
use crate::tracing_support::StreamMetrics;
use crate::transport::proto::wire_event::Resource as Arm;
use crate::transport::{Operation, WireEvent};
use crate::types::{
    AccessRequest, Resource, ReverseTunnel, Role, TunnelConnection, User, VersionedResource,
    WebSession,
};

/// Encodes and decodes watch events.
///
/// Each resource kind travels in its own arm of the wire oneof, as a
/// marshaled document. Arm payloads are decoded through the client's
/// [`CodecRegistry`]. Control plane output is trusted, so decoding skips the
/// schema check by default; defaulting still runs.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use accessplane::events::{Event, EventCodec};
/// use accessplane::marshal::CodecRegistry;
/// use accessplane::types::ReverseTunnel;
///
/// let codec = EventCodec::new(Arc::new(CodecRegistry::with_defaults()));
/// let event = Event::put(ReverseTunnel::new("east", vec!["10.0.0.1:3024".into()]));
///
/// let wire = codec.encode_event(&event).unwrap();
/// assert_eq!(codec.decode_event(wire).unwrap(), event);
/// ```
#[derive(Debug, Clone)]
pub struct EventCodec {
    registry: Arc<CodecRegistry>,
    encode_options: MarshalOptions,
    decode_options: MarshalOptions,
    metrics: StreamMetrics,
}

impl EventCodec {
    /// Creates a codec over `registry`.
    pub fn new(registry: Arc<CodecRegistry>) -> Self {
        Self {
            registry,
            encode_options: MarshalOptions::new().preserve_resource_id(),
            decode_options: MarshalOptions::new().skip_validation(),
            metrics: StreamMetrics::new(),
        }
    }

    /// Sets the options arm payloads are decoded with.
    #[must_use]
    pub fn with_decode_options(mut self, options: MarshalOptions) -> Self {
        self.decode_options = options;
        self
    }

    /// Sets the metrics decoded events are counted in.
    #[must_use]
    pub fn with_metrics(mut self, metrics: StreamMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Returns the metrics decoded events are counted in.
    pub fn metrics(&self) -> &StreamMetrics {
        &self.metrics
    }

    /// Encodes an event into its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedResource`](crate::ErrorKind::UnsupportedResource)
    /// when a put or delete has no resource, or the resource has no wire arm
    /// (web sessions are only carried as application sessions).
    pub fn encode_event(&self, event: &Event) -> Result<WireEvent, Error> {
        let operation = match event.op {
            OpType::Init => {
                return Ok(WireEvent {
                    r#type: Operation::Init as i32,
                    resource: None,
                });
            }
            OpType::Put => Operation::Put,
            OpType::Delete => Operation::Delete,
        };
        let resource = event
            .resource
            .as_ref()
            .ok_or_else(|| Error::unsupported_resource(format!("{} event has no resource", event.op)))?;

        let arm = match resource {
            Resource::Header(header) => {
                Arm::ResourceHeader(marshal_header(header, &self.encode_options)?)
            }
            Resource::User(_) => Arm::User(self.marshal(resource)?),
            Resource::Role(_) => Arm::Role(self.marshal(resource)?),
            Resource::WebSession(session) if session.is_app_session() => {
                Arm::AppSession(self.marshal(resource)?)
            }
            Resource::WebSession(session) => {
                return Err(Error::unsupported_resource(format!(
                    "web session of sub-kind {:?} cannot be sent in an event",
                    session.sub_kind
                )));
            }
            Resource::ReverseTunnel(_) => Arm::ReverseTunnel(self.marshal(resource)?),
            Resource::TunnelConnection(_) => Arm::TunnelConnection(self.marshal(resource)?),
            Resource::AccessRequest(_) => Arm::AccessRequest(self.marshal(resource)?),
        };

        Ok(WireEvent {
            r#type: operation as i32,
            resource: Some(arm),
        })
    }

    /// Decodes a wire event.
    ///
    /// A put carrying only a header is accepted but logged and counted.
    ///
    /// # Errors
    ///
    /// - [`Protocol`](crate::ErrorKind::Protocol) for an unknown operation
    /// - [`UnsupportedResource`](crate::ErrorKind::UnsupportedResource) when
    ///   a put or delete has no populated arm
    /// - any error from unmarshaling the arm's document
    pub fn decode_event(&self, wire: WireEvent) -> Result<Event, Error> {
        let op = match Operation::try_from(wire.r#type) {
            Ok(Operation::Init) => return Ok(Event::init()),
            Ok(Operation::Put) => OpType::Put,
            Ok(Operation::Delete) => OpType::Delete,
            Err(_) => {
                return Err(Error::protocol(format!(
                    "received unsupported event operation {}",
                    wire.r#type
                )));
            }
        };

        let resource = match wire.resource {
            Some(Arm::ResourceHeader(data)) => {
                Resource::Header(unmarshal_header(&data, &self.decode_options)?)
            }
            Some(Arm::User(data)) => self.unmarshal::<User>(&data)?,
            Some(Arm::Role(data)) => self.unmarshal::<Role>(&data)?,
            Some(Arm::AppSession(data)) => self.unmarshal::<WebSession>(&data)?,
            Some(Arm::ReverseTunnel(data)) => self.unmarshal::<ReverseTunnel>(&data)?,
            Some(Arm::TunnelConnection(data)) => self.unmarshal::<TunnelConnection>(&data)?,
            Some(Arm::AccessRequest(data)) => self.unmarshal::<AccessRequest>(&data)?,
            None => {
                return Err(Error::unsupported_resource(format!(
                    "{} event carries no supported resource",
                    op
                )));
            }
        };

        let event = Event {
            op,
            resource: Some(resource),
        };
        if event.is_header_only_put() {
            self.metrics.increment_header_only_puts();
            if let Some(resource) = &event.resource {
                tracing::warn!(
                    kind = resource.kind(),
                    name = resource.name(),
                    "received put event carrying only a resource header"
                );
            }
        }
        self.metrics.increment_events_decoded();
        Ok(event)
    }

    fn marshal(&self, resource: &Resource) -> Result<Vec<u8>, Error> {
        self.registry.marshal(resource, &self.encode_options)
    }

    fn unmarshal<T: VersionedResource>(&self, data: &[u8]) -> Result<Resource, Error> {
        self.registry.unmarshal_kind(T::KIND, data, &self.decode_options)
    }
}
