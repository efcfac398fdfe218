//! The closed set of resources carried by the watch feed.

use serde::{Deserialize, Serialize};

use super::{
    AccessRequest, Metadata, ReverseTunnel, Role, TunnelConnection, User, WebSession,
};
use crate::Error;

/// Kind, version and metadata of a resource without its body.
///
/// Delete events carry only this header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHeader {
    /// Kind of the resource described.
    pub kind: String,
    /// Sub-kind of the resource described.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_kind: String,
    /// Version of the resource described.
    #[serde(default)]
    pub version: String,
    /// Metadata.
    pub metadata: Metadata,
}

impl ResourceHeader {
    /// Creates a header for the named resource.
    pub fn new(kind: impl Into<String>, version: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            sub_kind: String::new(),
            version: version.into(),
            metadata: Metadata::new(name),
        }
    }

    /// Validates the header and fills in metadata defaults.
    pub fn check_and_set_defaults(&mut self) -> Result<(), Error> {
        if self.kind.is_empty() {
            return Err(Error::validation("resource header is missing its kind"));
        }
        self.metadata.check_and_set_defaults()
    }
}

/// Any resource the client understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// Header only, as carried by delete events.
    Header(ResourceHeader),
    /// A user.
    User(User),
    /// A role.
    Role(Role),
    /// A web or application session.
    WebSession(WebSession),
    /// A reverse tunnel.
    ReverseTunnel(ReverseTunnel),
    /// A tunnel connection.
    TunnelConnection(TunnelConnection),
    /// An access request.
    AccessRequest(AccessRequest),
}

impl Resource {
    /// Returns the kind tag.
    pub fn kind(&self) -> &str {
        match self {
            Resource::Header(r) => &r.kind,
            Resource::User(r) => &r.kind,
            Resource::Role(r) => &r.kind,
            Resource::WebSession(r) => &r.kind,
            Resource::ReverseTunnel(r) => &r.kind,
            Resource::TunnelConnection(r) => &r.kind,
            Resource::AccessRequest(r) => &r.kind,
        }
    }

    /// Returns the sub-kind.
    pub fn sub_kind(&self) -> &str {
        match self {
            Resource::Header(r) => &r.sub_kind,
            Resource::User(r) => &r.sub_kind,
            Resource::Role(r) => &r.sub_kind,
            Resource::WebSession(r) => &r.sub_kind,
            Resource::ReverseTunnel(r) => &r.sub_kind,
            Resource::TunnelConnection(r) => &r.sub_kind,
            Resource::AccessRequest(r) => &r.sub_kind,
        }
    }

    /// Returns the version label.
    pub fn version(&self) -> &str {
        match self {
            Resource::Header(r) => &r.version,
            Resource::User(r) => &r.version,
            Resource::Role(r) => &r.version,
            Resource::WebSession(r) => &r.version,
            Resource::ReverseTunnel(r) => &r.version,
            Resource::TunnelConnection(r) => &r.version,
            Resource::AccessRequest(r) => &r.version,
        }
    }

    /// Returns the metadata.
    pub fn metadata(&self) -> &Metadata {
        match self {
            Resource::Header(r) => &r.metadata,
            Resource::User(r) => &r.metadata,
            Resource::Role(r) => &r.metadata,
            Resource::WebSession(r) => &r.metadata,
            Resource::ReverseTunnel(r) => &r.metadata,
            Resource::TunnelConnection(r) => &r.metadata,
            Resource::AccessRequest(r) => &r.metadata,
        }
    }

    /// Returns the metadata mutably.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            Resource::Header(r) => &mut r.metadata,
            Resource::User(r) => &mut r.metadata,
            Resource::Role(r) => &mut r.metadata,
            Resource::WebSession(r) => &mut r.metadata,
            Resource::ReverseTunnel(r) => &mut r.metadata,
            Resource::TunnelConnection(r) => &mut r.metadata,
            Resource::AccessRequest(r) => &mut r.metadata,
        }
    }

    /// Returns the resource name.
    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Returns `true` for a header without a body.
    pub fn is_header(&self) -> bool {
        matches!(self, Resource::Header(_))
    }

    /// Returns the header describing this resource.
    pub fn header(&self) -> ResourceHeader {
        ResourceHeader {
            kind: self.kind().to_string(),
            sub_kind: self.sub_kind().to_string(),
            version: self.version().to_string(),
            metadata: self.metadata().clone(),
        }
    }
}

impl From<ResourceHeader> for Resource {
    fn from(header: ResourceHeader) -> Self {
        Resource::Header(header)
    }
}
