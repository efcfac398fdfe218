//! Change events observed through a watch.

use std::fmt;

use crate::types::Resource;

/// Kind of change an [`Event`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpType {
    /// The watch is established; carries no resource.
    Init,
    /// A resource was created or updated.
    Put,
    /// A resource was deleted.
    Delete,
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpType::Init => write!(f, "init"),
            OpType::Put => write!(f, "put"),
            OpType::Delete => write!(f, "delete"),
        }
    }
}

/// A change to one resource, or the initial marker of a watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Kind of change.
    pub op: OpType,
    /// Resource affected; `None` for [`OpType::Init`].
    pub resource: Option<Resource>,
}

impl Event {
    /// Creates the initial marker of a watch.
    pub fn init() -> Self {
        Self {
            op: OpType::Init,
            resource: None,
        }
    }

    /// Creates a put event.
    pub fn put(resource: impl Into<Resource>) -> Self {
        Self {
            op: OpType::Put,
            resource: Some(resource.into()),
        }
    }

    /// Creates a delete event.
    pub fn delete(resource: impl Into<Resource>) -> Self {
        Self {
            op: OpType::Delete,
            resource: Some(resource.into()),
        }
    }

    /// Returns `true` for a put that carries only a resource header.
    ///
    /// The control plane sends full resources on put; a header-only put is
    /// accepted but consumers should not treat it as the resource's state.
    pub fn is_header_only_put(&self) -> bool {
        self.op == OpType::Put && self.resource.as_ref().is_some_and(Resource::is_header)
    }
}
