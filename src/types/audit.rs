//! Audit events, stream status and lease heartbeats.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::Error;

/// Identifier of a recorded session.
///
/// ## Example
///
/// ```rust
/// use accessplane::types::SessionId;
///
/// let sid = SessionId::new();
/// let parsed: SessionId = sid.to_string().parse().unwrap();
/// assert_eq!(sid, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|e| {
            Error::invalid_argument(format!("invalid session id {:?}", s)).with_source(e)
        })
    }
}

/// An auditable event emitted into a session stream.
///
/// Kind-specific payload lives in `fields`; the header fields are typed.
///
/// ## Example
///
/// ```rust
/// use accessplane::types::AuditEvent;
///
/// let event = AuditEvent::new("session.start", "T2000I")
///     .with_index(0)
///     .with_field("user", "alice");
/// assert_eq!(event.fields["user"], "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event type, e.g. `session.start`.
    #[serde(rename = "event")]
    pub event_type: String,
    /// Stable event code.
    pub code: String,
    /// Monotonic index within the session.
    #[serde(rename = "ei", default)]
    pub index: i64,
    /// When the event happened.
    pub time: DateTime<Utc>,
    /// Session the event belongs to.
    #[serde(rename = "sid", default, skip_serializing_if = "String::is_empty")]
    pub session_id: String,
    /// Remaining event fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AuditEvent {
    /// Creates an event stamped with the current time.
    pub fn new(event_type: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            code: code.into(),
            index: 0,
            time: Utc::now(),
            session_id: String::new(),
            fields: Map::new(),
        }
    }

    /// Sets the index.
    #[must_use]
    pub fn with_index(mut self, index: i64) -> Self {
        self.index = index;
        self
    }

    /// Sets the time, converting it to UTC.
    #[must_use]
    pub fn with_time<Tz: TimeZone>(mut self, time: DateTime<Tz>) -> Self {
        self.time = time.with_timezone(&Utc);
        self
    }

    /// Sets the session id.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl ToString) -> Self {
        self.session_id = session_id.to_string();
        self
    }

    /// Adds a payload field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Encodes the event as one flat JSON document.
    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes an event from its flat JSON document.
    pub fn from_json(data: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Progress reported by the control plane for an audit stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStatus {
    /// Index of the last event the control plane has durably accepted.
    pub last_event_index: i64,
    /// Upload the stream writes into; pass it back to resume.
    pub upload_id: String,
}

/// Type of the server a lease belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum KeepAliveKind {
    /// SSH node.
    #[default]
    Node,
    /// Application server.
    App,
    /// Database server.
    Database,
}

/// A lease heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAlive {
    /// Name of the leased resource.
    pub name: String,
    /// Namespace of the leased resource.
    pub namespace: String,
    /// Type of server holding the lease.
    pub kind: KeepAliveKind,
    /// New lease expiry.
    pub expires: DateTime<Utc>,
}

impl KeepAlive {
    /// Creates a node heartbeat in the default namespace.
    pub fn new(name: impl Into<String>, expires: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            namespace: super::DEFAULT_NAMESPACE.to_string(),
            kind: KeepAliveKind::Node,
            expires,
        }
    }

    /// Sets the server type.
    #[must_use]
    pub fn with_kind(mut self, kind: KeepAliveKind) -> Self {
        self.kind = kind;
        self
    }
}
