//! Conversions between stream payloads and their wire messages.

use chrono::{DateTime, Utc};
use prost_types::Timestamp;
use serde_json::{Map, Value};

use super::proto::{AuditRecord, KeepAliveType, WireKeepAlive, WireStreamStatus};
use crate::Error;
use crate::types::{AuditEvent, KeepAlive, KeepAliveKind, StreamStatus};

pub(crate) fn to_timestamp(time: &DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: time.timestamp(),
        nanos: time.timestamp_subsec_nanos() as i32,
    }
}

pub(crate) fn from_timestamp(timestamp: &Timestamp) -> Result<DateTime<Utc>, Error> {
    u32::try_from(timestamp.nanos)
        .ok()
        .and_then(|nanos| DateTime::from_timestamp(timestamp.seconds, nanos))
        .ok_or_else(|| Error::protocol(format!("timestamp out of range: {}", timestamp)))
}

impl From<KeepAliveKind> for KeepAliveType {
    fn from(kind: KeepAliveKind) -> Self {
        match kind {
            KeepAliveKind::Node => KeepAliveType::Node,
            KeepAliveKind::App => KeepAliveType::App,
            KeepAliveKind::Database => KeepAliveType::Database,
        }
    }
}

impl From<KeepAliveType> for KeepAliveKind {
    fn from(kind: KeepAliveType) -> Self {
        match kind {
            KeepAliveType::Node => KeepAliveKind::Node,
            KeepAliveType::App => KeepAliveKind::App,
            KeepAliveType::Database => KeepAliveKind::Database,
        }
    }
}

impl From<&KeepAlive> for WireKeepAlive {
    fn from(keep_alive: &KeepAlive) -> Self {
        Self {
            name: keep_alive.name.clone(),
            namespace: keep_alive.namespace.clone(),
            expires: Some(to_timestamp(&keep_alive.expires)),
            r#type: KeepAliveType::from(keep_alive.kind) as i32,
        }
    }
}

impl TryFrom<WireKeepAlive> for KeepAlive {
    type Error = Error;

    fn try_from(wire: WireKeepAlive) -> Result<Self, Error> {
        let expires = wire
            .expires
            .as_ref()
            .ok_or_else(|| Error::protocol("keep-alive has no expiry"))
            .and_then(from_timestamp)?;
        let kind = KeepAliveType::try_from(wire.r#type)
            .map_err(|_| Error::protocol(format!("unknown keep-alive type {}", wire.r#type)))?;
        Ok(Self {
            name: wire.name,
            namespace: wire.namespace,
            kind: kind.into(),
            expires,
        })
    }
}

impl TryFrom<&AuditEvent> for AuditRecord {
    type Error = Error;

    fn try_from(event: &AuditEvent) -> Result<Self, Error> {
        Ok(Self {
            event_type: event.event_type.clone(),
            code: event.code.clone(),
            index: event.index,
            time: Some(to_timestamp(&event.time)),
            session_id: event.session_id.clone(),
            fields: serde_json::to_vec(&event.fields)?,
        })
    }
}

impl TryFrom<AuditRecord> for AuditEvent {
    type Error = Error;

    fn try_from(record: AuditRecord) -> Result<Self, Error> {
        let time = record
            .time
            .as_ref()
            .ok_or_else(|| Error::protocol("audit record has no time"))
            .and_then(from_timestamp)?;
        let fields = if record.fields.is_empty() {
            Map::new()
        } else {
            match serde_json::from_slice(&record.fields)? {
                Value::Object(map) => map,
                _ => return Err(Error::validation("audit record fields must be a JSON object")),
            }
        };
        Ok(Self {
            event_type: record.event_type,
            code: record.code,
            index: record.index,
            time,
            session_id: record.session_id,
            fields,
        })
    }
}

impl From<WireStreamStatus> for StreamStatus {
    fn from(status: WireStreamStatus) -> Self {
        Self {
            last_event_index: status.last_event_index,
            upload_id: status.upload_id,
        }
    }
}
