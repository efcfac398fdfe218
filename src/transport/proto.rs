//! Wire messages of the `proto.AuthService` streaming calls.
//!
//! Kept in sync with `proto/accessplane/stream.proto`. Resource payloads
//! travel as marshaled JSON documents inside `bytes` fields.

/// Kind of change carried by a [`WireEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Operation {
    /// Watch established; no resource.
    Init = 0,
    /// Resource created or updated.
    Put = 1,
    /// Resource deleted.
    Delete = 2,
}

/// One change observed by a watch.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WireEvent {
    /// Operation.
    #[prost(enumeration = "Operation", tag = "1")]
    pub r#type: i32,
    /// Resource affected; unset for `Init`.
    #[prost(oneof = "wire_event::Resource", tags = "2, 3, 4, 5, 6, 7, 8")]
    pub resource: ::core::option::Option<wire_event::Resource>,
}

/// Nested types of [`WireEvent`].
pub mod wire_event {
    /// Resource arm of a [`WireEvent`](super::WireEvent).
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Resource {
        /// Header only, for deletes.
        #[prost(bytes, tag = "2")]
        ResourceHeader(::prost::alloc::vec::Vec<u8>),
        /// A user.
        #[prost(bytes, tag = "3")]
        User(::prost::alloc::vec::Vec<u8>),
        /// A role.
        #[prost(bytes, tag = "4")]
        Role(::prost::alloc::vec::Vec<u8>),
        /// An application session.
        #[prost(bytes, tag = "5")]
        AppSession(::prost::alloc::vec::Vec<u8>),
        /// A reverse tunnel.
        #[prost(bytes, tag = "6")]
        ReverseTunnel(::prost::alloc::vec::Vec<u8>),
        /// A tunnel connection.
        #[prost(bytes, tag = "7")]
        TunnelConnection(::prost::alloc::vec::Vec<u8>),
        /// An access request.
        #[prost(bytes, tag = "8")]
        AccessRequest(::prost::alloc::vec::Vec<u8>),
    }
}

/// Kind selector of a watch.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WatchKind {
    /// Resource kind.
    #[prost(string, tag = "1")]
    pub kind: ::prost::alloc::string::String,
    /// Include secrets in delivered resources.
    #[prost(bool, tag = "2")]
    pub load_secrets: bool,
    /// Restrict to one resource name; empty for all.
    #[prost(string, tag = "3")]
    pub name: ::prost::alloc::string::String,
    /// Server-side predicate; empty for none.
    #[prost(string, tag = "4")]
    pub predicate: ::prost::alloc::string::String,
}

/// Opens a watch.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WatchRequest {
    /// Kinds to watch.
    #[prost(message, repeated, tag = "1")]
    pub kinds: ::prost::alloc::vec::Vec<WatchKind>,
}

/// Type of server a lease belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum KeepAliveType {
    /// SSH node.
    Node = 0,
    /// Application server.
    App = 1,
    /// Database server.
    Database = 2,
}

/// A lease heartbeat.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WireKeepAlive {
    /// Leased resource name.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// Leased resource namespace.
    #[prost(string, tag = "2")]
    pub namespace: ::prost::alloc::string::String,
    /// New expiry.
    #[prost(message, optional, tag = "3")]
    pub expires: ::core::option::Option<::prost_types::Timestamp>,
    /// Server type.
    #[prost(enumeration = "KeepAliveType", tag = "4")]
    pub r#type: i32,
}

/// Opens a new session stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateStream {
    /// Session id.
    #[prost(string, tag = "1")]
    pub session_id: ::prost::alloc::string::String,
}

/// Reopens an interrupted session stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResumeStream {
    /// Session id.
    #[prost(string, tag = "1")]
    pub session_id: ::prost::alloc::string::String,
    /// Upload to continue.
    #[prost(string, tag = "2")]
    pub upload_id: ::prost::alloc::string::String,
}

/// Marks the session stream complete.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CompleteStream {}

/// Flushes buffered data without completing the session.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct FlushAndCloseStream {}

/// An audit event on the wire.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuditRecord {
    /// Event type.
    #[prost(string, tag = "1")]
    pub event_type: ::prost::alloc::string::String,
    /// Event code.
    #[prost(string, tag = "2")]
    pub code: ::prost::alloc::string::String,
    /// Index within the session.
    #[prost(int64, tag = "3")]
    pub index: i64,
    /// Event time.
    #[prost(message, optional, tag = "4")]
    pub time: ::core::option::Option<::prost_types::Timestamp>,
    /// Session id.
    #[prost(string, tag = "5")]
    pub session_id: ::prost::alloc::string::String,
    /// Remaining fields as a JSON object.
    #[prost(bytes = "vec", tag = "6")]
    pub fields: ::prost::alloc::vec::Vec<u8>,
}

/// One request on an audit stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuditStreamRequest {
    /// Request variant.
    #[prost(oneof = "audit_stream_request::Request", tags = "1, 2, 3, 4, 5")]
    pub request: ::core::option::Option<audit_stream_request::Request>,
}

/// Nested types of [`AuditStreamRequest`].
pub mod audit_stream_request {
    /// Variant of an [`AuditStreamRequest`](super::AuditStreamRequest).
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Request {
        /// Opens a new stream.
        #[prost(message, tag = "1")]
        CreateStream(super::CreateStream),
        /// Resumes a stream.
        #[prost(message, tag = "2")]
        ResumeStream(super::ResumeStream),
        /// Completes the stream.
        #[prost(message, tag = "3")]
        CompleteStream(super::CompleteStream),
        /// Flushes and closes the stream.
        #[prost(message, tag = "4")]
        FlushAndCloseStream(super::FlushAndCloseStream),
        /// Appends an event.
        #[prost(message, tag = "5")]
        Event(super::AuditRecord),
    }
}

/// Progress of an audit stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WireStreamStatus {
    /// Upload the stream writes into.
    #[prost(string, tag = "1")]
    pub upload_id: ::prost::alloc::string::String,
    /// Last durably accepted event index.
    #[prost(int64, tag = "2")]
    pub last_event_index: i64,
}
