//! Versioned resource marshaling.
//!
//! Every payload the streams carry is a JSON resource document. This module
//! turns those documents into typed [`Resource`](crate::types::Resource)s and
//! back, across the legacy and current version of each kind:
//!
//! - [`unmarshal`] / [`marshal`]: typed entry points for one kind
//! - [`CodecRegistry`]: kind-dispatching entry points over [`ResourceCodec`]s
//! - [`Schema`]: the structural gate run before current-version documents
//!   are decoded
//!
//! ## Unmarshal pipeline
//!
//! ```text
//! bytes ─► peek {kind, version}
//!            ├─ unversioned ─► legacy shape ─► upgrade ─┐
//!            ├─ current ─► schema (unless skipped) ─────┤
//!            └─ other ─► UnsupportedVersion             │
//!                                                       ▼
//!                                   defaults + checks ─► overrides
//! ```

mod codec;
mod options;
mod registry;
mod schema;

pub use codec::{
    KindCodec, ResourceCodec, marshal, marshal_header, unmarshal, unmarshal_header,
};
pub use options::MarshalOptions;
pub use registry::CodecRegistry;
pub use schema::{ObjectSchema, Schema, metadata_schema, resource_schema};
