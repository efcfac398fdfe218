//! Resource model for the access plane.
//!
//! This module provides the entity shapes observed through the watch feed
//! and carried on the audit and heartbeat streams:
//!
//! - [`Metadata`]: Name, namespace, labels, expiry and server id
//! - [`Resource`]: Closed union over every supported kind plus the
//!   [`ResourceHeader`] carried by delete events
//! - [`VersionedResource`]: Per-kind version migration and checks
//! - [`AuditEvent`], [`StreamStatus`], [`KeepAlive`]: Stream payloads
//!
//! ## Versions
//!
//! | Kind                | Current | Legacy shape             |
//! |---------------------|---------|--------------------------|
//! | `user`              | `v2`    | [`UserV1`]               |
//! | `role`              | `v3`    | [`RoleV1`]               |
//! | `web_session`       | `v2`    | [`WebSessionV1`]         |
//! | `reverse_tunnel`    | `v2`    | [`ReverseTunnelV1`]      |
//! | `tunnel_connection` | `v2`    | [`TunnelConnectionV1`]   |
//! | `access_request`    | `v3`    | [`AccessRequestV1`]      |

mod access_request;
mod audit;
mod encoding;
mod metadata;
mod resource;
mod reverse_tunnel;
mod role;
mod user;
mod versioned;
mod web_session;

pub use access_request::{AccessRequest, AccessRequestSpec, AccessRequestState, AccessRequestV1};
pub use audit::{AuditEvent, KeepAlive, KeepAliveKind, SessionId, StreamStatus};
pub use metadata::{DEFAULT_NAMESPACE, LABEL_KEY_PATTERN, Metadata, is_valid_label_key};
pub use resource::{Resource, ResourceHeader};
pub use reverse_tunnel::{
    ReverseTunnel, ReverseTunnelSpec, ReverseTunnelV1, TunnelConnection, TunnelConnectionSpec,
    TunnelConnectionV1, TunnelType,
};
pub use role::{
    DEFAULT_MAX_SESSION_TTL, Role, RoleConditions, RoleOptions, RoleSpec, RoleV1, WILDCARD,
};
pub use user::{
    CreatedBy, ExternalIdentity, LoginStatus, TRAIT_KUBE_GROUPS, TRAIT_LOGINS, User, UserSpec,
    UserV1,
};
pub use versioned::{LEGACY_VERSION, Versioned, VersionedResource};
pub use web_session::{SUB_KIND_APP_SESSION, WebSession, WebSessionSpec, WebSessionV1};
