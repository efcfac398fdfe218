//! Access requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Metadata, Resource, VersionedResource};
use crate::Error;
use crate::marshal::{Schema, resource_schema};

/// Review state of an access request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRequestState {
    /// Awaiting review.
    #[default]
    Pending,
    /// Granted.
    Approved,
    /// Refused.
    Denied,
}

impl AccessRequestState {
    const NAMES: &'static [&'static str] = &["pending", "approved", "denied"];

    /// Returns `true` once the request has been reviewed.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, AccessRequestState::Pending)
    }
}

/// Body of an [`AccessRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequestSpec {
    /// Requesting user.
    #[serde(default)]
    pub user: String,
    /// Requested roles.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Review state.
    #[serde(default)]
    pub state: AccessRequestState,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    /// When granted access would lapse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

/// A request for temporary role elevation, version `v3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Always `"access_request"`.
    pub kind: String,
    /// Sub-kind, usually empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_kind: String,
    /// Version label.
    pub version: String,
    /// Metadata; the name is the request id.
    pub metadata: Metadata,
    /// Body.
    pub spec: AccessRequestSpec,
}

impl AccessRequest {
    /// Creates a pending request with a fresh id.
    pub fn new(user: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            sub_kind: String::new(),
            version: Self::VERSION.to_string(),
            metadata: Metadata::new(uuid::Uuid::new_v4().to_string()),
            spec: AccessRequestSpec {
                user: user.into(),
                roles,
                ..Default::default()
            },
        }
    }
}

/// Legacy shape of an access request.
///
/// Documents written without a `name` get one derived from the request
/// body, so decoding the same document twice names it the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequestV1 {
    /// Request id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Requesting user.
    pub user: String,
    /// Requested roles.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Review state.
    #[serde(default)]
    pub state: AccessRequestState,
}

impl VersionedResource for AccessRequest {
    const KIND: &'static str = "access_request";
    const VERSION: &'static str = "v3";
    type Legacy = AccessRequestV1;

    fn from_resource(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::AccessRequest(request) => Some(request),
            _ => None,
        }
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    fn upgrade(legacy: AccessRequestV1) -> Self {
        let name = if legacy.name.is_empty() {
            legacy_request_name(&legacy)
        } else {
            legacy.name
        };
        let mut request = Self::new(legacy.user, legacy.roles);
        request.metadata.name = name;
        request.spec.state = legacy.state;
        request
    }

    fn downgrade(&self) -> AccessRequestV1 {
        AccessRequestV1 {
            name: self.metadata.name.clone(),
            user: self.spec.user.clone(),
            roles: self.spec.roles.clone(),
            state: self.spec.state,
        }
    }

    fn schema() -> Schema {
        resource_schema(
            Schema::object()
                .required("user", Schema::String)
                .required("roles", Schema::array(Schema::String))
                .property("state", Schema::Enum(AccessRequestState::NAMES))
                .property("created", Schema::Timestamp)
                .property("expires", Schema::Timestamp)
                .into(),
        )
    }

    fn check(&self) -> Result<(), Error> {
        if self.spec.user.is_empty() {
            return Err(Error::validation("access request is missing its user"));
        }
        if self.spec.roles.is_empty() {
            return Err(Error::validation("access request names no roles"));
        }
        Ok(())
    }
}

/// Name-based UUID over the fields a legacy request is identified by.
fn legacy_request_name(legacy: &AccessRequestV1) -> String {
    let key = format!("{}:{}:{:?}", legacy.user, legacy.roles.join(","), legacy.state);
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

impl From<AccessRequest> for Resource {
    fn from(request: AccessRequest) -> Self {
        Resource::AccessRequest(request)
    }
}
