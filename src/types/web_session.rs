//! Web and application sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::encoding::base64_bytes;
use super::{Metadata, Resource, VersionedResource};
use crate::Error;
use crate::marshal::{Schema, resource_schema};

/// Sub-kind of a web session issued for application access.
pub const SUB_KIND_APP_SESSION: &str = "app_session";

/// Body of a [`WebSession`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSessionSpec {
    /// User the session belongs to.
    #[serde(default)]
    pub user: String,
    /// Public certificate signed by the control plane.
    #[serde(default, rename = "pub", with = "base64_bytes")]
    pub r#pub: Vec<u8>,
    /// Private key.
    #[serde(
        default,
        rename = "priv",
        with = "base64_bytes",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub r#priv: Vec<u8>,
    /// Bearer token used alongside the session cookie.
    #[serde(default)]
    pub bearer_token: String,
    /// When the bearer token expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token_expires: Option<DateTime<Utc>>,
    /// When the session expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

/// A web session, version `v2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSession {
    /// Always `"web_session"`.
    pub kind: String,
    /// [`SUB_KIND_APP_SESSION`] for application sessions.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_kind: String,
    /// Version label.
    pub version: String,
    /// Metadata; the name is the session id.
    pub metadata: Metadata,
    /// Body.
    pub spec: WebSessionSpec,
}

impl WebSession {
    /// Creates a web session.
    pub fn new(id: impl Into<String>, spec: WebSessionSpec) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            sub_kind: String::new(),
            version: Self::VERSION.to_string(),
            metadata: Metadata::new(id),
            spec,
        }
    }

    /// Creates an application session.
    pub fn app_session(id: impl Into<String>, spec: WebSessionSpec) -> Self {
        Self {
            sub_kind: SUB_KIND_APP_SESSION.to_string(),
            ..Self::new(id, spec)
        }
    }

    /// Returns `true` if this is an application session.
    pub fn is_app_session(&self) -> bool {
        self.sub_kind == SUB_KIND_APP_SESSION
    }
}

/// Legacy shape of a web session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSessionV1 {
    /// Session id.
    pub id: String,
    /// User the session belongs to.
    #[serde(default)]
    pub user: String,
    /// Public certificate.
    #[serde(default, rename = "pub", with = "base64_bytes")]
    pub r#pub: Vec<u8>,
    /// Private key.
    #[serde(
        default,
        rename = "priv",
        with = "base64_bytes",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub r#priv: Vec<u8>,
    /// Bearer token.
    #[serde(default)]
    pub bearer_token: String,
    /// Session expiry, shared by the bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

impl VersionedResource for WebSession {
    const KIND: &'static str = "web_session";
    const VERSION: &'static str = "v2";
    type Legacy = WebSessionV1;

    fn from_resource(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::WebSession(session) => Some(session),
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

    fn upgrade(legacy: WebSessionV1) -> Self {
        Self::new(
            legacy.id,
            WebSessionSpec {
                user: legacy.user,
                r#pub: legacy.r#pub,
                r#priv: legacy.r#priv,
                bearer_token: legacy.bearer_token,
                bearer_token_expires: legacy.expires,
                expires: legacy.expires,
            },
        )
    }

    fn downgrade(&self) -> WebSessionV1 {
        WebSessionV1 {
            id: self.metadata.name.clone(),
            user: self.spec.user.clone(),
            r#pub: self.spec.r#pub.clone(),
            r#priv: self.spec.r#priv.clone(),
            bearer_token: self.spec.bearer_token.clone(),
            expires: self.spec.expires,
        }
    }

    fn schema() -> Schema {
        resource_schema(
            Schema::object()
                .property("user", Schema::String)
                .property("pub", Schema::String)
                .property("priv", Schema::String)
                .property("bearer_token", Schema::String)
                .property("bearer_token_expires", Schema::Timestamp)
                .property("expires", Schema::Timestamp)
                .into(),
        )
    }

    fn check(&self) -> Result<(), Error> {
        if self.is_app_session() && self.spec.user.is_empty() {
            return Err(Error::validation("application session is missing its user"));
        }
        Ok(())
    }
}

impl From<WebSession> for Resource {
    fn from(session: WebSession) -> Self {
        Resource::WebSession(session)
    }
}
