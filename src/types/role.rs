//! Roles.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::encoding::duration_secs;
use super::{DEFAULT_NAMESPACE, Metadata, Resource, VersionedResource, is_valid_label_key};
use crate::Error;
use crate::marshal::{Schema, resource_schema};

/// Session TTL applied when a role does not set one.
pub const DEFAULT_MAX_SESSION_TTL: Duration = Duration::from_secs(30 * 60 * 60);

/// Matches every label value.
pub const WILDCARD: &str = "*";

/// Options that apply to every session granted by the role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOptions {
    /// Maximum session lifetime.
    #[serde(default, with = "duration_secs")]
    pub max_session_ttl: Duration,
    /// Whether SSH agent forwarding is permitted.
    #[serde(default)]
    pub forward_agent: bool,
}

/// An allow or deny rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConditions {
    /// OS logins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logins: Vec<String>,
    /// Namespaces.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
    /// Node label selectors; each key accepts any of its values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_labels: BTreeMap<String, Vec<String>>,
}

impl RoleConditions {
    fn check(&self, side: &str) -> Result<(), Error> {
        if self.logins.iter().any(String::is_empty) {
            return Err(Error::validation(format!("empty login in {} conditions", side)));
        }
        for key in self.node_labels.keys() {
            if key != WILDCARD && !is_valid_label_key(key) {
                return Err(Error::validation(format!(
                    "invalid node label key {:?} in {} conditions",
                    key, side
                )));
            }
        }
        Ok(())
    }

    fn schema() -> Schema {
        Schema::object()
            .property("logins", Schema::array(Schema::String))
            .property("namespaces", Schema::array(Schema::String))
            .property("node_labels", Schema::map_of(Schema::array(Schema::String)))
            .into()
    }
}

/// Body of a [`Role`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Session options.
    #[serde(default)]
    pub options: RoleOptions,
    /// What the role grants.
    #[serde(default)]
    pub allow: RoleConditions,
    /// What the role denies; wins over `allow`.
    #[serde(default)]
    pub deny: RoleConditions,
}

/// A role, version `v3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Always `"role"`.
    pub kind: String,
    /// Sub-kind, usually empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_kind: String,
    /// Version label.
    pub version: String,
    /// Metadata.
    pub metadata: Metadata,
    /// Body.
    pub spec: RoleSpec,
}

impl Role {
    /// Creates a role with the given name.
    pub fn new(name: impl Into<String>, spec: RoleSpec) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            sub_kind: String::new(),
            version: Self::VERSION.to_string(),
            metadata: Metadata::new(name),
            spec,
        }
    }
}

/// Legacy shape of a role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleV1 {
    /// Role name.
    pub name: String,
    /// OS logins.
    #[serde(default)]
    pub logins: Vec<String>,
    /// Namespaces.
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Single-valued node label selectors.
    #[serde(default)]
    pub node_labels: BTreeMap<String, String>,
    /// Maximum session lifetime.
    #[serde(default, with = "duration_secs")]
    pub max_session_ttl: Duration,
    /// Whether SSH agent forwarding is permitted.
    #[serde(default)]
    pub forward_agent: bool,
}

impl VersionedResource for Role {
    const KIND: &'static str = "role";
    const VERSION: &'static str = "v3";
    type Legacy = RoleV1;

    fn from_resource(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::Role(role) => Some(role),
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

    fn upgrade(legacy: RoleV1) -> Self {
        Self::new(
            legacy.name,
            RoleSpec {
                options: RoleOptions {
                    max_session_ttl: legacy.max_session_ttl,
                    forward_agent: legacy.forward_agent,
                },
                allow: RoleConditions {
                    logins: legacy.logins,
                    namespaces: legacy.namespaces,
                    node_labels: legacy
                        .node_labels
                        .into_iter()
                        .map(|(k, v)| (k, vec![v]))
                        .collect(),
                },
                deny: RoleConditions::default(),
            },
        )
    }

    /// Multi-valued selectors keep only their first value.
    fn downgrade(&self) -> RoleV1 {
        RoleV1 {
            name: self.metadata.name.clone(),
            logins: self.spec.allow.logins.clone(),
            namespaces: self.spec.allow.namespaces.clone(),
            node_labels: self
                .spec
                .allow
                .node_labels
                .iter()
                .filter_map(|(k, v)| v.first().map(|first| (k.clone(), first.clone())))
                .collect(),
            max_session_ttl: self.spec.options.max_session_ttl,
            forward_agent: self.spec.options.forward_agent,
        }
    }

    fn schema() -> Schema {
        resource_schema(
            Schema::object()
                .property(
                    "options",
                    Schema::object()
                        .property("max_session_ttl", Schema::Integer)
                        .property("forward_agent", Schema::Boolean)
                        .into(),
                )
                .property("allow", RoleConditions::schema())
                .property("deny", RoleConditions::schema())
                .into(),
        )
    }

    fn check(&self) -> Result<(), Error> {
        self.spec.allow.check("allow")?;
        self.spec.deny.check("deny")
    }

    fn check_and_set_defaults(&mut self) -> Result<(), Error> {
        self.metadata.check_and_set_defaults()?;
        if self.spec.options.max_session_ttl.is_zero() {
            self.spec.options.max_session_ttl = DEFAULT_MAX_SESSION_TTL;
        }
        if self.spec.allow.namespaces.is_empty() {
            self.spec.allow.namespaces = vec![DEFAULT_NAMESPACE.to_string()];
        }
        self.check()
    }
}

impl From<Role> for Resource {
    fn from(role: Role) -> Self {
        Resource::Role(role)
    }
}
