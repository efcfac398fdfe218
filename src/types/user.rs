//! User identities.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Metadata, Resource, VersionedResource};
use crate::Error;
use crate::marshal::{Schema, resource_schema};

/// Trait holding the OS logins a user may assume.
pub const TRAIT_LOGINS: &str = "logins";

/// Trait holding the Kubernetes groups a user may assume.
pub const TRAIT_KUBE_GROUPS: &str = "kubernetes_groups";

/// An identity asserted by an external connector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    /// Connector that asserted the identity.
    pub connector_id: String,
    /// Username at the connector.
    pub username: String,
}

impl ExternalIdentity {
    fn check(&self) -> Result<(), Error> {
        if self.connector_id.is_empty() {
            return Err(Error::validation("missing connector_id in external identity"));
        }
        if self.username.is_empty() {
            return Err(Error::validation("missing username in external identity"));
        }
        Ok(())
    }

    fn schema() -> Schema {
        Schema::object()
            .required("connector_id", Schema::String)
            .required("username", Schema::String)
            .into()
    }
}

/// Login lock status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginStatus {
    /// Whether logins are currently locked.
    #[serde(default)]
    pub is_locked: bool,
    /// Why the account was locked.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub locked_message: String,
    /// When the account was locked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_time: Option<DateTime<Utc>>,
}

/// Who created the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedBy {
    /// Creating user or agent.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    /// Creating connector, for users provisioned by SSO.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub connector: String,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

/// Body of a [`User`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    /// Assigned roles.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Traits used to fill role variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub traits: BTreeMap<String, Vec<String>>,
    /// Linked OIDC identities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub oidc_identities: Vec<ExternalIdentity>,
    /// Login status.
    #[serde(default)]
    pub status: LoginStatus,
    /// Account expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// Provenance.
    #[serde(default)]
    pub created_by: CreatedBy,
}

/// A user, version `v2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Always `"user"`.
    pub kind: String,
    /// Sub-kind, usually empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_kind: String,
    /// Version label.
    pub version: String,
    /// Metadata.
    pub metadata: Metadata,
    /// Body.
    pub spec: UserSpec,
}

impl User {
    /// Creates a user with the given name.
    pub fn new(name: impl Into<String>, spec: UserSpec) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            sub_kind: String::new(),
            version: Self::VERSION.to_string(),
            metadata: Metadata::new(name),
            spec,
        }
    }

    /// Returns the values of a trait, or an empty slice.
    pub fn trait_values(&self, name: &str) -> &[String] {
        self.spec.traits.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Legacy shape of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserV1 {
    /// User name.
    pub name: String,
    /// OS logins.
    #[serde(default)]
    pub allowed_logins: Vec<String>,
    /// Kubernetes groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubernetes_groups: Vec<String>,
    /// Roles.
    #[serde(default)]
    pub roles: Vec<String>,
    /// OIDC identities.
    #[serde(default)]
    pub oidc_identities: Vec<ExternalIdentity>,
    /// Login status.
    #[serde(default)]
    pub status: LoginStatus,
    /// Expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// Provenance.
    #[serde(default)]
    pub created_by: CreatedBy,
}

impl VersionedResource for User {
    const KIND: &'static str = "user";
    const VERSION: &'static str = "v2";
    type Legacy = UserV1;

    fn from_resource(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::User(user) => Some(user),
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

    fn upgrade(legacy: UserV1) -> Self {
        let mut traits = BTreeMap::new();
        traits.insert(TRAIT_LOGINS.to_string(), legacy.allowed_logins);
        traits.insert(TRAIT_KUBE_GROUPS.to_string(), legacy.kubernetes_groups);
        Self::new(
            legacy.name,
            UserSpec {
                roles: legacy.roles,
                traits,
                oidc_identities: legacy.oidc_identities,
                status: legacy.status,
                expires: legacy.expires,
                created_by: legacy.created_by,
            },
        )
    }

    fn downgrade(&self) -> UserV1 {
        UserV1 {
            name: self.metadata.name.clone(),
            allowed_logins: self.trait_values(TRAIT_LOGINS).to_vec(),
            kubernetes_groups: self.trait_values(TRAIT_KUBE_GROUPS).to_vec(),
            roles: self.spec.roles.clone(),
            oidc_identities: self.spec.oidc_identities.clone(),
            status: self.spec.status.clone(),
            expires: self.spec.expires,
            created_by: self.spec.created_by.clone(),
        }
    }

    fn schema() -> Schema {
        resource_schema(
            Schema::object()
                .property("expires", Schema::Timestamp)
                .property("roles", Schema::array(Schema::String))
                .property(
                    "traits",
                    Schema::map_of(Schema::nullable(Schema::array(Schema::String))),
                )
                .property("oidc_identities", Schema::array(ExternalIdentity::schema()))
                .property(
                    "status",
                    Schema::object()
                        .property("is_locked", Schema::Boolean)
                        .property("locked_message", Schema::String)
                        .property("locked_time", Schema::Timestamp)
                        .into(),
                )
                .property(
                    "created_by",
                    Schema::object()
                        .property("user", Schema::String)
                        .property("connector", Schema::String)
                        .property("time", Schema::Timestamp)
                        .into(),
                )
                .into(),
        )
    }

    fn check(&self) -> Result<(), Error> {
        for identity in &self.spec.oidc_identities {
            identity.check()?;
        }
        Ok(())
    }
}

impl From<User> for Resource {
    fn from(user: User) -> Self {
        Resource::User(user)
    }
}
