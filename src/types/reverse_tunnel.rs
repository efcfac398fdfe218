//! Reverse tunnels and the connections established over them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Metadata, Resource, VersionedResource};
use crate::Error;
use crate::marshal::{Schema, resource_schema};

/// What sits on the far side of a tunnel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelType {
    /// A proxy of a trusted cluster.
    #[default]
    Proxy,
    /// A single node dialing in.
    Node,
}

impl TunnelType {
    const NAMES: &'static [&'static str] = &["proxy", "node"];
}

/// Body of a [`ReverseTunnel`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseTunnelSpec {
    /// Name of the remote cluster.
    #[serde(default)]
    pub cluster_name: String,
    /// Tunnel type.
    #[serde(default, rename = "type")]
    pub tunnel_type: TunnelType,
    /// Addresses to dial.
    #[serde(default)]
    pub dial_addrs: Vec<String>,
}

/// A reverse tunnel, version `v2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseTunnel {
    /// Always `"reverse_tunnel"`.
    pub kind: String,
    /// Sub-kind, usually empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_kind: String,
    /// Version label.
    pub version: String,
    /// Metadata.
    pub metadata: Metadata,
    /// Body.
    pub spec: ReverseTunnelSpec,
}

impl ReverseTunnel {
    /// Creates a proxy tunnel to `cluster_name`.
    pub fn new(cluster_name: impl Into<String>, dial_addrs: Vec<String>) -> Self {
        let cluster_name = cluster_name.into();
        Self {
            kind: Self::KIND.to_string(),
            sub_kind: String::new(),
            version: Self::VERSION.to_string(),
            metadata: Metadata::new(cluster_name.clone()),
            spec: ReverseTunnelSpec {
                cluster_name,
                tunnel_type: TunnelType::Proxy,
                dial_addrs,
            },
        }
    }
}

/// Legacy shape of a reverse tunnel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseTunnelV1 {
    /// Remote cluster domain.
    pub domain_name: String,
    /// Addresses to dial.
    #[serde(default)]
    pub dial_addrs: Vec<String>,
}

impl VersionedResource for ReverseTunnel {
    const KIND: &'static str = "reverse_tunnel";
    const VERSION: &'static str = "v2";
    type Legacy = ReverseTunnelV1;

    fn from_resource(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::ReverseTunnel(tunnel) => Some(tunnel),
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

    fn upgrade(legacy: ReverseTunnelV1) -> Self {
        Self::new(legacy.domain_name, legacy.dial_addrs)
    }

    fn downgrade(&self) -> ReverseTunnelV1 {
        ReverseTunnelV1 {
            domain_name: self.spec.cluster_name.clone(),
            dial_addrs: self.spec.dial_addrs.clone(),
        }
    }

    fn schema() -> Schema {
        resource_schema(
            Schema::object()
                .required("cluster_name", Schema::String)
                .property("type", Schema::Enum(TunnelType::NAMES))
                .required("dial_addrs", Schema::array(Schema::String))
                .into(),
        )
    }

    fn check(&self) -> Result<(), Error> {
        if self.spec.cluster_name.trim().is_empty() {
            return Err(Error::validation("reverse tunnel has an empty cluster name"));
        }
        if self.spec.dial_addrs.is_empty() {
            return Err(Error::validation("reverse tunnel has no dial addresses"));
        }
        Ok(())
    }
}

impl From<ReverseTunnel> for Resource {
    fn from(tunnel: ReverseTunnel) -> Self {
        Resource::ReverseTunnel(tunnel)
    }
}

/// Body of a [`TunnelConnection`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConnectionSpec {
    /// Cluster the connection belongs to.
    #[serde(default)]
    pub cluster_name: String,
    /// Proxy terminating the connection.
    #[serde(default)]
    pub proxy_name: String,
    /// Last heartbeat received over the connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Tunnel type.
    #[serde(default, rename = "type")]
    pub tunnel_type: TunnelType,
}

/// A live tunnel connection, version `v2`.
///
/// The sub-kind carries the cluster name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConnection {
    /// Always `"tunnel_connection"`.
    pub kind: String,
    /// Cluster name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sub_kind: String,
    /// Version label.
    pub version: String,
    /// Metadata.
    pub metadata: Metadata,
    /// Body.
    pub spec: TunnelConnectionSpec,
}

impl TunnelConnection {
    /// Creates a tunnel connection named `{cluster}-{proxy}`.
    pub fn new(spec: TunnelConnectionSpec) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            sub_kind: spec.cluster_name.clone(),
            version: Self::VERSION.to_string(),
            metadata: Metadata::new(format!("{}-{}", spec.cluster_name, spec.proxy_name)),
            spec,
        }
    }
}

/// Legacy shape of a tunnel connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConnectionV1 {
    /// Cluster name.
    pub cluster_name: String,
    /// Proxy name.
    pub proxy_name: String,
    /// Last heartbeat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl VersionedResource for TunnelConnection {
    const KIND: &'static str = "tunnel_connection";
    const VERSION: &'static str = "v2";
    type Legacy = TunnelConnectionV1;

    fn from_resource(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::TunnelConnection(conn) => Some(conn),
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

    fn upgrade(legacy: TunnelConnectionV1) -> Self {
        Self::new(TunnelConnectionSpec {
            cluster_name: legacy.cluster_name,
            proxy_name: legacy.proxy_name,
            last_heartbeat: legacy.last_heartbeat,
            tunnel_type: TunnelType::Proxy,
        })
    }

    fn downgrade(&self) -> TunnelConnectionV1 {
        TunnelConnectionV1 {
            cluster_name: self.spec.cluster_name.clone(),
            proxy_name: self.spec.proxy_name.clone(),
            last_heartbeat: self.spec.last_heartbeat,
        }
    }

    fn schema() -> Schema {
        resource_schema(
            Schema::object()
                .required("cluster_name", Schema::String)
                .required("proxy_name", Schema::String)
                .property("last_heartbeat", Schema::Timestamp)
                .property("type", Schema::Enum(TunnelType::NAMES))
                .into(),
        )
    }

    fn check(&self) -> Result<(), Error> {
        if self.spec.cluster_name.is_empty() {
            return Err(Error::validation("tunnel connection is missing its cluster name"));
        }
        if self.spec.proxy_name.is_empty() {
            return Err(Error::validation("tunnel connection is missing its proxy name"));
        }
        Ok(())
    }
}

impl From<TunnelConnection> for Resource {
    fn from(conn: TunnelConnection) -> Self {
        Resource::TunnelConnection(conn)
    }
}
