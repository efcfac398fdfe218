//! Marshaling properties exercised through a client's registry.

use std::collections::BTreeMap;
use std::time::Duration;

use accessplane::marshal::MarshalOptions;
use accessplane::testing::MockTransport;
use accessplane::types::{ReverseTunnel, Resource, Role, RoleV1, VersionedResource};
use accessplane::{Client, ErrorKind};
use proptest::prelude::*;

use crate::common::role;

fn client() -> Client {
    Client::from_transport(MockTransport::shared())
}

fn tunnel_with_labels(labels: BTreeMap<String, String>) -> ReverseTunnel {
    let mut tunnel = ReverseTunnel::new("east", vec!["10.0.0.1:3024".into()]);
    tunnel.metadata.labels = labels;
    tunnel
}

#[test]
fn test_marshal_keeps_caller_id() {
    let client = client();
    let mut original = role("auditor");
    original.metadata.id = 42;
    let resource: Resource = original.clone().into();

    let stripped = client
        .registry()
        .marshal(&resource, &MarshalOptions::new())
        .unwrap();
    assert_eq!(resource.metadata().id, 42);
    let back = client
        .registry()
        .unmarshal(&stripped, &MarshalOptions::new())
        .unwrap();
    assert_eq!(back.metadata().id, 0);

    let kept = client
        .registry()
        .marshal(&resource, &MarshalOptions::new().preserve_resource_id())
        .unwrap();
    let back = client
        .registry()
        .unmarshal(&kept, &MarshalOptions::new())
        .unwrap();
    assert_eq!(back.metadata().id, 42);
}

#[test]
fn test_legacy_role_survives_upgrade_and_downgrade() {
    let legacy = RoleV1 {
        name: "ops".into(),
        logins: vec!["root".into()],
        namespaces: vec!["default".into()],
        node_labels: BTreeMap::from([("env".to_string(), "prod".to_string())]),
        max_session_ttl: Duration::from_secs(8 * 3600),
        forward_agent: true,
    };
    let client = client();

    let upgraded = client
        .registry()
        .unmarshal_kind("role", &serde_json::to_vec(&legacy).unwrap(), &MarshalOptions::new())
        .unwrap();
    assert_eq!(upgraded.version(), "v3");

    let data = client
        .registry()
        .marshal(&upgraded, &MarshalOptions::new().with_version("v1"))
        .unwrap();
    let reread: RoleV1 = serde_json::from_slice(&data).unwrap();
    assert_eq!(reread, legacy);

    let current = Role::from_resource(&upgraded).unwrap();
    assert_eq!(current.downgrade(), legacy);
}

#[test]
fn test_invalid_label_rejected_on_read() {
    let client = client();
    let tunnel = tunnel_with_labels(BTreeMap::from([("bad key".to_string(), "x".to_string())]));
    let data = serde_json::to_vec(&tunnel).unwrap();

    for options in [MarshalOptions::new(), MarshalOptions::new().skip_validation()] {
        let err = client.registry().unmarshal(&data, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

proptest! {
    #[test]
    fn prop_tunnel_round_trips(
        labels in prop::collection::btree_map("[a-zA-Z/.0-9_*-]{1,16}", "[a-z0-9]{0,8}", 0..4),
    ) {
        let client = client();
        let resource: Resource = tunnel_with_labels(labels).into();

        let data = client.registry().marshal(&resource, &MarshalOptions::new()).unwrap();
        let back = client.registry().unmarshal(&data, &MarshalOptions::new()).unwrap();
        prop_assert_eq!(back, resource);
    }
}
