//! Per-kind marshaling.

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::OnceLock;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::{MarshalOptions, Schema};
use crate::Error;
use crate::types::{LEGACY_VERSION, Resource, ResourceHeader, Versioned, VersionedResource};

/// The two header fields inspected before a document is decoded.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct HeaderPeek {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub version: String,
}

impl HeaderPeek {
    pub(crate) fn read(data: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(data)?)
    }

    fn is_legacy(&self) -> bool {
        self.version.is_empty() || self.version == LEGACY_VERSION
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(value)
        .map_err(|e| Error::internal(format!("failed to encode resource: {}", e)).with_source(e))
}

/// Decodes a resource document of kind `T`.
///
/// Unversioned documents are decoded into the legacy shape and upgraded.
/// Current-version documents are checked against the kind's schema unless
/// `options.skip_validation` is set. Defaulting runs in both cases, then the
/// id and expiry overrides are applied.
///
/// # Errors
///
/// - [`Validation`](crate::ErrorKind::Validation) for empty input, malformed
///   documents, schema violations and failed checks
/// - [`UnsupportedVersion`](crate::ErrorKind::UnsupportedVersion) for a
///   version this client does not know
///
/// # Example
///
/// ```rust
/// use accessplane::marshal::{self, MarshalOptions};
/// use accessplane::types::ReverseTunnel;
///
/// let data = br#"{"domain_name": "east", "dial_addrs": ["10.0.0.1:3024"]}"#;
/// let tunnel: ReverseTunnel = marshal::unmarshal(data, &MarshalOptions::new()).unwrap();
/// assert_eq!(tunnel.version, "v2");
/// ```
pub fn unmarshal<T: VersionedResource>(data: &[u8], options: &MarshalOptions) -> Result<T, Error> {
    unmarshal_checked(data, options, || Cow::Owned(T::schema()))
}

/// Same as [`unmarshal`], with the schema supplied by the caller. `schema`
/// is only called for current-version documents that are validated.
fn unmarshal_checked<'s, T: VersionedResource>(
    data: &[u8],
    options: &MarshalOptions,
    schema: impl FnOnce() -> Cow<'s, Schema>,
) -> Result<T, Error> {
    if data.is_empty() {
        return Err(Error::validation(format!("missing {} data", T::KIND)));
    }

    let header = HeaderPeek::read(data)?;
    let versioned = if header.is_legacy() {
        Versioned::<T>::Legacy(serde_json::from_slice(data)?)
    } else if header.version == T::VERSION {
        if header.kind != T::KIND {
            return Err(Error::validation(format!(
                "expected kind {:?}, got {:?}",
                T::KIND,
                header.kind
            )));
        }
        if options.skip_validation {
            Versioned::Current(serde_json::from_slice(data)?)
        } else {
            let value: Value = serde_json::from_slice(data)?;
            schema().validate(&value)?;
            Versioned::Current(serde_json::from_value(value)?)
        }
    } else {
        return Err(Error::unsupported_version(format!(
            "{} version {:?} is not supported",
            T::KIND,
            header.version
        )));
    };

    let mut resource = versioned.upgrade();
    resource.check_and_set_defaults()?;
    options.apply_overrides(resource.metadata_mut());
    Ok(resource)
}

/// Encodes a resource of kind `T`.
///
/// The caller's object is never modified. Unless
/// `options.preserve_resource_id` is set, a copy with the id reset to zero is
/// encoded instead.
///
/// # Errors
///
/// Returns [`UnsupportedVersion`](crate::ErrorKind::UnsupportedVersion) when
/// the target version is unknown or the object does not carry the current
/// version.
pub fn marshal<T: VersionedResource>(resource: &T, options: &MarshalOptions) -> Result<Vec<u8>, Error> {
    let target = options.target_version.as_deref().unwrap_or(T::VERSION);

    if target == T::VERSION {
        if resource.version() != T::VERSION {
            return Err(Error::unsupported_version(format!(
                "cannot marshal {} version {:?} as {}",
                T::KIND,
                resource.version(),
                target
            )));
        }
        if options.preserve_resource_id {
            return encode(resource);
        }
        let mut copy = resource.clone();
        copy.metadata_mut().id = 0;
        return encode(&copy);
    }

    if target == LEGACY_VERSION {
        return encode(&resource.downgrade());
    }

    Err(Error::unsupported_version(format!(
        "{} version {:?} is not supported",
        T::KIND,
        target
    )))
}

/// Decodes a resource header, as carried by delete events.
pub fn unmarshal_header(data: &[u8], options: &MarshalOptions) -> Result<ResourceHeader, Error> {
    if data.is_empty() {
        return Err(Error::validation("missing resource header data"));
    }
    let mut header: ResourceHeader = serde_json::from_slice(data)?;
    header.check_and_set_defaults()?;
    options.apply_overrides(&mut header.metadata);
    Ok(header)
}

/// Encodes a resource header.
pub fn marshal_header(header: &ResourceHeader, options: &MarshalOptions) -> Result<Vec<u8>, Error> {
    if options.preserve_resource_id {
        return encode(header);
    }
    let mut copy = header.clone();
    copy.metadata.id = 0;
    encode(&copy)
}

/// Object-safe codec for one resource kind.
///
/// Codecs are stateless; the [`CodecRegistry`](super::CodecRegistry) shares
/// them between every stream of a client.
pub trait ResourceCodec: Send + Sync {
    /// Kind handled by this codec.
    fn kind(&self) -> &'static str;

    /// Current version of the kind.
    fn version(&self) -> &'static str;

    /// Encodes a resource of this codec's kind.
    fn marshal(&self, resource: &Resource, options: &MarshalOptions) -> Result<Vec<u8>, Error>;

    /// Decodes a document of this codec's kind.
    fn unmarshal(&self, data: &[u8], options: &MarshalOptions) -> Result<Resource, Error>;
}

/// [`ResourceCodec`] for any [`VersionedResource`].
///
/// The kind's schema is built on first use and kept for the codec's
/// lifetime.
pub struct KindCodec<T> {
    schema: OnceLock<Schema>,
    _kind: PhantomData<fn() -> T>,
}

impl<T> KindCodec<T> {
    /// Creates the codec.
    pub fn new() -> Self {
        Self {
            schema: OnceLock::new(),
            _kind: PhantomData,
        }
    }
}

impl<T> Default for KindCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: VersionedResource> fmt::Debug for KindCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindCodec")
            .field("kind", &T::KIND)
            .field("version", &T::VERSION)
            .finish()
    }
}

impl<T: VersionedResource> ResourceCodec for KindCodec<T> {
    fn kind(&self) -> &'static str {
        T::KIND
    }

    fn version(&self) -> &'static str {
        T::VERSION
    }

    fn marshal(&self, resource: &Resource, options: &MarshalOptions) -> Result<Vec<u8>, Error> {
        let typed = T::from_resource(resource).ok_or_else(|| {
            Error::unsupported_resource(format!(
                "{} codec cannot marshal a {:?} resource",
                T::KIND,
                resource.kind()
            ))
        })?;
        marshal(typed, options)
    }

    fn unmarshal(&self, data: &[u8], options: &MarshalOptions) -> Result<Resource, Error> {
        unmarshal_checked::<T>(data, options, || {
            Cow::Borrowed(self.schema.get_or_init(T::schema))
        })
        .map(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::types::{
        AccessRequest, AccessRequestV1, ReverseTunnel, ReverseTunnelV1, Role, User, UserV1,
        WebSession, WebSessionSpec,
    };
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use test_case::test_case;

    fn tunnel_doc(labels: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "kind": "reverse_tunnel",
            "version": "v2",
            "metadata": {"name": "east", "labels": labels},
            "spec": {"cluster_name": "east", "dial_addrs": ["10.0.0.1:3024"]}
        }))
        .unwrap()
    }

    #[test]
    fn test_empty_input_is_validation_error() {
        let err = unmarshal::<User>(b"", &MarshalOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "missing user data");
    }

    #[test]
    fn test_legacy_document_is_upgraded() {
        let data = serde_json::to_vec(&UserV1 {
            name: "alice".into(),
            allowed_logins: vec!["root".into()],
            ..Default::default()
        })
        .unwrap();
        let user: User = unmarshal(&data, &MarshalOptions::new()).unwrap();
        assert_eq!(user.version, "v2");
        assert_eq!(user.metadata.namespace, "default");
    }

    #[test]
    fn test_unknown_version_rejected() {
        let data = br#"{"kind":"user","version":"v9","metadata":{"name":"a"},"spec":{}}"#;
        let err = unmarshal::<User>(data, &MarshalOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let data = br#"{"kind":"role","version":"v2","metadata":{"name":"a"},"spec":{}}"#;
        let err = unmarshal::<User>(data, &MarshalOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_invalid_label_key_fails_validation() {
        let err = unmarshal::<ReverseTunnel>(&tunnel_doc(json!({"a b": "x"})), &MarshalOptions::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_invalid_label_key_fails_even_when_skipping_schema() {
        let options = MarshalOptions::new().skip_validation();
        let err = unmarshal::<ReverseTunnel>(&tunnel_doc(json!({"a b": "x"})), &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_skip_validation_still_defaults() {
        let data = br#"{"kind":"reverse_tunnel","version":"v2","metadata":{"name":"east","expires":"2030-01-01T12:00:00+02:00"},"spec":{"cluster_name":"east","dial_addrs":["a:1"]}}"#;
        let options = MarshalOptions::new().skip_validation();
        let tunnel: ReverseTunnel = unmarshal(data, &options).unwrap();
        assert_eq!(tunnel.metadata.namespace, "default");
        assert_eq!(
            tunnel.metadata.expires,
            Some(Utc.with_ymd_and_hms(2030, 1, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_schema_rejects_unknown_spec_field() {
        let data = br#"{"kind":"reverse_tunnel","version":"v2","metadata":{"name":"east"},"spec":{"cluster_name":"east","dial_addrs":["a:1"],"extra":1}}"#;
        assert!(unmarshal::<ReverseTunnel>(data, &MarshalOptions::new()).is_err());
        assert!(unmarshal::<ReverseTunnel>(data, &MarshalOptions::new().skip_validation()).is_ok());
    }

    #[test]
    fn test_overrides_applied_last() {
        let expiry = Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap();
        let options = MarshalOptions::new().with_id(7).with_expiry(expiry);
        let tunnel: ReverseTunnel = unmarshal(&tunnel_doc(json!({})), &options).unwrap();
        assert_eq!(tunnel.metadata.id, 7);
        assert_eq!(tunnel.metadata.expires, Some(expiry));
    }

    #[test]
    fn test_marshal_strips_id_without_mutating_input() {
        let mut tunnel = ReverseTunnel::new("east", vec!["a:1".into()]);
        tunnel.metadata.id = 42;

        let data = marshal(&tunnel, &MarshalOptions::new()).unwrap();
        assert_eq!(tunnel.metadata.id, 42);
        let decoded: ReverseTunnel = unmarshal(&data, &MarshalOptions::new()).unwrap();
        assert_eq!(decoded.metadata.id, 0);

        let kept = marshal(&tunnel, &MarshalOptions::new().preserve_resource_id()).unwrap();
        let decoded: ReverseTunnel = unmarshal(&kept, &MarshalOptions::new()).unwrap();
        assert_eq!(decoded.metadata.id, 42);
    }

    #[test]
    fn test_marshal_legacy_target() {
        let tunnel = ReverseTunnel::new("east", vec!["a:1".into()]);
        let data = marshal(&tunnel, &MarshalOptions::new().with_version("v1")).unwrap();
        let legacy: ReverseTunnelV1 = serde_json::from_slice(&data).unwrap();
        assert_eq!(legacy.domain_name, "east");
    }

    #[test_case(Some("v7"); "unknown target")]
    #[test_case(None; "object carries wrong version")]
    fn test_marshal_unsupported_version(target: Option<&str>) {
        let mut tunnel = ReverseTunnel::new("east", vec!["a:1".into()]);
        let mut options = MarshalOptions::new();
        match target {
            Some(v) => options = options.with_version(v),
            None => tunnel.version = "v9".into(),
        }
        let err = marshal(&tunnel, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
    }

    #[test]
    fn test_round_trip_current_versions() {
        let options = MarshalOptions::new().preserve_resource_id();

        let mut user = User::upgrade(UserV1 {
            name: "alice".into(),
            roles: vec!["admin".into()],
            ..Default::default()
        });
        user.metadata.id = 5;
        let back: User = unmarshal(&marshal(&user, &options).unwrap(), &MarshalOptions::new()).unwrap();
        assert_eq!(back, user);

        let mut role = Role::new("dev", Default::default());
        role.check_and_set_defaults().unwrap();
        let back: Role = unmarshal(&marshal(&role, &options).unwrap(), &MarshalOptions::new()).unwrap();
        assert_eq!(back, role);

        let session = WebSession::app_session(
            "s1",
            WebSessionSpec {
                user: "alice".into(),
                r#pub: b"cert".to_vec(),
                ..Default::default()
            },
        );
        let back: WebSession =
            unmarshal(&marshal(&session, &options).unwrap(), &MarshalOptions::new()).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_round_trip_legacy_version() {
        let legacy = AccessRequestV1 {
            name: "req-1".into(),
            user: "alice".into(),
            roles: vec!["dba".into()],
            ..Default::default()
        };
        let request = AccessRequest::upgrade(legacy.clone());
        let data = marshal(&request, &MarshalOptions::new().with_version("v1")).unwrap();
        let back: AccessRequest = unmarshal(&data, &MarshalOptions::new()).unwrap();
        assert_eq!(back.downgrade(), legacy);
    }

    #[test]
    fn test_unnamed_legacy_request_decodes_to_same_name() {
        let data = br#"{"user":"alice","roles":["dba"]}"#;
        let first: AccessRequest = unmarshal(data, &MarshalOptions::new()).unwrap();
        let second: AccessRequest = unmarshal(data, &MarshalOptions::new()).unwrap();
        assert_eq!(first.metadata.name, second.metadata.name);
    }

    #[test]
    fn test_header_round_trip_strips_id() {
        let mut header = ResourceHeader::new("user", "v2", "alice");
        header.metadata.id = 9;
        let data = marshal_header(&header, &MarshalOptions::new()).unwrap();
        let back = unmarshal_header(&data, &MarshalOptions::new()).unwrap();
        assert_eq!(back.metadata.id, 0);
        assert_eq!(back.kind, "user");
        assert_eq!(header.metadata.id, 9);
    }

    #[test]
    fn test_kind_codec_reuses_schema() {
        let codec = KindCodec::<ReverseTunnel>::new();
        for _ in 0..2 {
            let resource = codec
                .unmarshal(&tunnel_doc(json!({"env": "prod"})), &MarshalOptions::new())
                .unwrap();
            assert_eq!(resource.kind(), "reverse_tunnel");
        }
        assert!(codec.schema.get().is_some());

        let err = codec
            .unmarshal(&tunnel_doc(json!({"a b": "x"})), &MarshalOptions::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kind_codec_rejects_other_kind() {
        let codec = KindCodec::<User>::new();
        let tunnel: Resource = ReverseTunnel::new("east", vec!["a:1".into()]).into();
        let err = codec.marshal(&tunnel, &MarshalOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedResource);
    }
}
