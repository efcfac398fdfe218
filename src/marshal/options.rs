//! Options controlling marshal and unmarshal.

use chrono::{DateTime, TimeZone, Utc};

use crate::types::Metadata;

/// Options for [`marshal`](super::marshal) and [`unmarshal`](super::unmarshal).
///
/// ## Example
///
/// ```rust
/// use accessplane::marshal::MarshalOptions;
///
/// // Trusted input, keep the storage id on the way back out
/// let options = MarshalOptions::new()
///     .skip_validation()
///     .preserve_resource_id();
/// assert!(options.skip_validation);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarshalOptions {
    /// Skip the structural schema check on unmarshal. Defaulting still runs.
    pub skip_validation: bool,

    /// Keep the server-assigned id in marshaled output.
    pub preserve_resource_id: bool,

    /// Id to stamp onto unmarshaled objects.
    pub override_id: Option<i64>,

    /// Expiry to stamp onto unmarshaled objects.
    pub override_expiry: Option<DateTime<Utc>>,

    /// Version to marshal into; defaults to the kind's current version.
    pub target_version: Option<String>,
}

impl MarshalOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips schema validation.
    #[must_use]
    pub fn skip_validation(mut self) -> Self {
        self.skip_validation = true;
        self
    }

    /// Keeps the resource id when marshaling.
    #[must_use]
    pub fn preserve_resource_id(mut self) -> Self {
        self.preserve_resource_id = true;
        self
    }

    /// Overrides the id of unmarshaled objects.
    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        self.override_id = Some(id);
        self
    }

    /// Overrides the expiry of unmarshaled objects.
    #[must_use]
    pub fn with_expiry<Tz: TimeZone>(mut self, expires: DateTime<Tz>) -> Self {
        self.override_expiry = Some(expires.with_timezone(&Utc));
        self
    }

    /// Marshals into the given version instead of the current one.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.target_version = Some(version.into());
        self
    }

    pub(crate) fn apply_overrides(&self, metadata: &mut Metadata) {
        if let Some(id) = self.override_id {
            metadata.id = id;
        }
        if let Some(expires) = self.override_expiry {
            metadata.expires = Some(expires);
        }
    }
}
