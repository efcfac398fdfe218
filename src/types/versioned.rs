//! Version handling shared by all resource kinds.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Metadata, Resource};
use crate::Error;
use crate::marshal::Schema;

/// Version label of the unversioned legacy shape of a kind.
pub const LEGACY_VERSION: &str = "v1";

/// A resource kind with one legacy shape and one current version.
///
/// Implementations provide the migration between the two shapes and the
/// kind-specific checks; the marshaling layer drives them generically.
pub trait VersionedResource:
    Serialize + DeserializeOwned + Clone + Into<Resource> + Send + Sync + 'static
{
    /// Kind tag, e.g. `"user"`.
    const KIND: &'static str;

    /// Current version label, e.g. `"v2"`.
    const VERSION: &'static str;

    /// The legacy, unversioned document shape.
    type Legacy: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Borrows this resource out of the closed [`Resource`] union.
    fn from_resource(resource: &Resource) -> Option<&Self>;

    /// Returns the version label carried by the object.
    fn version(&self) -> &str;

    /// Returns the metadata.
    fn metadata(&self) -> &Metadata;

    /// Returns the metadata mutably.
    fn metadata_mut(&mut self) -> &mut Metadata;

    /// Converts the legacy shape into the current version, filling defaults
    /// for fields the legacy shape lacked.
    fn upgrade(legacy: Self::Legacy) -> Self;

    /// Projects the fields representable in the legacy shape.
    fn downgrade(&self) -> Self::Legacy;

    /// Structural schema of the current-version document.
    fn schema() -> Schema;

    /// Kind-specific checks run after metadata defaulting.
    fn check(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Applies defaulting and normalization, then validates the object.
    fn check_and_set_defaults(&mut self) -> Result<(), Error> {
        self.metadata_mut().check_and_set_defaults()?;
        self.check()
    }
}

/// A kind decoded in either of its supported shapes.
#[derive(Debug, Clone)]
pub enum Versioned<T: VersionedResource> {
    /// Unversioned legacy document.
    Legacy(T::Legacy),
    /// Current-version document.
    Current(T),
}

impl<T: VersionedResource> Versioned<T> {
    /// Returns `true` for the legacy shape.
    pub fn is_legacy(&self) -> bool {
        matches!(self, Versioned::Legacy(_))
    }

    /// Returns the object in its current version.
    pub fn upgrade(self) -> T {
        match self {
            Versioned::Legacy(legacy) => T::upgrade(legacy),
            Versioned::Current(current) => current,
        }
    }

    /// Returns the object in its legacy shape.
    pub fn downgrade(self) -> T::Legacy {
        match self {
            Versioned::Legacy(legacy) => legacy,
            Versioned::Current(current) => current.downgrade(),
        }
    }
}
