//! Resource metadata shared by every kind.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Namespace assigned to resources that do not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Pattern every label key must match.
pub const LABEL_KEY_PATTERN: &str = "^[a-zA-Z/.0-9_*-]+$";

static LABEL_KEY: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

/// Returns `true` if `key` is an acceptable label key.
///
/// # Example
///
/// ```rust
/// use accessplane::types::is_valid_label_key;
///
/// assert!(is_valid_label_key("env"));
/// assert!(is_valid_label_key("teleport.dev/origin"));
/// assert!(!is_valid_label_key("has space"));
/// assert!(!is_valid_label_key(""));
/// ```
pub fn is_valid_label_key(key: &str) -> bool {
    match LABEL_KEY.get_or_init(|| Regex::new(LABEL_KEY_PATTERN)) {
        Ok(re) => re.is_match(key),
        Err(_) => false,
    }
}

/// Metadata carried by every resource.
///
/// The numeric `id` is assigned by the control plane's storage layer. It is
/// stripped from marshaled output unless the caller asks for it to be kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Resource name, unique within its kind and namespace.
    #[serde(default)]
    pub name: String,

    /// Namespace; defaults to [`DEFAULT_NAMESPACE`].
    #[serde(default)]
    pub namespace: String,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Static labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Absolute expiry, always in UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,

    /// Server-assigned resource id.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub id: i64,
}

fn is_zero(id: &i64) -> bool {
    *id == 0
}

impl Metadata {
    /// Creates metadata with the given name in the default namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            ..Default::default()
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Sets the expiry, converting it to UTC.
    #[must_use]
    pub fn with_expiry<Tz: TimeZone>(mut self, expires: DateTime<Tz>) -> Self {
        self.set_expiry(expires);
        self
    }

    /// Sets the expiry, converting it to UTC.
    pub fn set_expiry<Tz: TimeZone>(&mut self, expires: DateTime<Tz>) {
        self.expires = Some(expires.with_timezone(&Utc));
    }

    /// Validates the metadata and fills in defaults.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is empty or a label key does
    /// not match [`LABEL_KEY_PATTERN`].
    pub fn check_and_set_defaults(&mut self) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::validation("missing parameter name"));
        }
        if self.namespace.is_empty() {
            self.namespace = DEFAULT_NAMESPACE.to_string();
        }
        if let Some(expires) = self.expires {
            self.expires = Some(expires.with_timezone(&Utc));
        }
        for key in self.labels.keys() {
            if !is_valid_label_key(key) {
                return Err(Error::validation(format!("invalid label key: {:?}", key)));
            }
        }
        Ok(())
    }
}
