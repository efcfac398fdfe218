//! Structural schemas for resource documents.
//!
//! A [`Schema`] is a small declarative description of a JSON document,
//! evaluated against the parsed [`serde_json::Value`] before the document is
//! decoded into a typed resource. It covers the subset of JSON-schema that
//! resource documents use: objects with required, declared and pattern
//! properties, arrays, scalars, timestamps and string enumerations.
//!
//! ## Example
//!
//! ```rust
//! use accessplane::marshal::Schema;
//! use serde_json::json;
//!
//! let schema: Schema = Schema::object()
//!     .required("cluster_name", Schema::String)
//!     .property("dial_addrs", Schema::array(Schema::String))
//!     .into();
//!
//! assert!(schema.validate(&json!({"cluster_name": "east"})).is_ok());
//! assert!(schema.validate(&json!({"dial_addrs": []})).is_err());
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;

use crate::types::LABEL_KEY_PATTERN;
use crate::Error;

/// Compiled pattern-property regexes, keyed by their source.
static PATTERNS: OnceLock<RwLock<HashMap<&'static str, Regex>>> = OnceLock::new();

fn compiled(pattern: &'static str) -> Result<Regex, Error> {
    let cache = PATTERNS.get_or_init(Default::default);
    if let Some(re) = cache.read().get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)
        .map_err(|e| Error::internal(format!("invalid schema pattern: {}", e)).with_source(e))?;
    cache.write().insert(pattern, re.clone());
    Ok(re)
}

/// A structural schema node.
#[derive(Debug, Clone)]
pub enum Schema {
    /// Any JSON value.
    Any,
    /// A JSON string.
    String,
    /// A JSON integer.
    Integer,
    /// A JSON boolean.
    Boolean,
    /// An RFC 3339 timestamp string.
    Timestamp,
    /// A string restricted to the listed values.
    Enum(&'static [&'static str]),
    /// A JSON array whose items all match the inner schema.
    Array(Box<Schema>),
    /// Either `null` or the inner schema.
    Nullable(Box<Schema>),
    /// A JSON object.
    Object(ObjectSchema),
}

/// Object node of a [`Schema`].
///
/// Unknown properties are rejected unless [`allow_additional`] is called.
///
/// [`allow_additional`]: ObjectSchema::allow_additional
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    properties: Vec<(&'static str, Schema)>,
    required: Vec<&'static str>,
    pattern_properties: Vec<(&'static str, Schema)>,
    additional_properties: bool,
}

impl ObjectSchema {
    /// Declares an optional property.
    #[must_use]
    pub fn property(mut self, name: &'static str, schema: Schema) -> Self {
        self.properties.push((name, schema));
        self
    }

    /// Declares a required property.
    #[must_use]
    pub fn required(mut self, name: &'static str, schema: Schema) -> Self {
        self.required.push(name);
        self.properties.push((name, schema));
        self
    }

    /// Declares that properties whose names match `pattern` follow `schema`.
    #[must_use]
    pub fn pattern_property(mut self, pattern: &'static str, schema: Schema) -> Self {
        self.pattern_properties.push((pattern, schema));
        self
    }

    /// Accepts properties that are neither declared nor pattern-matched.
    #[must_use]
    pub fn allow_additional(mut self) -> Self {
        self.additional_properties = true;
        self
    }

    fn validate_at(&self, value: &Value, path: &str) -> Result<(), Error> {
        let Some(map) = value.as_object() else {
            return Err(mismatch(path, "object"));
        };

        for name in &self.required {
            if !map.contains_key(*name) {
                return Err(Error::validation(format!(
                    "{}: missing required property {:?}",
                    display_path(path),
                    name
                )));
            }
        }

        let patterns = self
            .pattern_properties
            .iter()
            .map(|(pattern, schema)| compiled(pattern).map(|re| (re, schema)))
            .collect::<Result<Vec<_>, _>>()?;

        for (key, child) in map {
            let child_path = join(path, key);

            if let Some((_, schema)) = self.properties.iter().find(|(name, _)| name == key) {
                schema.validate_at(child, &child_path)?;
                continue;
            }

            let mut matched = false;
            for (re, schema) in &patterns {
                if re.is_match(key) {
                    matched = true;
                    schema.validate_at(child, &child_path)?;
                }
            }

            if !matched && !self.additional_properties {
                return Err(Error::validation(format!(
                    "{}: additional property {:?} is not allowed",
                    display_path(path),
                    key
                )));
            }
        }
        Ok(())
    }
}

impl From<ObjectSchema> for Schema {
    fn from(object: ObjectSchema) -> Self {
        Schema::Object(object)
    }
}

impl Schema {
    /// Starts an object schema.
    pub fn object() -> ObjectSchema {
        ObjectSchema::default()
    }

    /// An array of `items`.
    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    /// `inner` or `null`.
    pub fn nullable(inner: Schema) -> Self {
        Schema::Nullable(Box::new(inner))
    }

    /// An object whose every property follows `values`.
    pub fn map_of(values: Schema) -> Self {
        Schema::object().pattern_property("^.+$", values).into()
    }

    /// Validates a parsed document against this schema.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the path of the first violation.
    pub fn validate(&self, value: &Value) -> Result<(), Error> {
        self.validate_at(value, "")
    }

    fn validate_at(&self, value: &Value, path: &str) -> Result<(), Error> {
        match self {
            Schema::Any => Ok(()),
            Schema::String => value
                .is_string()
                .then_some(())
                .ok_or_else(|| mismatch(path, "string")),
            Schema::Integer => (value.is_i64() || value.is_u64())
                .then_some(())
                .ok_or_else(|| mismatch(path, "integer")),
            Schema::Boolean => value
                .is_boolean()
                .then_some(())
                .ok_or_else(|| mismatch(path, "boolean")),
            Schema::Timestamp => match value.as_str() {
                Some(s) if chrono::DateTime::parse_from_rfc3339(s).is_ok() => Ok(()),
                _ => Err(mismatch(path, "RFC 3339 timestamp")),
            },
            Schema::Enum(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => Ok(()),
                _ => Err(Error::validation(format!(
                    "{}: expected one of {:?}",
                    display_path(path),
                    allowed
                ))),
            },
            Schema::Array(items) => {
                let Some(values) = value.as_array() else {
                    return Err(mismatch(path, "array"));
                };
                for (i, item) in values.iter().enumerate() {
                    items.validate_at(item, &format!("{}[{}]", path, i))?;
                }
                Ok(())
            }
            Schema::Nullable(inner) => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.validate_at(value, path)
                }
            }
            Schema::Object(object) => object.validate_at(value, path),
        }
    }
}

fn mismatch(path: &str, expected: &str) -> Error {
    Error::validation(format!("{}: expected {}", display_path(path), expected))
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

/// Schema of [`Metadata`](crate::types::Metadata).
pub fn metadata_schema() -> Schema {
    Schema::object()
        .required("name", Schema::String)
        .property("namespace", Schema::String)
        .property("description", Schema::String)
        .property(
            "labels",
            Schema::object()
                .pattern_property(LABEL_KEY_PATTERN, Schema::String)
                .into(),
        )
        .property("expires", Schema::Timestamp)
        .property("id", Schema::Integer)
        .into()
}

/// Top-level template for a versioned resource document with the given spec
/// schema.
///
/// Every current-version document must carry `kind`, `version`, `metadata`
/// and `spec`.
pub fn resource_schema(spec: Schema) -> Schema {
    Schema::object()
        .required("kind", Schema::String)
        .property("sub_kind", Schema::String)
        .required("version", Schema::String)
        .required("metadata", metadata_schema())
        .required("spec", spec)
        .into()
}
