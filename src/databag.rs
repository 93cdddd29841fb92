//! Conversion between typed records and relation databags
//!
//! A databag is the flat string-to-string mapping that each side of a relation owns. Records are
//! written with every field rendered as a string, and read back by coercing those strings into
//! the record's field types.

use std::any::type_name;
use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{from_value, to_value, Map, Value};

use crate::error::CharmError;

/// Flat key-value mapping owned by one side of a relation
pub type Databag = BTreeMap<String, String>;

/// Helper for booleans stored as strings
///
/// Truthy values are written as `"True"`, falsy values as the empty string, which Juju treats as
/// removing the key. Reading accepts either capitalization, and the empty string for false.
pub mod string_bool {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(if *value { "True" } else { "" })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        match s.as_str() {
            "True" | "true" => Ok(true),
            "" | "False" | "false" => Ok(false),
            other => Err(D::Error::custom(format!(
                "expected a boolean string, got `{}`",
                other
            ))),
        }
    }
}

fn short_name<T>() -> String {
    type_name::<T>()
        .rsplit("::")
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Render a record as a databag
///
/// Every field becomes one key. Strings are kept as-is, falsy values become the empty string.
pub fn encode<T: Serialize>(record: &T) -> Result<Databag, CharmError> {
    let fields = match to_value(record)? {
        Value::Object(fields) => fields,
        other => {
            return Err(CharmError::ShapeMismatch(
                short_name::<T>(),
                format!("expected a record, got `{}`", other),
            ))
        }
    };

    Ok(fields
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Null | Value::Bool(false) => String::new(),
                Value::Bool(true) => "True".into(),
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

/// Read a record back out of a databag
///
/// An empty databag means the other side hasn't written anything yet, and yields `Ok(None)`. A
/// databag that is missing required keys, or whose values can't be coerced, yields
/// `ShapeMismatch`. Keys that the record doesn't know about are ignored.
pub fn decode<T: DeserializeOwned>(databag: &Databag) -> Result<Option<T>, CharmError> {
    if databag.is_empty() {
        return Ok(None);
    }

    let fields: Map<String, Value> = databag
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();

    from_value(Value::Object(fields))
        .map(Some)
        .map_err(|err| CharmError::ShapeMismatch(short_name::<T>(), err.to_string()))
}
