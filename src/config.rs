//! Charm configuration
//!
//! [`ConfigSchema`] is the charm's own `config.yaml`, which declares every option along with its
//! default. [`CharmConfig`] is the typed view of the values `config-get` returns at runtime.

use std::collections::HashMap;
use std::path::Path;

use ex::fs::read;
use serde_derive::{Deserialize, Serialize};
use serde_json::{from_value, Map, Value};
use serde_yaml::from_slice;

use crate::error::CharmError;
use crate::model::Backend;

/// Config option as defined in config.yaml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, tag = "type", rename_all = "kebab-case")]
pub enum ConfigOption {
    /// String config option
    #[serde(rename_all = "kebab-case")]
    String {
        default: Option<String>,
        description: String,
    },

    /// Integer config option
    #[serde(rename = "int", rename_all = "kebab-case")]
    Integer { default: i64, description: String },

    /// Boolean config option
    #[serde(rename_all = "kebab-case")]
    Boolean { default: bool, description: String },
}

impl ConfigOption {
    fn default_value(&self) -> Value {
        match self {
            ConfigOption::String { default, .. } => default
                .as_ref()
                .map(|d| Value::String(d.clone()))
                .unwrap_or(Value::Null),
            ConfigOption::Integer { default, .. } => Value::from(*default),
            ConfigOption::Boolean { default, .. } => Value::Bool(*default),
        }
    }
}

/// A charm's config.yaml file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ConfigSchema {
    pub options: HashMap<String, ConfigOption>,
}

impl ConfigSchema {
    pub fn load<P: AsRef<Path>>(charm_dir: P) -> Result<Self, CharmError> {
        Ok(from_slice(&read(charm_dir.as_ref().join("config.yaml"))?)?)
    }

    /// Fill in every option missing from `values` with its declared default
    pub fn with_defaults(&self, values: Value) -> Value {
        let mut merged = match values {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        for (name, option) in &self.options {
            let missing = merged.get(name).map(Value::is_null).unwrap_or(true);
            if missing {
                merged.insert(name.clone(), option.default_value());
            }
        }

        Value::Object(merged)
    }
}

fn default_base_dn() -> String {
    "dc=glauth,dc=com".into()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".into()
}

/// Runtime values of the charm's options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CharmConfig {
    /// Hostname clients use to reach the server, also the TLS certificate subject
    #[serde(default)]
    pub hostname: String,

    #[serde(default = "default_base_dn")]
    pub base_dn: String,

    #[serde(default = "default_true")]
    pub starttls_enabled: bool,

    /// Filter directive for the charm's own logs
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CharmConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            base_dn: default_base_dn(),
            starttls_enabled: true,
            log_level: default_log_level(),
        }
    }
}

impl CharmConfig {
    pub fn from_value(values: Value) -> Result<Self, CharmError> {
        let values = match values {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .filter(|(_, v)| !v.is_null())
                    .collect(),
            ),
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        let config: Self =
            from_value(values).map_err(|err| CharmError::ConfigError(err.to_string()))?;

        if config.base_dn.trim().is_empty() {
            return Err(CharmError::ConfigError("base_dn must not be empty".into()));
        }

        Ok(config)
    }

    /// Read the current configuration, filling gaps from `schema` when it's available
    pub fn load<B: Backend + ?Sized>(
        backend: &B,
        schema: Option<&ConfigSchema>,
    ) -> Result<Self, CharmError> {
        let values = backend.config()?;

        Self::from_value(match schema {
            Some(schema) => schema.with_defaults(values),
            None => values,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(
            CharmConfig::from_value(json!({})).unwrap(),
            CharmConfig::default()
        );
    }

    #[test]
    fn test_null_values_use_defaults() {
        let config = CharmConfig::from_value(json!({
            "hostname": "ldap.example.com",
            "base_dn": null,
            "starttls_enabled": false,
        }))
        .unwrap();

        assert_eq!(config.hostname, "ldap.example.com");
        assert_eq!(config.base_dn, "dc=glauth,dc=com");
        assert!(!config.starttls_enabled);
    }

    #[test]
    fn test_empty_base_dn_is_rejected() {
        let result = CharmConfig::from_value(json!({"base_dn": "  "}));
        assert!(matches!(result, Err(CharmError::ConfigError(_))));
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let result = CharmConfig::from_value(json!({"starttls_enabled": "yes"}));
        assert!(matches!(result, Err(CharmError::ConfigError(_))));
    }

    #[test]
    fn test_schema_defaults() {
        let schema: ConfigSchema = serde_yaml::from_str(
            r#"
options:
  hostname:
    type: string
    default: ldap.glauth.com
    description: The hostname of the LDAP server
  starttls_enabled:
    type: boolean
    default: true
    description: Enable StartTLS
"#,
        )
        .unwrap();

        let merged = schema.with_defaults(json!({"starttls_enabled": false}));

        assert_eq!(
            merged,
            json!({"hostname": "ldap.glauth.com", "starttls_enabled": false})
        );
    }
}
