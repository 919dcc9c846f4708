//! Typed provider configuration, resource configuration and resource state.
//!
//! The host hands everything over as JSON. These types are decoded once at the
//! boundary; nothing below [`crate::provider`] touches untyped values.

use serde::{Deserialize, Serialize};

use crate::parameters::Parameter;
use crate::tags::{IgnoreTagsConfig, Tags};

/// Description used when the user does not give one.
pub const DEFAULT_DESCRIPTION: &str = "Managed by Hemmer";

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

/// Provider-level settings, set once by `configure`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Region the client talks to. Informational for the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Tags added to every resource unless the resource overrides the key.
    #[serde(default)]
    pub default_tags: Tags,
    /// Tags never surfaced in state.
    #[serde(default)]
    pub ignore_tags: IgnoreTagsConfig,
}

/// The user-declared configuration of a parameter group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterGroupConfig {
    /// Explicit group name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Prefix for a generated group name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    /// Engine family.
    #[serde(default)]
    pub family: String,
    /// Description; fixed after creation.
    #[serde(default = "default_description")]
    pub description: String,
    /// Declared parameters.
    #[serde(default)]
    pub parameter: Vec<Parameter>,
    /// Resource tags.
    #[serde(default)]
    pub tags: Tags,
}

impl ParameterGroupConfig {
    /// A config for `family` with defaults everywhere else.
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            name: None,
            name_prefix: None,
            family: family.into(),
            description: default_description(),
            parameter: Vec::new(),
            tags: Tags::new(),
        }
    }

    /// Set an explicit name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set a name prefix.
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare a parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameter.push(Parameter::new(name, value));
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Decode from the host's JSON, treating null as an empty object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        match value {
            serde_json::Value::Null => serde_json::from_value(serde_json::json!({})),
            value => serde_json::from_value(value),
        }
    }
}

/// The recorded state of a parameter group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterGroupState {
    /// Resource id; the group name.
    pub id: String,
    /// Amazon Resource Name.
    #[serde(default)]
    pub arn: String,
    /// Group name.
    #[serde(default)]
    pub name: String,
    /// Prefix recovered from a generated name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    /// Engine family.
    #[serde(default)]
    pub family: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Effective parameters.
    #[serde(default)]
    pub parameter: Vec<Parameter>,
    /// Tags declared on the resource.
    #[serde(default)]
    pub tags: Tags,
    /// All tags, including provider defaults.
    #[serde(default)]
    pub tags_all: Tags,
}

impl ParameterGroupState {
    /// Decode from the host's JSON.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Encode for the host.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_defaults() {
        let config = ParameterGroupConfig::from_value(json!({"family": "memorydb_redis6"})).unwrap();
        assert_eq!(config.family, "memorydb_redis6");
        assert_eq!(config.description, DEFAULT_DESCRIPTION);
        assert!(config.name.is_none());
        assert!(config.parameter.is_empty());
        assert!(config.tags.is_empty());
    }

    #[test]
    fn test_config_from_json() {
        let config = ParameterGroupConfig::from_value(json!({
            "name": "sessions",
            "family": "memorydb_redis6",
            "description": "session cache",
            "parameter": [{"name": "timeout", "value": "60"}],
            "tags": {"env": "prod"},
            "arn": "ignored"
        }))
        .unwrap();

        assert_eq!(config.name.as_deref(), Some("sessions"));
        assert_eq!(config.parameter, vec![Parameter::new("timeout", "60")]);
        assert_eq!(config.tags.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_config_rejects_wrong_types() {
        assert!(ParameterGroupConfig::from_value(json!({"family": 6})).is_err());
    }

    #[test]
    fn test_provider_config() {
        let config: ProviderConfig = serde_json::from_value(json!({
            "region": "eu-west-1",
            "default_tags": {"team": "platform"},
            "ignore_tags": {"key_prefixes": ["kubernetes.io/"]}
        }))
        .unwrap();

        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert!(config.ignore_tags.is_ignored("kubernetes.io/cluster"));
        assert!(config.ignore_tags.keys.is_empty());
    }

    #[test]
    fn test_state_round_trip() {
        let state = ParameterGroupState {
            id: "g".to_string(),
            name: "g".to_string(),
            family: "memorydb_redis6".to_string(),
            parameter: vec![Parameter::new("timeout", "5")],
            ..Default::default()
        };
        let value = state.to_value().unwrap();
        assert!(value.get("name_prefix").is_none());
        assert_eq!(ParameterGroupState::from_value(value).unwrap(), state);
    }
}
